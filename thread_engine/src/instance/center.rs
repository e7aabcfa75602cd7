use serde::Serialize;

use scene_formats::{Coordinate, FurnitureDetails, FurnitureOffset, FurnitureType, ObjectRef};

use crate::error::ThreadError;
use crate::host::ActorWorld;

/// The object a thread is staged around and the furniture offset chosen on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Center {
    pub anchor: Option<ObjectRef>,
    pub offset: FurnitureOffset,
    /// Transform captured when a free-standing center was chosen. The anchor
    /// may be a participant that placement moves, so it is never re-read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Coordinate>,
}

impl Center {
    /// Free-standing center pinned at `origin`, the anchor's transform at the
    /// time it was picked.
    pub fn standalone(anchor: ObjectRef, origin: Coordinate) -> Self {
        Self {
            anchor: Some(anchor),
            offset: FurnitureOffset::default(),
            origin: Some(origin),
        }
    }

    pub fn on_furniture(anchor: ObjectRef, offset: FurnitureOffset) -> Self {
        Self {
            anchor: Some(anchor),
            offset,
            origin: None,
        }
    }

    pub fn kind(&self) -> FurnitureType {
        self.offset.kind
    }

    /// Pinned origin, else the live transform of the anchor, else the world
    /// origin.
    pub fn anchor_coordinate(&self, world: &dyn ActorWorld) -> Result<Coordinate, ThreadError> {
        if let Some(origin) = self.origin {
            return Ok(origin);
        }
        match self.anchor {
            Some(anchor) => world
                .reference_coordinate(anchor)
                .ok_or(ThreadError::UnknownReference(anchor)),
            None => Ok(Coordinate::ORIGIN),
        }
    }

    /// `scene_offset ∘ furniture offset ∘ anchor`.
    pub fn base_coordinates(
        &self,
        world: &dyn ActorWorld,
        scene_offset: &Coordinate,
    ) -> Result<Coordinate, ThreadError> {
        let mut base = self.anchor_coordinate(world)?;
        self.offset.offset.apply(&mut base);
        scene_offset.apply(&mut base);
        Ok(base)
    }
}

/// Nearest offset of any kind in `kinds`, measured from the world position
/// each offset produces on `anchor` to `target`.
pub(crate) fn closest_compatible_offset(
    details: &FurnitureDetails,
    anchor: &Coordinate,
    kinds: &[FurnitureType],
    target: &Coordinate,
) -> Option<FurnitureOffset> {
    kinds
        .iter()
        .filter_map(|kind| details.closest_offsets(anchor, *kind, target).into_iter().next())
        .min_by(|a, b| {
            let da = a.offset.apply_return(anchor).distance(target);
            let db = b.offset.apply_return(anchor).distance(target);
            da.total_cmp(&db)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use scene_formats::FurnitureEntry;

    fn details() -> FurnitureDetails {
        FurnitureDetails {
            entries: vec![
                FurnitureEntry {
                    kind: FurnitureType::BedDouble,
                    offsets: vec![
                        Coordinate::new(Vec3::new(0.0, 40.0, 0.0), 0.0),
                        Coordinate::new(Vec3::new(0.0, -40.0, 0.0), 0.0),
                    ],
                },
                FurnitureEntry {
                    kind: FurnitureType::Wall,
                    offsets: vec![Coordinate::new(Vec3::new(90.0, 0.0, 0.0), 0.0)],
                },
            ],
        }
    }

    #[test]
    fn picks_nearest_across_allowed_kinds() {
        let anchor = Coordinate::ORIGIN;
        let target = Coordinate::new(Vec3::new(100.0, 0.0, 0.0), 0.0);
        let both = [FurnitureType::BedDouble, FurnitureType::Wall];
        let chosen = closest_compatible_offset(&details(), &anchor, &both, &target);
        assert_eq!(chosen.map(|o| o.kind), Some(FurnitureType::Wall));

        let beds = [FurnitureType::BedDouble];
        let near_south = Coordinate::new(Vec3::new(0.0, -60.0, 0.0), 0.0);
        let chosen = closest_compatible_offset(&details(), &anchor, &beds, &near_south);
        assert_eq!(
            chosen.map(|o| o.offset.location),
            Some(Vec3::new(0.0, -40.0, 0.0))
        );
    }

    #[test]
    fn standalone_center_keeps_its_origin() {
        let origin = Coordinate::new(Vec3::new(100.0, 0.0, 0.0), 0.5);
        let center = Center::standalone(ObjectRef(21), origin);
        assert_eq!(center.kind(), FurnitureType::None);
        assert_eq!(center.anchor, Some(ObjectRef(21)));
        assert_eq!(center.origin, Some(origin));
    }

    #[test]
    fn no_matching_kind_yields_nothing() {
        let chosen = closest_compatible_offset(
            &details(),
            &Coordinate::ORIGIN,
            &[FurnitureType::Chair],
            &Coordinate::ORIGIN,
        );
        assert!(chosen.is_none());
    }
}
