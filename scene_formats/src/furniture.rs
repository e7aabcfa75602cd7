use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::ids::ObjectRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FurnitureType {
    #[default]
    None,
    BedRoll,
    BedSingle,
    BedDouble,
    Wall,
    Railing,
    Table,
    Counter,
    Chair,
    Bench,
    Throne,
    Cage,
    Pillory,
    XCross,
    CookingPot,
    AlchemyWorkbench,
    EnchantingWorkbench,
    Anvil,
    Workbench,
}

impl FurnitureType {
    pub fn is_none(self) -> bool {
        self == FurnitureType::None
    }

    pub fn is_bed(self) -> bool {
        matches!(
            self,
            FurnitureType::BedRoll | FurnitureType::BedSingle | FurnitureType::BedDouble
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            FurnitureType::None => "none",
            FurnitureType::BedRoll => "bed_roll",
            FurnitureType::BedSingle => "bed_single",
            FurnitureType::BedDouble => "bed_double",
            FurnitureType::Wall => "wall",
            FurnitureType::Railing => "railing",
            FurnitureType::Table => "table",
            FurnitureType::Counter => "counter",
            FurnitureType::Chair => "chair",
            FurnitureType::Bench => "bench",
            FurnitureType::Throne => "throne",
            FurnitureType::Cage => "cage",
            FurnitureType::Pillory => "pillory",
            FurnitureType::XCross => "x_cross",
            FurnitureType::CookingPot => "cooking_pot",
            FurnitureType::AlchemyWorkbench => "alchemy_workbench",
            FurnitureType::EnchantingWorkbench => "enchanting_workbench",
            FurnitureType::Anvil => "anvil",
            FurnitureType::Workbench => "workbench",
        }
    }
}

impl fmt::Display for FurnitureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Furniture family plus the offset (in the furniture's local frame) actors
/// are staged around.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FurnitureOffset {
    pub kind: FurnitureType,
    #[serde(default)]
    pub offset: Coordinate,
}

impl FurnitureOffset {
    pub fn new(kind: FurnitureType, offset: Coordinate) -> Self {
        Self { kind, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurnitureEntry {
    pub kind: FurnitureType,
    pub offsets: Vec<Coordinate>,
}

/// Staging offsets a classified piece of furniture offers, grouped by family.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FurnitureDetails {
    pub entries: Vec<FurnitureEntry>,
}

impl FurnitureDetails {
    pub fn kinds(&self) -> impl Iterator<Item = FurnitureType> + '_ {
        self.entries.iter().map(|entry| entry.kind)
    }

    pub fn has_kind(&self, kind: FurnitureType) -> bool {
        self.entries.iter().any(|entry| entry.kind == kind)
    }

    /// Offsets of family `kind`, nearest first, measured between the world
    /// coordinate each offset produces on `anchor` and `target`.
    pub fn closest_offsets(
        &self,
        anchor: &Coordinate,
        kind: FurnitureType,
        target: &Coordinate,
    ) -> Vec<FurnitureOffset> {
        let mut ranked: Vec<(f32, FurnitureOffset)> = self
            .entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .flat_map(|entry| entry.offsets.iter())
            .map(|offset| {
                let world = offset.apply_return(anchor);
                (world.distance(target), FurnitureOffset::new(kind, *offset))
            })
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
        ranked.into_iter().map(|(_, offset)| offset).collect()
    }
}

/// Pack entry binding furniture details to a world reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurnitureDefinition {
    pub reference: ObjectRef,
    pub details: FurnitureDetails,
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn bed() -> FurnitureDetails {
        FurnitureDetails {
            entries: vec![
                FurnitureEntry {
                    kind: FurnitureType::BedDouble,
                    offsets: vec![
                        Coordinate::new(Vec3::new(0.0, 100.0, 40.0), 0.0),
                        Coordinate::new(Vec3::new(0.0, -100.0, 40.0), 0.0),
                    ],
                },
                FurnitureEntry {
                    kind: FurnitureType::Wall,
                    offsets: vec![Coordinate::new(Vec3::new(0.0, 0.0, 0.0), 0.0)],
                },
            ],
        }
    }

    #[test]
    fn closest_offsets_rank_by_distance_to_target() {
        let details = bed();
        let anchor = Coordinate::ORIGIN;
        let target = Coordinate::new(Vec3::new(0.0, -500.0, 0.0), 0.0);
        let ranked = details.closest_offsets(&anchor, FurnitureType::BedDouble, &target);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].offset.location.y, -100.0);
        assert!(ranked.iter().all(|o| o.kind == FurnitureType::BedDouble));
    }

    #[test]
    fn closest_offsets_ignore_other_families() {
        let details = bed();
        let ranked =
            details.closest_offsets(&Coordinate::ORIGIN, FurnitureType::Table, &Coordinate::ORIGIN);
        assert!(ranked.is_empty());
        assert!(details.has_kind(FurnitureType::Wall));
        assert!(FurnitureType::BedDouble.is_bed());
    }
}
