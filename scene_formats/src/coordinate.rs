use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Location plus yaw (radians around the up axis).
///
/// The same type doubles as a relative offset: [`Coordinate::apply`] rotates
/// the offset's planar component by the base yaw before adding it, so an
/// offset authored against an anchor's local frame follows the anchor around.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(default)]
    pub location: Vec3,
    #[serde(default)]
    pub rotation: f32,
}

impl Coordinate {
    pub const ORIGIN: Coordinate = Coordinate {
        location: Vec3::ZERO,
        rotation: 0.0,
    };

    pub fn new(location: Vec3, rotation: f32) -> Self {
        Self { location, rotation }
    }

    /// Treat `self` as an offset and compose it onto `base` in place.
    pub fn apply(&self, base: &mut Coordinate) {
        let planar = Vec2::from_angle(base.rotation).rotate(self.location.truncate());
        base.location += planar.extend(self.location.z);
        base.rotation += self.rotation;
    }

    pub fn apply_return(&self, base: &Coordinate) -> Coordinate {
        let mut out = *base;
        self.apply(&mut out);
        out
    }

    pub fn distance(&self, other: &Coordinate) -> f32 {
        self.location.distance(other.location)
    }
}
