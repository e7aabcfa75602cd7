//! Read-only scene content model: scenes, their stage graphs, position slot
//! requirements, furniture staging offsets and the JSON scene pack that
//! bundles them.

pub mod coordinate;
pub mod fragment;
pub mod furniture;
pub mod ids;
pub mod pack;
pub mod scene;

pub use coordinate::Coordinate;
pub use fragment::{ActorFragment, PositionTag, Sex};
pub use furniture::{
    FurnitureDefinition, FurnitureDetails, FurnitureEntry, FurnitureOffset, FurnitureType,
};
pub use ids::{ExpressionId, ObjectRef, RaceKey, SceneId, StageId, VoiceId};
pub use pack::{PackError, ScenePack};
pub use scene::{NodeType, PositionInfo, Scene, SceneFurniture, Stage, StagePosition};
