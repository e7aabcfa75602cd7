//! Seams to the systems a thread instance borrows but never owns: the scene
//! content library, the live world (actors, furniture, animation graphs) and
//! the scene menu.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use scene_formats::{
    ActorFragment, Coordinate, ExpressionId, FurnitureDetails, ObjectRef, Scene, SceneId, StageId,
    VoiceId,
};

/// Identity of the external object that owns a thread instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadKey(pub u32);

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

/// Read-only scene content. Every handle the engine stores is resolved
/// through this trait again at the point of use.
pub trait SceneLibrary {
    fn scene(&self, id: &SceneId) -> Option<&Scene>;
    fn furniture_details(&self, reference: ObjectRef) -> Option<&FurnitureDetails>;
    fn has_expression(&self, id: &ExpressionId) -> bool;
    fn has_voice(&self, id: &VoiceId) -> bool;
}

/// The live world: object lookup, actor metadata and the placement /
/// animation side effects of advancing a stage.
pub trait ActorWorld {
    fn is_valid_key(&self, key: ThreadKey) -> bool;
    fn reference_coordinate(&self, reference: ObjectRef) -> Option<Coordinate>;
    fn fragment(&self, actor: ObjectRef, submissive: bool) -> Option<ActorFragment>;
    /// Candidate furniture near `origin`, nearest first.
    fn furniture_near(&self, origin: ObjectRef, radius: f32) -> Vec<ObjectRef>;

    fn set_scale(&mut self, actor: ObjectRef, scale: f32);
    fn set_angle(&mut self, actor: ObjectRef, yaw: f32);
    fn set_position(&mut self, actor: ObjectRef, location: Vec3);
    fn notify_animation_graph(&mut self, actor: ObjectRef, event: &str) -> bool;
    fn register_animation_nodes(&mut self, key: ThreadKey, actors: &[ObjectRef], scene: &SceneId);

    fn alpha(&self, actor: ObjectRef) -> f32;
    fn set_alpha(&mut self, actor: ObjectRef, alpha: f32);
}

/// The on-screen scene menu. Only one instance may own it at a time; the
/// engine never assumes it exists.
pub trait SceneMenu {
    fn owner(&self) -> Option<ThreadKey>;
    fn is_open(&self) -> bool;
    fn show(&mut self, key: ThreadKey);
    fn hide(&mut self);
    fn update_active_scene(&mut self, scene: &SceneId);
    fn update_stage_info(&mut self, scene: &SceneId, stage: &StageId);
    fn update_timer(&mut self, seconds: f32);
    fn update_slider(&mut self, actor: ObjectRef, value: f32);
}

/// Borrowed bundle of collaborators handed to every runtime operation.
pub struct Host<'h> {
    pub library: &'h dyn SceneLibrary,
    pub world: &'h mut dyn ActorWorld,
    pub menu: &'h mut dyn SceneMenu,
}

impl<'h> Host<'h> {
    pub fn new(
        library: &'h dyn SceneLibrary,
        world: &'h mut dyn ActorWorld,
        menu: &'h mut dyn SceneMenu,
    ) -> Self {
        Self {
            library,
            world,
            menu,
        }
    }

    pub fn controls_menu(&self, key: ThreadKey) -> bool {
        self.menu.owner() == Some(key)
    }
}
