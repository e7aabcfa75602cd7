use serde::Serialize;

use scene_formats::{ActorFragment, ExpressionId, ObjectRef, VoiceId};

/// Per-actor runtime slot state. One per participating actor, in the order
/// the actors were handed to the instance.
#[derive(Debug, Clone, Serialize)]
pub struct Position {
    pub actor: ObjectRef,
    pub submissive: bool,
    pub fragment: ActorFragment,
    pub(crate) expression: Option<ExpressionId>,
    pub(crate) voice: Option<VoiceId>,
    /// Alpha the actor had before entering ghost mode.
    pub(crate) ghost_alpha: Option<f32>,
    pub(crate) unique_permutations: usize,
    pub(crate) enjoyment: f32,
}

impl Position {
    pub(crate) fn new(fragment: ActorFragment, submissive: bool) -> Self {
        Self {
            actor: fragment.actor,
            submissive,
            fragment,
            expression: None,
            voice: None,
            ghost_alpha: None,
            unique_permutations: 0,
            enjoyment: 0.0,
        }
    }

    pub fn is_ghost(&self) -> bool {
        self.ghost_alpha.is_some()
    }

    pub fn unique_permutations(&self) -> usize {
        self.unique_permutations
    }

    pub fn enjoyment(&self) -> f32 {
        self.enjoyment
    }
}
