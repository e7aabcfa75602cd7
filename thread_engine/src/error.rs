use scene_formats::{ExpressionId, FurnitureType, ObjectRef, SceneId, StageId, VoiceId};
use thiserror::Error;

use crate::host::ThreadKey;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThreadError {
    #[error("thread instance already exists for {0}")]
    AlreadyExists(ThreadKey),
    #[error("no thread instance for {0}")]
    UnknownInstance(ThreadKey),
    #[error("failed to create thread instance: {0}")]
    Construction(String),
    #[error("scene {0} is not available")]
    UnknownScene(SceneId),
    #[error("scene {scene} is not compatible with {furniture} furniture")]
    IncompatibleFurniture {
        scene: SceneId,
        furniture: FurnitureType,
    },
    #[error("scene {0} has no valid assignments")]
    NoValidAssignment(SceneId),
    #[error("no active scene")]
    NoActiveScene,
    #[error("no active stage")]
    NoActiveStage,
    #[error("stage {stage} is not part of scene {scene}")]
    InvalidStage { scene: SceneId, stage: StageId },
    #[error("actor {0} is not part of the current scene")]
    ActorNotInScene(ObjectRef),
    #[error("reference {0} is not available")]
    UnknownReference(ObjectRef),
    #[error("mismatched furniture type: expected {expected} but got {found} for reference {reference}")]
    FurnitureMismatch {
        expected: FurnitureType,
        found: FurnitureType,
        reference: ObjectRef,
    },
    #[error("reference {0} has no compatible furniture offsets")]
    NoCompatibleOffset(ObjectRef),
    #[error("expression {0} is not registered")]
    UnknownExpression(ExpressionId),
    #[error("voice {0} is not registered")]
    UnknownVoice(VoiceId),
    #[error("inconsistent thread state: {0}")]
    InconsistentState(String),
}

impl ThreadError {
    /// Broken invariants, as opposed to ordinary rejected requests.
    pub fn is_internal(&self) -> bool {
        matches!(self, ThreadError::InconsistentState(_))
    }
}
