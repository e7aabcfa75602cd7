//! Thread-instance engine for multi-actor scene sequences: the registry of
//! running threads, the actor-to-position resolver, scene activation, stage
//! advancement, furniture re-anchoring and permutation cycling.

pub mod bindings;
pub mod cli;
pub mod error;
pub mod host;
pub mod instance;
pub mod registry;
pub mod resolver;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod simulation;

pub use bindings::ThreadModel;
pub use error::ThreadError;
pub use host::{ActorWorld, Host, SceneLibrary, SceneMenu, ThreadKey};
pub use instance::{
    CreateRequest, FurniturePreference, Instance, SceneCategory, SceneMapping, ThreadRuntime,
};
pub use registry::InstanceRegistry;
pub use resolver::{find_assignments, Assignment};
pub use settings::EngineSettings;
