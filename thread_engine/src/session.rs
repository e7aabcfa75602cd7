//! Scripted host session: replays a JSON list of binding calls against the
//! in-memory collaborators and reports what happened.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use scene_formats::{ObjectRef, ScenePack};

use crate::bindings::ThreadModel;
use crate::host::{Host, ThreadKey};
use crate::instance::{CreateRequest, SceneCategory};
use crate::registry::InstanceRegistry;
use crate::settings::EngineSettings;
use crate::simulation::{
    ActorState, MemoryLibrary, RecordingMenu, SimulatedWorld, WorldDescription,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SessionCommand {
    Create(CreateRequest),
    Destroy {
        key: ThreadKey,
    },
    SetActiveScene {
        key: ThreadKey,
        scene: String,
    },
    AdvanceScene {
        key: ThreadKey,
        stage: String,
    },
    ReassignCenter {
        key: ThreadKey,
        reference: ObjectRef,
    },
    UpdatePlacement {
        key: ThreadKey,
        actor: ObjectRef,
    },
    NextPermutation {
        key: ThreadKey,
        actor: ObjectRef,
    },
    SetExpression {
        key: ThreadKey,
        actor: ObjectRef,
        #[serde(default)]
        expression: String,
    },
    SetVoice {
        key: ThreadKey,
        actor: ObjectRef,
        #[serde(default)]
        voice: String,
    },
    Ghost {
        key: ThreadKey,
        actor: ObjectRef,
        enabled: bool,
    },
    Enjoyment {
        key: ThreadKey,
        actor: ObjectRef,
        value: f32,
    },
    OpenMenu {
        key: ThreadKey,
    },
    CloseMenu {
        key: ThreadKey,
    },
    UpdateTimer {
        key: ThreadKey,
        seconds: f32,
    },
    Autoplay {
        key: ThreadKey,
        enabled: bool,
    },
    /// The host forgets an owning key; the next prune drops its instance.
    InvalidateKey {
        key: ThreadKey,
    },
    Prune,
    Query {
        key: ThreadKey,
    },
}

impl SessionCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::Create(_) => "create",
            SessionCommand::Destroy { .. } => "destroy",
            SessionCommand::SetActiveScene { .. } => "set_active_scene",
            SessionCommand::AdvanceScene { .. } => "advance_scene",
            SessionCommand::ReassignCenter { .. } => "reassign_center",
            SessionCommand::UpdatePlacement { .. } => "update_placement",
            SessionCommand::NextPermutation { .. } => "next_permutation",
            SessionCommand::SetExpression { .. } => "set_expression",
            SessionCommand::SetVoice { .. } => "set_voice",
            SessionCommand::Ghost { .. } => "ghost",
            SessionCommand::Enjoyment { .. } => "enjoyment",
            SessionCommand::OpenMenu { .. } => "open_menu",
            SessionCommand::CloseMenu { .. } => "close_menu",
            SessionCommand::UpdateTimer { .. } => "update_timer",
            SessionCommand::Autoplay { .. } => "autoplay",
            SessionCommand::InvalidateKey { .. } => "invalidate_key",
            SessionCommand::Prune => "prune",
            SessionCommand::Query { .. } => "query",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionScript {
    pub commands: Vec<SessionCommand>,
}

impl SessionScript {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading session script {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing session script {}", path.display()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub op: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<InstanceSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceSnapshot {
    pub key: ThreadKey,
    pub active_scene: String,
    pub active_stage: String,
    pub playing_scenes: Vec<String>,
    pub primary_scenes: Vec<String>,
    pub actors: Vec<ObjectRef>,
    pub positions: Vec<PositionSnapshot>,
    pub owns_menu: bool,
    pub autoplay: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionSnapshot {
    pub actor: ObjectRef,
    pub unique_permutations: i32,
    pub current_permutation: i32,
    pub expression: String,
    pub voice: String,
    pub ghost: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub steps: Vec<StepReport>,
    pub events: Vec<String>,
    pub actors: BTreeMap<ObjectRef, ActorState>,
    pub menu: RecordingMenu,
    pub live_instances: Vec<ThreadKey>,
}

impl SessionReport {
    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|step| !step.ok).count()
    }
}

pub fn run_session(
    pack: ScenePack,
    world: WorldDescription,
    script: &SessionScript,
    settings: &EngineSettings,
) -> SessionReport {
    let library = MemoryLibrary::from_pack(pack);
    let mut world = SimulatedWorld::from_description(world);
    let mut menu = RecordingMenu::new();
    let mut registry = InstanceRegistry::new();

    let mut steps = Vec::with_capacity(script.commands.len());
    for (index, command) in script.commands.iter().enumerate() {
        // Key invalidation talks to the world directly, outside the binding layer.
        if let SessionCommand::InvalidateKey { key } = command {
            let ok = world.invalidate_key(*key);
            steps.push(StepReport {
                index,
                op: command.name(),
                ok,
                snapshot: None,
            });
            continue;
        }
        let mut host = Host::new(&library, &mut world, &mut menu);
        let mut model = ThreadModel::new(&mut registry, &mut host, settings);
        let (ok, snapshot) = apply(&mut model, command);
        info!("step {index} {} -> {ok}", command.name());
        steps.push(StepReport {
            index,
            op: command.name(),
            ok,
            snapshot,
        });
    }

    let live_instances = registry.keys().collect();
    registry.clear();
    SessionReport {
        steps,
        events: registry.take_events(),
        actors: world.actors().clone(),
        menu,
        live_instances,
    }
}

fn apply(model: &mut ThreadModel<'_, '_>, command: &SessionCommand) -> (bool, Option<InstanceSnapshot>) {
    let ok = match command {
        SessionCommand::Create(request) => model.create(request.clone()),
        SessionCommand::Destroy { key } => {
            let existed = !model.get_positions(*key).is_empty();
            model.destroy_instance(*key);
            existed
        }
        SessionCommand::SetActiveScene { key, scene } => model.set_active_scene(*key, scene),
        SessionCommand::AdvanceScene { key, stage } => {
            let history = model.advance_scene(*key, &[], stage);
            !history.is_empty()
        }
        SessionCommand::ReassignCenter { key, reference } => {
            model.reassign_center(*key, *reference)
        }
        SessionCommand::UpdatePlacement { key, actor } => model.update_placement(*key, *actor),
        SessionCommand::NextPermutation { key, actor } => model.set_next_permutation(*key, *actor),
        SessionCommand::SetExpression {
            key,
            actor,
            expression,
        } => model.set_actor_expression(*key, *actor, expression),
        SessionCommand::SetVoice { key, actor, voice } => {
            model.set_actor_voice(*key, *actor, voice)
        }
        SessionCommand::Ghost {
            key,
            actor,
            enabled,
        } => model.set_ghost_mode(*key, *actor, *enabled),
        SessionCommand::Enjoyment { key, actor, value } => {
            model.update_enjoyment(*key, *actor, *value)
        }
        SessionCommand::OpenMenu { key } => model.try_open_scene_menu(*key),
        SessionCommand::CloseMenu { key } => model.try_close_scene_menu(*key),
        SessionCommand::UpdateTimer { key, seconds } => {
            model.try_update_menu_timer(*key, *seconds);
            model.is_owning_scene_menu(*key)
        }
        SessionCommand::Autoplay { key, enabled } => {
            model.set_autoplay(*key, *enabled);
            model.get_autoplay(*key) == *enabled
        }
        SessionCommand::InvalidateKey { .. } => false,
        SessionCommand::Prune => !model.prune().is_empty(),
        SessionCommand::Query { key } => {
            let snapshot = snapshot(model, *key);
            return (snapshot.is_some(), snapshot);
        }
    };
    (ok, None)
}

fn snapshot(model: &mut ThreadModel<'_, '_>, key: ThreadKey) -> Option<InstanceSnapshot> {
    let actors = model.get_positions(key);
    if actors.is_empty() {
        return None;
    }
    let active_scene = model.get_active_scene(key);
    let playing = !active_scene.is_empty();
    let positions = actors
        .iter()
        .map(|actor| PositionSnapshot {
            actor: *actor,
            unique_permutations: model.get_unique_permutations(key, *actor),
            current_permutation: if playing {
                model.get_current_permutation(key, *actor)
            } else {
                0
            },
            expression: model.get_actor_expression(key, *actor),
            voice: model.get_actor_voice(key, *actor),
            ghost: model.is_ghost_mode(key, *actor),
        })
        .collect();
    Some(InstanceSnapshot {
        key,
        active_scene,
        active_stage: model.get_active_stage(key),
        playing_scenes: model.get_playing_scenes(key),
        primary_scenes: model.get_scenes(key, SceneCategory::Primary),
        actors,
        positions,
        owns_menu: model.is_owning_scene_menu(key),
        autoplay: model.get_autoplay(key),
    })
}
