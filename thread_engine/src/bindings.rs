//! Script-facing facade over the registry. Calls are keyed by owning key,
//! take string ids, and answer with neutral values (false, empty, zero)
//! whenever the underlying operation is refused; the refusal itself has
//! already been logged by the runtime.

use log::warn;

use scene_formats::{ExpressionId, ObjectRef, SceneId, StageId, VoiceId};

use crate::host::{Host, ThreadKey};
use crate::instance::{
    CreateRequest, FurniturePreference, SceneCategory, SceneMapping, ThreadRuntime,
};
use crate::registry::InstanceRegistry;
use crate::settings::EngineSettings;

pub struct ThreadModel<'r, 'h> {
    registry: &'r mut InstanceRegistry,
    host: &'r mut Host<'h>,
    settings: &'r EngineSettings,
}

impl<'r, 'h> ThreadModel<'r, 'h> {
    pub fn new(
        registry: &'r mut InstanceRegistry,
        host: &'r mut Host<'h>,
        settings: &'r EngineSettings,
    ) -> Self {
        Self {
            registry,
            host,
            settings,
        }
    }

    fn runtime(&mut self, key: ThreadKey) -> Option<ThreadRuntime<'_, 'h>> {
        let runtime = self.registry.runtime(key, self.host, self.settings);
        if runtime.is_none() {
            warn!("no thread instance for {key}");
        }
        runtime
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_instance(
        &mut self,
        key: ThreadKey,
        actors: &[ObjectRef],
        submissives: &[ObjectRef],
        primary: &[&str],
        lead_in: &[&str],
        custom: &[&str],
        furniture_preference: i32,
    ) -> bool {
        let request = CreateRequest {
            key,
            actors: actors.to_vec(),
            submissives: submissives.to_vec(),
            scenes: SceneMapping {
                primary: scene_ids(primary),
                lead_in: scene_ids(lead_in),
                custom: scene_ids(custom),
            },
            furniture: FurniturePreference::from_raw(furniture_preference),
        };
        self.create(request)
    }

    pub fn create(&mut self, request: CreateRequest) -> bool {
        self.registry
            .create(request, self.host, self.settings)
            .is_ok()
    }

    /// Drop the instance, releasing the scene menu if it held it.
    pub fn destroy_instance(&mut self, key: ThreadKey) {
        if self.host.controls_menu(key) {
            self.host.menu.hide();
        }
        self.registry.destroy(key);
    }

    pub fn get_active_scene(&self, key: ThreadKey) -> String {
        self.registry
            .lookup(key)
            .and_then(|instance| instance.active_scene())
            .map(|id| id.to_string())
            .unwrap_or_default()
    }

    pub fn get_active_stage(&self, key: ThreadKey) -> String {
        self.registry
            .lookup(key)
            .and_then(|instance| instance.active_stage())
            .map(|id| id.to_string())
            .unwrap_or_default()
    }

    pub fn get_playing_scenes(&self, key: ThreadKey) -> Vec<String> {
        self.registry
            .lookup(key)
            .map(|instance| to_strings(instance.playing_scenes()))
            .unwrap_or_default()
    }

    pub fn get_positions(&self, key: ThreadKey) -> Vec<ObjectRef> {
        self.registry
            .lookup(key)
            .map(|instance| instance.actors())
            .unwrap_or_default()
    }

    pub fn get_scenes(&self, key: ThreadKey, category: SceneCategory) -> Vec<String> {
        self.registry
            .lookup(key)
            .map(|instance| to_strings(instance.scenes(category)))
            .unwrap_or_default()
    }

    pub fn get_primary_scenes(&self, key: ThreadKey) -> Vec<String> {
        self.get_scenes(key, SceneCategory::Primary)
    }

    pub fn get_lead_in_scenes(&self, key: ThreadKey) -> Vec<String> {
        self.get_scenes(key, SceneCategory::LeadIn)
    }

    pub fn get_custom_scenes(&self, key: ThreadKey) -> Vec<String> {
        self.get_scenes(key, SceneCategory::Custom)
    }

    /// Advance to `next` and return the stage history with it appended. The
    /// history comes back unchanged when the stage was refused.
    pub fn advance_scene(&mut self, key: ThreadKey, history: &[String], next: &str) -> Vec<String> {
        let mut history = history.to_vec();
        let advanced = self
            .runtime(key)
            .is_some_and(|mut runtime| runtime.advance_scene(&StageId::from(next)).is_ok());
        if advanced {
            history.push(next.to_string());
        }
        history
    }

    pub fn set_active_scene(&mut self, key: ThreadKey, scene: &str) -> bool {
        self.runtime(key)
            .is_some_and(|mut runtime| runtime.set_active_scene(&SceneId::from(scene)).is_ok())
    }

    pub fn reassign_center(&mut self, key: ThreadKey, anchor: ObjectRef) -> bool {
        self.runtime(key)
            .is_some_and(|mut runtime| runtime.replace_center_ref(anchor).unwrap_or(false))
    }

    pub fn update_placement(&mut self, key: ThreadKey, actor: ObjectRef) -> bool {
        self.runtime(key)
            .is_some_and(|mut runtime| runtime.update_placement(actor).is_ok())
    }

    pub fn is_owning_scene_menu(&self, key: ThreadKey) -> bool {
        self.host.controls_menu(key)
    }

    pub fn try_open_scene_menu(&mut self, key: ThreadKey) -> bool {
        self.runtime(key)
            .is_some_and(|mut runtime| runtime.try_open_menu())
    }

    pub fn try_close_scene_menu(&mut self, key: ThreadKey) -> bool {
        self.runtime(key)
            .is_some_and(|mut runtime| runtime.try_close_menu())
    }

    pub fn try_update_menu_timer(&mut self, key: ThreadKey, seconds: f32) {
        if let Some(mut runtime) = self.runtime(key) {
            runtime.update_timer(seconds);
        }
    }

    pub fn get_actor_expression(&mut self, key: ThreadKey, actor: ObjectRef) -> String {
        self.runtime(key)
            .and_then(|runtime| runtime.expression(actor))
            .map(|id| id.to_string())
            .unwrap_or_default()
    }

    /// An empty id clears the expression.
    pub fn set_actor_expression(&mut self, key: ThreadKey, actor: ObjectRef, expression: &str) -> bool {
        let expression = (!expression.is_empty()).then(|| ExpressionId::from(expression));
        self.runtime(key)
            .is_some_and(|mut runtime| runtime.set_expression(actor, expression).is_ok())
    }

    pub fn get_actor_voice(&mut self, key: ThreadKey, actor: ObjectRef) -> String {
        self.runtime(key)
            .and_then(|runtime| runtime.voice(actor))
            .map(|id| id.to_string())
            .unwrap_or_default()
    }

    pub fn set_actor_voice(&mut self, key: ThreadKey, actor: ObjectRef, voice: &str) -> bool {
        let voice = (!voice.is_empty()).then(|| VoiceId::from(voice));
        self.runtime(key)
            .is_some_and(|mut runtime| runtime.set_voice(actor, voice).is_ok())
    }

    pub fn update_enjoyment(&mut self, key: ThreadKey, actor: ObjectRef, value: f32) -> bool {
        self.runtime(key)
            .is_some_and(|mut runtime| runtime.set_enjoyment(actor, value).is_ok())
    }

    pub fn set_ghost_mode(&mut self, key: ThreadKey, actor: ObjectRef, enabled: bool) -> bool {
        self.runtime(key)
            .is_some_and(|mut runtime| runtime.set_ghost_mode(actor, enabled).is_ok())
    }

    pub fn is_ghost_mode(&self, key: ThreadKey, actor: ObjectRef) -> bool {
        self.registry
            .lookup(key)
            .and_then(|instance| instance.position(actor))
            .is_some_and(|position| position.is_ghost())
    }

    pub fn get_unique_permutations(&mut self, key: ThreadKey, actor: ObjectRef) -> i32 {
        self.runtime(key)
            .and_then(|mut runtime| runtime.unique_permutations(actor).ok())
            .map_or(0, saturate)
    }

    pub fn get_current_permutation(&mut self, key: ThreadKey, actor: ObjectRef) -> i32 {
        self.runtime(key)
            .and_then(|mut runtime| runtime.current_permutation(actor).ok())
            .map_or(0, saturate)
    }

    pub fn set_next_permutation(&mut self, key: ThreadKey, actor: ObjectRef) -> bool {
        self.runtime(key)
            .is_some_and(|mut runtime| runtime.set_next_permutation(actor).unwrap_or(false))
    }

    pub fn get_autoplay(&self, key: ThreadKey) -> bool {
        self.registry
            .lookup(key)
            .is_some_and(|instance| instance.autoplay())
    }

    pub fn set_autoplay(&mut self, key: ThreadKey, enabled: bool) {
        if let Some(mut runtime) = self.runtime(key) {
            runtime.set_autoplay(enabled);
        }
    }

    /// Drop instances whose owners the world no longer knows about.
    pub fn prune(&mut self) -> Vec<ThreadKey> {
        let stale = self.registry.prune(&*self.host.world);
        for key in &stale {
            if self.host.controls_menu(*key) {
                self.host.menu.hide();
            }
        }
        stale
    }
}

fn scene_ids(ids: &[&str]) -> Vec<SceneId> {
    ids.iter().map(|id| SceneId::from(*id)).collect()
}

fn to_strings(ids: &[SceneId]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}

fn saturate(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}
