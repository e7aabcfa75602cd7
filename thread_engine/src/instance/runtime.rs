use log::{debug, error, info, warn};

use scene_formats::{
    ActorFragment, Coordinate, ExpressionId, FurnitureType, NodeType, ObjectRef, Scene, SceneId,
    StageId, StagePosition, VoiceId,
};

use super::center::Center;
use super::{closest_compatible_offset, permutation, Instance, Position};
use crate::error::ThreadError;
use crate::host::{Host, SceneLibrary};
use crate::resolver::{find_assignments, Assignment};
use crate::settings::EngineSettings;

/// Couples thread instance mutations with the host side effects and logging
/// they require.
pub struct ThreadRuntime<'a, 'h> {
    instance: &'a mut Instance,
    host: &'a mut Host<'h>,
    settings: &'a EngineSettings,
    events: &'a mut Vec<String>,
}

impl<'a, 'h> ThreadRuntime<'a, 'h> {
    pub fn new(
        instance: &'a mut Instance,
        host: &'a mut Host<'h>,
        settings: &'a EngineSettings,
        events: &'a mut Vec<String>,
    ) -> Self {
        Self {
            instance,
            host,
            settings,
            events,
        }
    }

    pub fn instance(&self) -> &Instance {
        self.instance
    }

    fn log(&mut self, message: String) {
        self.events.push(message);
    }

    fn fail<T>(&mut self, err: ThreadError) -> Result<T, ThreadError> {
        let key = self.instance.key();
        if err.is_internal() {
            error!("thread {key}: {err}");
        } else {
            warn!("thread {key}: {err}");
        }
        self.log(format!("thread.{key}.error {err}"));
        Err(err)
    }

    fn library(&self) -> &'h dyn SceneLibrary {
        self.host.library
    }

    /// The active scene, re-resolved through the library.
    fn active_scene(&self) -> Result<&'h Scene, ThreadError> {
        let id = self
            .instance
            .active_scene
            .as_ref()
            .ok_or(ThreadError::NoActiveScene)?;
        self.library()
            .scene(id)
            .ok_or_else(|| ThreadError::UnknownScene(id.clone()))
    }

    fn position_index(&self, actor: ObjectRef) -> Result<usize, ThreadError> {
        self.instance
            .positions
            .iter()
            .position(|position| position.actor == actor)
            .ok_or(ThreadError::ActorNotInScene(actor))
    }

    fn position_mut(&mut self, actor: ObjectRef) -> Result<&mut Position, ThreadError> {
        self.instance
            .position_mut(actor)
            .ok_or(ThreadError::ActorNotInScene(actor))
    }

    pub fn controls_menu(&self) -> bool {
        self.host.controls_menu(self.instance.key())
    }

    pub fn set_active_scene(&mut self, id: &SceneId) -> Result<(), ThreadError> {
        match self.prepare_scene(id) {
            Ok(next) => {
                self.commit_scene(id, next);
                Ok(())
            }
            Err(err) => self.fail(err),
        }
    }

    /// Everything a scene switch changes, computed without touching the instance.
    fn prepare_scene(&self, id: &SceneId) -> Result<PreparedScene, ThreadError> {
        let scene = self
            .library()
            .scene(id)
            .ok_or_else(|| ThreadError::UnknownScene(id.clone()))?;
        let furniture = self.instance.center.kind();
        if !scene.is_compatible_furniture(furniture) {
            return Err(ThreadError::IncompatibleFurniture {
                scene: id.clone(),
                furniture,
            });
        }

        let mut fragments = Vec::with_capacity(self.instance.positions.len());
        for position in &self.instance.positions {
            let fragment = self
                .host
                .world
                .fragment(position.actor, position.submissive)
                .ok_or(ThreadError::UnknownReference(position.actor))?;
            fragments.push(fragment);
        }

        let assignments = find_assignments(scene, &fragments);
        if assignments.is_empty() {
            return Err(ThreadError::NoValidAssignment(id.clone()));
        }
        let unique = fragments
            .iter()
            .map(|fragment| permutation::unique_permutations(&assignments, fragment.actor))
            .collect();
        let base_coordinates = self
            .instance
            .center
            .base_coordinates(&*self.host.world, &scene.furniture.offset)?;

        Ok(PreparedScene {
            fragments,
            unique,
            assignments,
            base_coordinates,
        })
    }

    fn commit_scene(&mut self, id: &SceneId, next: PreparedScene) {
        let PreparedScene {
            fragments,
            unique,
            assignments,
            base_coordinates,
        } = next;
        for ((position, fragment), count) in self
            .instance
            .positions
            .iter_mut()
            .zip(fragments)
            .zip(unique)
        {
            position.fragment = fragment;
            position.unique_permutations = count;
        }
        let count = assignments.len();
        self.instance.assignments = assignments;
        self.instance.active_assignment = 0;
        self.instance.active_scene = Some(id.clone());
        self.instance.active_stage = None;
        self.instance.base_coordinates = base_coordinates;

        let key = self.instance.key();
        self.log(format!("thread.{key}.scene {id} assignments {count}"));
        if self.controls_menu() {
            self.host.menu.update_active_scene(id);
        }
    }

    pub fn advance_scene(&mut self, next: &StageId) -> Result<(), ThreadError> {
        let scene = match self.active_scene() {
            Ok(scene) => scene,
            Err(err) => return self.fail(err),
        };
        if scene.node_type(next) == NodeType::None {
            return self.fail(ThreadError::InvalidStage {
                scene: scene.id.clone(),
                stage: next.clone(),
            });
        }
        let Some(assignment) = self.instance.current_assignment().cloned() else {
            return self.fail(ThreadError::InconsistentState(format!(
                "assignment cursor {} is out of range",
                self.instance.active_assignment
            )));
        };
        if let Err(err) = stage_slots(scene, next, assignment.len()) {
            return self.fail(err);
        }

        let key = self.instance.key();
        if !self.instance.animation_registered {
            self.host
                .world
                .register_animation_nodes(key, &assignment, &scene.id);
            self.instance.animation_registered = true;
        }

        self.place(scene, next, &assignment, None, true)?;
        self.instance.active_stage = Some(next.clone());
        self.log(format!("thread.{key}.stage {}/{next}", scene.id));
        if self.controls_menu() {
            self.host.menu.update_stage_info(&scene.id, next);
        }
        Ok(())
    }

    /// Move bound actors to their slot for `stage`. With `only` set, a single
    /// actor is re-placed and nothing but its transform changes.
    fn place(
        &mut self,
        scene: &Scene,
        stage: &StageId,
        assignment: &[ObjectRef],
        only: Option<ObjectRef>,
        animate: bool,
    ) -> Result<(), ThreadError> {
        let slots = match stage_slots(scene, stage, assignment.len()) {
            Ok(slots) => slots,
            Err(err) => return self.fail(err),
        };
        let base = self.instance.base_coordinates;
        for (slot, (actor, slot_data)) in assignment.iter().copied().zip(slots).enumerate() {
            if only.is_some_and(|target| target != actor) {
                continue;
            }
            let world = slot_data.offset.apply_return(&base);
            debug!(
                "thread {}: placing {actor} in slot {slot} at {:?} yaw {}",
                self.instance.key(),
                world.location,
                world.rotation
            );
            if animate {
                let scale = scene.nth_position(slot).map_or(1.0, |info| info.scale);
                self.host.world.set_scale(actor, scale);
            }
            self.host.world.set_angle(actor, world.rotation);
            self.host.world.set_position(actor, world.location);
            if animate && !self.host.world.notify_animation_graph(actor, &slot_data.event) {
                warn!(
                    "thread {}: animation graph of {actor} rejected {}",
                    self.instance.key(),
                    slot_data.event
                );
            }
        }
        Ok(())
    }

    /// Re-place one actor at its slot for the active stage.
    pub fn update_placement(&mut self, actor: ObjectRef) -> Result<(), ThreadError> {
        let scene = match self.active_scene() {
            Ok(scene) => scene,
            Err(err) => return self.fail(err),
        };
        let Some(stage) = self.instance.active_stage.clone() else {
            return self.fail(ThreadError::NoActiveStage);
        };
        let Some(assignment) = self.instance.current_assignment().cloned() else {
            return self.fail(ThreadError::NoActiveScene);
        };
        if !assignment.contains(&actor) {
            return self.fail(ThreadError::ActorNotInScene(actor));
        }
        self.place(scene, &stage, &assignment, Some(actor), false)?;
        let key = self.instance.key();
        self.log(format!("thread.{key}.placement {actor}"));
        Ok(())
    }

    /// Move the thread onto `anchor`. `Ok(false)` when it already is the anchor.
    pub fn replace_center_ref(&mut self, anchor: ObjectRef) -> Result<bool, ThreadError> {
        let key = self.instance.key();
        if self.instance.center.anchor == Some(anchor) {
            info!("thread {key}: {anchor} already anchors this thread");
            return Ok(false);
        }
        let scene_offset = if self.instance.active_scene.is_some() {
            match self.active_scene() {
                Ok(scene) => scene.furniture.offset,
                Err(err) => return self.fail(err),
            }
        } else {
            Coordinate::ORIGIN
        };
        let center = match self.prepare_center(anchor) {
            Ok(center) => center,
            Err(err) => return self.fail(err),
        };
        let base = match center.base_coordinates(&*self.host.world, &scene_offset) {
            Ok(base) => base,
            Err(err) => return self.fail(err),
        };

        let previous = (self.instance.center, self.instance.base_coordinates);
        self.instance.center = center;
        self.instance.base_coordinates = base;
        if let Some(stage) = self.instance.active_stage.clone() {
            if let Err(err) = self.advance_scene(&stage) {
                (self.instance.center, self.instance.base_coordinates) = previous;
                return Err(err);
            }
        }
        self.log(format!(
            "thread.{key}.center {anchor} {}",
            center.kind()
        ));
        Ok(true)
    }

    fn prepare_center(&self, anchor: ObjectRef) -> Result<Center, ThreadError> {
        let library = self.library();
        let current = self.instance.center.kind();
        let anchor_coordinate = self
            .host
            .world
            .reference_coordinate(anchor)
            .ok_or(ThreadError::UnknownReference(anchor))?;

        let Some(details) = library.furniture_details(anchor) else {
            if current.is_none() {
                return Ok(Center::standalone(anchor, anchor_coordinate));
            }
            return Err(ThreadError::FurnitureMismatch {
                expected: current,
                found: FurnitureType::None,
                reference: anchor,
            });
        };

        // Staying close to where the actors already stand.
        let previous = self
            .instance
            .center
            .anchor_coordinate(&*self.host.world)
            .unwrap_or(self.instance.base_coordinates);
        let active = self.active_scene().ok();
        let kinds: Vec<FurnitureType> = details
            .kinds()
            .filter(|kind| match active {
                Some(scene) => scene.is_compatible_furniture(*kind),
                None => *kind == current,
            })
            .collect();
        closest_compatible_offset(details, &anchor_coordinate, &kinds, &previous)
            .map(|offset| Center::on_furniture(anchor, offset))
            .ok_or(ThreadError::NoCompatibleOffset(anchor))
    }

    pub fn unique_permutations(&mut self, actor: ObjectRef) -> Result<usize, ThreadError> {
        match self.position_index(actor) {
            Ok(index) => Ok(self.instance.positions[index].unique_permutations),
            Err(err) => self.fail(err),
        }
    }

    pub fn current_permutation(&mut self, actor: ObjectRef) -> Result<usize, ThreadError> {
        if self.instance.active_scene.is_none() {
            return self.fail(ThreadError::NoActiveScene);
        }
        if let Err(err) = self.position_index(actor) {
            return self.fail(err);
        }
        match permutation::permutation_index(
            &self.instance.assignments,
            self.instance.active_assignment,
            actor,
        ) {
            Ok(index) => Ok(index),
            Err(err) => self.fail(err),
        }
    }

    /// Step `actor` to its next distinct slot. `Ok(false)` when it has only one.
    pub fn set_next_permutation(&mut self, actor: ObjectRef) -> Result<bool, ThreadError> {
        let key = self.instance.key();
        if self.instance.active_scene.is_none() {
            return self.fail(ThreadError::NoActiveScene);
        }
        if let Err(err) = self.position_index(actor) {
            return self.fail(err);
        }
        let cursor = match permutation::next_permutation_cursor(
            &self.instance.assignments,
            self.instance.active_assignment,
            actor,
        ) {
            Ok(Some(cursor)) => cursor,
            Ok(None) => {
                info!("thread {key}: {actor} has a single permutation");
                return Ok(false);
            }
            Err(err) => return self.fail(err),
        };

        let previous = std::mem::replace(&mut self.instance.active_assignment, cursor);
        if let Some(stage) = self.instance.active_stage.clone() {
            if let Err(err) = self.advance_scene(&stage) {
                self.instance.active_assignment = previous;
                return Err(err);
            }
        }
        self.log(format!("thread.{key}.permutation {actor} -> {cursor}"));
        Ok(true)
    }

    /// Stored expression, if it is still in the catalogue.
    pub fn expression(&self, actor: ObjectRef) -> Option<ExpressionId> {
        let library = self.library();
        self.instance
            .position(actor)?
            .expression
            .clone()
            .filter(|id| library.has_expression(id))
    }

    pub fn set_expression(
        &mut self,
        actor: ObjectRef,
        expression: Option<ExpressionId>,
    ) -> Result<(), ThreadError> {
        if let Some(id) = &expression {
            if !self.library().has_expression(id) {
                return self.fail(ThreadError::UnknownExpression(id.clone()));
            }
        }
        let label = expression
            .as_ref()
            .map_or_else(|| "<none>".to_string(), ToString::to_string);
        match self.position_mut(actor) {
            Ok(position) => position.expression = expression,
            Err(err) => return self.fail(err),
        }
        let key = self.instance.key();
        self.log(format!("thread.{key}.expression {actor} {label}"));
        Ok(())
    }

    pub fn voice(&self, actor: ObjectRef) -> Option<VoiceId> {
        let library = self.library();
        self.instance
            .position(actor)?
            .voice
            .clone()
            .filter(|id| library.has_voice(id))
    }

    pub fn set_voice(&mut self, actor: ObjectRef, voice: Option<VoiceId>) -> Result<(), ThreadError> {
        if let Some(id) = &voice {
            if !self.library().has_voice(id) {
                return self.fail(ThreadError::UnknownVoice(id.clone()));
            }
        }
        let label = voice
            .as_ref()
            .map_or_else(|| "<none>".to_string(), ToString::to_string);
        match self.position_mut(actor) {
            Ok(position) => position.voice = voice,
            Err(err) => return self.fail(err),
        }
        let key = self.instance.key();
        self.log(format!("thread.{key}.voice {actor} {label}"));
        Ok(())
    }

    pub fn set_ghost_mode(&mut self, actor: ObjectRef, enabled: bool) -> Result<(), ThreadError> {
        let key = self.instance.key();
        let index = match self.position_index(actor) {
            Ok(index) => index,
            Err(err) => return self.fail(err),
        };
        if enabled {
            if self.instance.positions[index].ghost_alpha.is_none() {
                let alpha = self.host.world.alpha(actor);
                self.instance.positions[index].ghost_alpha = Some(alpha);
            }
            self.host.world.set_alpha(actor, self.settings.ghost_alpha);
        } else {
            match self.instance.positions[index].ghost_alpha.take() {
                Some(alpha) => self.host.world.set_alpha(actor, alpha),
                None => {
                    warn!("thread {key}: {actor} is not in ghost mode, resetting alpha");
                    self.host.world.set_alpha(actor, 1.0);
                }
            }
        }
        self.log(format!("thread.{key}.ghost {actor} {enabled}"));
        Ok(())
    }

    pub fn is_ghost(&self, actor: ObjectRef) -> bool {
        self.instance
            .position(actor)
            .is_some_and(Position::is_ghost)
    }

    pub fn set_enjoyment(&mut self, actor: ObjectRef, value: f32) -> Result<(), ThreadError> {
        match self.position_mut(actor) {
            Ok(position) => position.enjoyment = value,
            Err(err) => return self.fail(err),
        }
        if self.controls_menu() {
            self.host.menu.update_slider(actor, value);
        }
        Ok(())
    }

    /// Hand the menu to this thread. Fails while any menu is open.
    pub fn try_open_menu(&mut self) -> bool {
        let key = self.instance.key();
        if self.host.menu.is_open() {
            info!("thread {key}: scene menu is already open");
            return false;
        }
        self.host.menu.show(key);
        if let Some(scene) = self.instance.active_scene.clone() {
            self.host.menu.update_active_scene(&scene);
            if let Some(stage) = self.instance.active_stage.clone() {
                self.host.menu.update_stage_info(&scene, &stage);
            }
        }
        self.log(format!("thread.{key}.menu open"));
        true
    }

    pub fn try_close_menu(&mut self) -> bool {
        let key = self.instance.key();
        if !self.host.menu.is_open() {
            info!("thread {key}: no scene menu to close");
            return false;
        }
        self.host.menu.hide();
        self.log(format!("thread.{key}.menu close"));
        true
    }

    pub fn update_timer(&mut self, seconds: f32) -> bool {
        if !self.controls_menu() {
            return false;
        }
        self.host.menu.update_timer(seconds);
        true
    }

    pub fn set_autoplay(&mut self, enabled: bool) {
        self.instance.autoplay = enabled;
        let key = self.instance.key();
        self.log(format!("thread.{key}.autoplay {enabled}"));
    }
}

/// Slot data of `stage`, checked to cover every bound actor before anyone moves.
fn stage_slots<'s>(
    scene: &'s Scene,
    stage: &StageId,
    bound: usize,
) -> Result<&'s [StagePosition], ThreadError> {
    let Some(stage_data) = scene.stage(stage) else {
        return Err(ThreadError::InvalidStage {
            scene: scene.id.clone(),
            stage: stage.clone(),
        });
    };
    if stage_data.positions.len() < bound {
        return Err(ThreadError::InconsistentState(format!(
            "stage {}/{stage} has {} slots for {bound} actors",
            scene.id,
            stage_data.positions.len()
        )));
    }
    Ok(&stage_data.positions)
}

struct PreparedScene {
    fragments: Vec<ActorFragment>,
    unique: Vec<usize>,
    assignments: Vec<Assignment>,
    base_coordinates: Coordinate,
}
