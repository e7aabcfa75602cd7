//! In-memory collaborators: a scene library backed by a scene pack, a world
//! of actors and props described in JSON, and a menu that records what it was
//! told.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use scene_formats::{
    ActorFragment, Coordinate, ExpressionId, FurnitureDetails, ObjectRef, PositionTag, RaceKey,
    Scene, ScenePack, SceneId, Sex, StageId, VoiceId,
};

use crate::host::{ActorWorld, SceneLibrary, SceneMenu, ThreadKey};

#[derive(Debug, Default)]
pub struct MemoryLibrary {
    scenes: BTreeMap<SceneId, Scene>,
    furniture: BTreeMap<ObjectRef, FurnitureDetails>,
    expressions: BTreeSet<ExpressionId>,
    voices: BTreeSet<VoiceId>,
}

impl MemoryLibrary {
    pub fn from_pack(pack: ScenePack) -> Self {
        Self {
            scenes: pack
                .scenes
                .into_iter()
                .map(|scene| (scene.id.clone(), scene))
                .collect(),
            furniture: pack
                .furniture
                .into_iter()
                .map(|def| (def.reference, def.details))
                .collect(),
            expressions: pack.expressions.into_iter().collect(),
            voices: pack.voices.into_iter().collect(),
        }
    }

    /// Unregister a scene; handles that still name it go stale.
    pub fn remove_scene(&mut self, id: &SceneId) -> Option<Scene> {
        self.scenes.remove(id)
    }

    pub fn remove_expression(&mut self, id: &ExpressionId) -> bool {
        self.expressions.remove(id)
    }

    pub fn scene_ids(&self) -> impl Iterator<Item = &SceneId> {
        self.scenes.keys()
    }
}

impl SceneLibrary for MemoryLibrary {
    fn scene(&self, id: &SceneId) -> Option<&Scene> {
        self.scenes.get(id).filter(|scene| scene.enabled)
    }

    fn furniture_details(&self, reference: ObjectRef) -> Option<&FurnitureDetails> {
        self.furniture.get(&reference)
    }

    fn has_expression(&self, id: &ExpressionId) -> bool {
        self.expressions.contains(id)
    }

    fn has_voice(&self, id: &VoiceId) -> bool {
        self.voices.contains(id)
    }
}

/// JSON description of a world to simulate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldDescription {
    pub keys: Vec<ThreadKey>,
    pub actors: Vec<ActorDescription>,
    pub objects: Vec<ObjectDescription>,
}

impl WorldDescription {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading world description {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing world description {}", path.display()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorDescription {
    pub reference: ObjectRef,
    pub sex: Sex,
    pub race: RaceKey,
    #[serde(default = "one")]
    pub scale: f32,
    #[serde(default)]
    pub tags: BTreeSet<PositionTag>,
    #[serde(default)]
    pub location: Vec3,
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "one")]
    pub alpha: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDescription {
    pub reference: ObjectRef,
    #[serde(default)]
    pub location: Vec3,
    #[serde(default)]
    pub rotation: f32,
}

fn one() -> f32 {
    1.0
}

/// Observable state of a simulated actor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActorState {
    pub sex: Sex,
    pub race: RaceKey,
    pub body_scale: f32,
    pub tags: BTreeSet<PositionTag>,
    pub location: Vec3,
    pub rotation: f32,
    pub scale: f32,
    pub alpha: f32,
    pub animation: Option<String>,
}

#[derive(Debug, Default)]
pub struct SimulatedWorld {
    keys: BTreeSet<ThreadKey>,
    actors: BTreeMap<ObjectRef, ActorState>,
    objects: BTreeMap<ObjectRef, Coordinate>,
    registrations: BTreeMap<ThreadKey, SceneId>,
    journal: Vec<String>,
}

impl SimulatedWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_description(description: WorldDescription) -> Self {
        let mut world = Self::new();
        for key in description.keys {
            world.add_key(key);
        }
        for actor in description.actors {
            world.insert_actor(actor);
        }
        for object in description.objects {
            world.insert_object(
                object.reference,
                Coordinate::new(object.location, object.rotation),
            );
        }
        world
    }

    pub fn add_key(&mut self, key: ThreadKey) {
        self.keys.insert(key);
    }

    pub fn invalidate_key(&mut self, key: ThreadKey) -> bool {
        self.keys.remove(&key)
    }

    pub fn insert_actor(&mut self, actor: ActorDescription) {
        self.actors.insert(
            actor.reference,
            ActorState {
                sex: actor.sex,
                race: actor.race,
                body_scale: actor.scale,
                tags: actor.tags,
                location: actor.location,
                rotation: actor.rotation,
                scale: actor.scale,
                alpha: actor.alpha,
                animation: None,
            },
        );
    }

    pub fn insert_object(&mut self, reference: ObjectRef, coordinate: Coordinate) {
        self.objects.insert(reference, coordinate);
    }

    /// Unload an actor or object; later lookups of it fail.
    pub fn remove_reference(&mut self, reference: ObjectRef) -> bool {
        self.actors.remove(&reference).is_some() | self.objects.remove(&reference).is_some()
    }

    pub fn actor(&self, reference: ObjectRef) -> Option<&ActorState> {
        self.actors.get(&reference)
    }

    pub fn actors(&self) -> &BTreeMap<ObjectRef, ActorState> {
        &self.actors
    }

    pub fn registration(&self, key: ThreadKey) -> Option<&SceneId> {
        self.registrations.get(&key)
    }

    pub fn journal(&self) -> &[String] {
        &self.journal
    }
}

impl ActorWorld for SimulatedWorld {
    fn is_valid_key(&self, key: ThreadKey) -> bool {
        self.keys.contains(&key)
    }

    fn reference_coordinate(&self, reference: ObjectRef) -> Option<Coordinate> {
        if let Some(actor) = self.actors.get(&reference) {
            return Some(Coordinate::new(actor.location, actor.rotation));
        }
        self.objects.get(&reference).copied()
    }

    fn fragment(&self, actor: ObjectRef, submissive: bool) -> Option<ActorFragment> {
        let state = self.actors.get(&actor)?;
        let mut fragment = ActorFragment::new(actor, state.sex, state.race.clone());
        fragment.scale = state.body_scale;
        fragment.tags = state.tags.clone();
        if submissive {
            fragment.tags.insert(PositionTag::Submissive);
        }
        Some(fragment)
    }

    fn furniture_near(&self, origin: ObjectRef, radius: f32) -> Vec<ObjectRef> {
        let Some(center) = self.reference_coordinate(origin) else {
            return Vec::new();
        };
        let mut nearby: Vec<(f32, ObjectRef)> = self
            .objects
            .iter()
            .map(|(reference, coordinate)| (coordinate.distance(&center), *reference))
            .filter(|(distance, _)| *distance <= radius)
            .collect();
        nearby.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        nearby.into_iter().map(|(_, reference)| reference).collect()
    }

    fn set_scale(&mut self, actor: ObjectRef, scale: f32) {
        if let Some(state) = self.actors.get_mut(&actor) {
            state.scale = scale;
            self.journal.push(format!("{actor} scale {scale}"));
        }
    }

    fn set_angle(&mut self, actor: ObjectRef, yaw: f32) {
        if let Some(state) = self.actors.get_mut(&actor) {
            state.rotation = yaw;
            self.journal.push(format!("{actor} angle {yaw:.3}"));
        }
    }

    fn set_position(&mut self, actor: ObjectRef, location: Vec3) {
        if let Some(state) = self.actors.get_mut(&actor) {
            state.location = location;
            self.journal.push(format!(
                "{actor} position {:.1} {:.1} {:.1}",
                location.x, location.y, location.z
            ));
        }
    }

    fn notify_animation_graph(&mut self, actor: ObjectRef, event: &str) -> bool {
        let Some(state) = self.actors.get_mut(&actor) else {
            return false;
        };
        state.animation = Some(event.to_string());
        self.journal.push(format!("{actor} animation {event}"));
        true
    }

    fn register_animation_nodes(&mut self, key: ThreadKey, actors: &[ObjectRef], scene: &SceneId) {
        self.registrations.insert(key, scene.clone());
        self.journal
            .push(format!("{key} register {} actors for {scene}", actors.len()));
    }

    fn alpha(&self, actor: ObjectRef) -> f32 {
        self.actors.get(&actor).map_or(1.0, |state| state.alpha)
    }

    fn set_alpha(&mut self, actor: ObjectRef, alpha: f32) {
        if let Some(state) = self.actors.get_mut(&actor) {
            state.alpha = alpha;
            self.journal.push(format!("{actor} alpha {alpha}"));
        }
    }
}

/// Scene menu stand-in that remembers the last value of everything it shows.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RecordingMenu {
    pub owner: Option<ThreadKey>,
    pub scene: Option<SceneId>,
    pub stage: Option<StageId>,
    pub timer: Option<f32>,
    pub sliders: BTreeMap<ObjectRef, f32>,
    pub log: Vec<String>,
}

impl RecordingMenu {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SceneMenu for RecordingMenu {
    fn owner(&self) -> Option<ThreadKey> {
        self.owner
    }

    fn is_open(&self) -> bool {
        self.owner.is_some()
    }

    fn show(&mut self, key: ThreadKey) {
        self.owner = Some(key);
        self.log.push(format!("show {key}"));
    }

    fn hide(&mut self) {
        if let Some(key) = self.owner.take() {
            self.log.push(format!("hide {key}"));
        }
        self.scene = None;
        self.stage = None;
        self.timer = None;
        self.sliders.clear();
    }

    fn update_active_scene(&mut self, scene: &SceneId) {
        self.scene = Some(scene.clone());
        self.stage = None;
        self.log.push(format!("scene {scene}"));
    }

    fn update_stage_info(&mut self, scene: &SceneId, stage: &StageId) {
        self.stage = Some(stage.clone());
        self.log.push(format!("stage {scene}/{stage}"));
    }

    fn update_timer(&mut self, seconds: f32) {
        self.timer = Some(seconds);
    }

    fn update_slider(&mut self, actor: ObjectRef, value: f32) {
        self.sliders.insert(actor, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> SimulatedWorld {
        let description: WorldDescription = serde_json::from_str(
            r#"{
                "keys": [1],
                "actors": [
                    { "reference": 20, "sex": "female", "race": "human", "tags": ["vampire"] },
                    { "reference": 21, "sex": "male", "race": "Human", "location": [50, 0, 0] }
                ],
                "objects": [
                    { "reference": 100, "location": [300, 0, 0] },
                    { "reference": 101, "location": [40, 0, 0] },
                    { "reference": 102, "location": [5000, 0, 0] }
                ]
            }"#,
        )
        .expect("world description parses");
        SimulatedWorld::from_description(description)
    }

    #[test]
    fn fragments_carry_traits_and_submission() {
        let world = world();
        let fragment = world.fragment(ObjectRef(20), true).expect("actor exists");
        assert_eq!(fragment.sex, Sex::Female);
        assert!(fragment.is_submissive());
        assert!(fragment.tags.contains(&PositionTag::Vampire));
        assert!(world.fragment(ObjectRef(99), false).is_none());
    }

    #[test]
    fn nearby_furniture_is_sorted_and_bounded() {
        let world = world();
        assert_eq!(
            world.furniture_near(ObjectRef(20), 750.0),
            vec![ObjectRef(101), ObjectRef(100)]
        );
        assert!(world.furniture_near(ObjectRef(999), 750.0).is_empty());
    }

    #[test]
    fn placement_updates_reference_coordinates() {
        let mut world = world();
        world.set_position(ObjectRef(21), Vec3::new(1.0, 2.0, 3.0));
        world.set_angle(ObjectRef(21), 0.5);
        let coordinate = world.reference_coordinate(ObjectRef(21)).expect("actor exists");
        assert_eq!(coordinate, Coordinate::new(Vec3::new(1.0, 2.0, 3.0), 0.5));
        assert_eq!(world.journal().len(), 2);
    }

    #[test]
    fn menu_hide_clears_ownership() {
        let mut menu = RecordingMenu::new();
        menu.show(ThreadKey(7));
        menu.update_slider(ObjectRef(20), 0.4);
        assert!(menu.is_open());
        menu.hide();
        assert!(!menu.is_open());
        assert!(menu.sliders.is_empty());
        assert_eq!(menu.log, vec!["show 00000007", "hide 00000007"]);
    }
}
