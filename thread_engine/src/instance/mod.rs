//! Thread instances: one running scene sequence bound to a set of actors and
//! an anchor object.

mod center;
pub mod permutation;
mod position;
mod runtime;

use std::collections::BTreeSet;
use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use scene_formats::{Coordinate, FurnitureType, ObjectRef, PositionInfo, Scene, SceneId, StageId};

use crate::error::ThreadError;
use crate::host::{Host, SceneLibrary, ThreadKey};
use crate::resolver::Assignment;
use crate::settings::EngineSettings;

pub use center::Center;
pub use position::Position;
pub use runtime::ThreadRuntime;

pub(crate) use center::closest_compatible_offset;

/// How eagerly an instance anchors itself on nearby furniture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FurniturePreference {
    Disallow,
    #[default]
    Default,
    Prefer,
}

impl FurniturePreference {
    /// Decode the host's integer encoding; unknown values fall back to `Default`.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => FurniturePreference::Disallow,
            2 => FurniturePreference::Prefer,
            _ => FurniturePreference::Default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneCategory {
    Primary,
    LeadIn,
    Custom,
}

impl SceneCategory {
    pub const ALL: [SceneCategory; 3] = [
        SceneCategory::Primary,
        SceneCategory::LeadIn,
        SceneCategory::Custom,
    ];

    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(SceneCategory::Primary),
            1 => Some(SceneCategory::LeadIn),
            2 => Some(SceneCategory::Custom),
            _ => None,
        }
    }
}

impl fmt::Display for SceneCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SceneCategory::Primary => "primary",
            SceneCategory::LeadIn => "lead_in",
            SceneCategory::Custom => "custom",
        };
        f.pad(label)
    }
}

/// Candidate scenes grouped by the role they play in the thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneMapping {
    pub primary: Vec<SceneId>,
    pub lead_in: Vec<SceneId>,
    pub custom: Vec<SceneId>,
}

impl SceneMapping {
    pub fn get(&self, category: SceneCategory) -> &[SceneId] {
        match category {
            SceneCategory::Primary => &self.primary,
            SceneCategory::LeadIn => &self.lead_in,
            SceneCategory::Custom => &self.custom,
        }
    }

    fn get_mut(&mut self, category: SceneCategory) -> &mut Vec<SceneId> {
        match category {
            SceneCategory::Primary => &mut self.primary,
            SceneCategory::LeadIn => &mut self.lead_in,
            SceneCategory::Custom => &mut self.custom,
        }
    }

    pub fn is_empty(&self) -> bool {
        SceneCategory::ALL
            .iter()
            .all(|category| self.get(*category).is_empty())
    }

    pub fn category_of(&self, scene: &SceneId) -> Option<SceneCategory> {
        SceneCategory::ALL
            .into_iter()
            .find(|category| self.get(*category).contains(scene))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneId> {
        self.primary
            .iter()
            .chain(self.lead_in.iter())
            .chain(self.custom.iter())
    }
}

/// Everything needed to start a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub key: ThreadKey,
    pub actors: Vec<ObjectRef>,
    #[serde(default)]
    pub submissives: Vec<ObjectRef>,
    pub scenes: SceneMapping,
    #[serde(default)]
    pub furniture: FurniturePreference,
}

#[derive(Debug, Clone, Serialize)]
pub struct Instance {
    key: ThreadKey,
    pub(crate) positions: Vec<Position>,
    scenes: SceneMapping,
    furniture_preference: FurniturePreference,
    pub(crate) center: Center,
    pub(crate) active_scene: Option<SceneId>,
    pub(crate) active_stage: Option<StageId>,
    pub(crate) assignments: Vec<Assignment>,
    pub(crate) active_assignment: usize,
    pub(crate) base_coordinates: Coordinate,
    pub(crate) animation_registered: bool,
    pub(crate) autoplay: bool,
}

impl Instance {
    /// Validate the request against the host and build an idle instance.
    /// Nothing is observable on failure.
    pub fn build(
        request: CreateRequest,
        host: &Host<'_>,
        settings: &EngineSettings,
    ) -> Result<Self, ThreadError> {
        let CreateRequest {
            key,
            actors,
            submissives,
            scenes,
            furniture,
        } = request;

        if actors.is_empty() {
            return Err(ThreadError::Construction("no actors given".to_string()));
        }
        let mut seen = BTreeSet::new();
        if let Some(dup) = actors.iter().find(|actor| !seen.insert(**actor)) {
            return Err(ThreadError::Construction(format!(
                "actor {dup} is listed more than once"
            )));
        }
        if let Some(stray) = submissives.iter().find(|actor| !seen.contains(actor)) {
            return Err(ThreadError::Construction(format!(
                "submissive {stray} is not one of the actors"
            )));
        }

        let mut positions = Vec::with_capacity(actors.len());
        for actor in &actors {
            let submissive = submissives.contains(actor);
            let fragment = host.world.fragment(*actor, submissive).ok_or_else(|| {
                ThreadError::Construction(format!("no fragment for actor {actor}"))
            })?;
            if host.world.reference_coordinate(*actor).is_none() {
                return Err(ThreadError::Construction(format!(
                    "actor {actor} is not loaded"
                )));
            }
            positions.push(Position::new(fragment, submissive));
        }

        let scenes = resolve_scene_mapping(key, scenes, host.library);
        if scenes.is_empty() {
            return Err(ThreadError::Construction(
                "no playable scenes given".to_string(),
            ));
        }

        let candidates: Vec<&Scene> = scenes
            .iter()
            .filter_map(|id| host.library.scene(id))
            .collect();
        let lead = actors[0];
        let lead_coordinate = host.world.reference_coordinate(lead).ok_or_else(|| {
            ThreadError::Construction(format!("actor {lead} is not loaded"))
        })?;
        let center = select_center(
            lead,
            lead_coordinate,
            furniture,
            &candidates,
            host,
            settings,
        );
        let base_coordinates = center
            .base_coordinates(&*host.world, &Coordinate::ORIGIN)
            .map_err(|err| ThreadError::Construction(err.to_string()))?;

        Ok(Self {
            key,
            positions,
            scenes,
            furniture_preference: furniture,
            center,
            active_scene: None,
            active_stage: None,
            assignments: Vec::new(),
            active_assignment: 0,
            base_coordinates,
            animation_registered: false,
            autoplay: false,
        })
    }

    pub fn key(&self) -> ThreadKey {
        self.key
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn position(&self, actor: ObjectRef) -> Option<&Position> {
        self.positions.iter().find(|position| position.actor == actor)
    }

    pub(crate) fn position_mut(&mut self, actor: ObjectRef) -> Option<&mut Position> {
        self.positions
            .iter_mut()
            .find(|position| position.actor == actor)
    }

    pub fn scenes(&self, category: SceneCategory) -> &[SceneId] {
        self.scenes.get(category)
    }

    pub fn scene_mapping(&self) -> &SceneMapping {
        &self.scenes
    }

    /// Scenes of whichever category holds the active scene.
    pub fn playing_scenes(&self) -> &[SceneId] {
        self.active_scene
            .as_ref()
            .and_then(|scene| self.scenes.category_of(scene))
            .map(|category| self.scenes.get(category))
            .unwrap_or(&[])
    }

    pub fn furniture_preference(&self) -> FurniturePreference {
        self.furniture_preference
    }

    pub fn center(&self) -> &Center {
        &self.center
    }

    pub fn active_scene(&self) -> Option<&SceneId> {
        self.active_scene.as_ref()
    }

    pub fn active_stage(&self) -> Option<&StageId> {
        self.active_stage.as_ref()
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn active_assignment_index(&self) -> usize {
        self.active_assignment
    }

    pub fn current_assignment(&self) -> Option<&Assignment> {
        self.active_scene.as_ref()?;
        self.assignments.get(self.active_assignment)
    }

    /// Actors in slot order of the current assignment, or in creation order
    /// while no scene is active.
    pub fn actors(&self) -> Vec<ObjectRef> {
        match self.current_assignment() {
            Some(assignment) => assignment.clone(),
            None => self.positions.iter().map(|position| position.actor).collect(),
        }
    }

    pub fn slot_of(&self, actor: ObjectRef) -> Option<usize> {
        self.current_assignment()
            .and_then(|assignment| permutation::slot_of(assignment, actor))
    }

    /// Slot requirements of the position `actor` currently fills.
    pub fn position_info<'l>(
        &self,
        library: &'l dyn SceneLibrary,
        actor: ObjectRef,
    ) -> Option<&'l PositionInfo> {
        let slot = self.slot_of(actor)?;
        let scene = library.scene(self.active_scene.as_ref()?)?;
        scene.nth_position(slot)
    }

    pub fn base_coordinates(&self) -> Coordinate {
        self.base_coordinates
    }

    pub fn autoplay(&self) -> bool {
        self.autoplay
    }
}

fn resolve_scene_mapping(
    key: ThreadKey,
    mut scenes: SceneMapping,
    library: &dyn SceneLibrary,
) -> SceneMapping {
    for category in SceneCategory::ALL {
        scenes.get_mut(category).retain(|id| {
            let known = library.scene(id).is_some();
            if !known {
                warn!("thread {key}: dropping unknown {category} scene {id}");
            }
            known
        });
    }
    scenes
}

/// Pick the anchor for a new thread. Without a furniture match the center
/// stays pinned where the first actor stands now.
fn select_center(
    lead: ObjectRef,
    lead_coordinate: Coordinate,
    preference: FurniturePreference,
    candidates: &[&Scene],
    host: &Host<'_>,
    settings: &EngineSettings,
) -> Center {
    let standalone = Center::standalone(lead, lead_coordinate);
    let wants_furniture = match preference {
        FurniturePreference::Disallow => false,
        FurniturePreference::Default => candidates
            .iter()
            .all(|scene| scene.requires_furniture()),
        FurniturePreference::Prefer => true,
    };
    if !wants_furniture {
        return standalone;
    }

    for reference in host
        .world
        .furniture_near(lead, settings.furniture_search_radius)
    {
        let Some(details) = host.library.furniture_details(reference) else {
            continue;
        };
        let Some(anchor) = host.world.reference_coordinate(reference) else {
            continue;
        };
        let kinds: Vec<FurnitureType> = details
            .kinds()
            .filter(|kind| !kind.is_none())
            .filter(|kind| candidates.iter().any(|scene| scene.is_compatible_furniture(*kind)))
            .collect();
        if let Some(offset) = closest_compatible_offset(details, &anchor, &kinds, &lead_coordinate)
        {
            return Center::on_furniture(reference, offset);
        }
    }
    standalone
}
