use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::fragment::{ActorFragment, PositionTag, Sex, unit_scale};
use crate::furniture::FurnitureType;
use crate::ids::{RaceKey, SceneId, StageId};
use crate::pack::PackError;

/// Requirements for one position slot of a scene. Empty `sexes`/`races`
/// accept anyone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionInfo {
    #[serde(default)]
    pub sexes: Vec<Sex>,
    #[serde(default)]
    pub races: Vec<RaceKey>,
    #[serde(default)]
    pub tags: BTreeSet<PositionTag>,
    #[serde(default = "unit_scale")]
    pub scale: f32,
}

impl Default for PositionInfo {
    fn default() -> Self {
        Self {
            sexes: Vec::new(),
            races: Vec::new(),
            tags: BTreeSet::new(),
            scale: 1.0,
        }
    }
}

impl PositionInfo {
    pub fn can_fill(&self, fragment: &ActorFragment) -> bool {
        if !self.sexes.is_empty() && !self.sexes.contains(&fragment.sex) {
            return false;
        }
        if !self.races.is_empty() && !self.races.iter().any(|race| race.matches(&fragment.race)) {
            return false;
        }
        // Submission is matched both ways: a submissive actor never fills a
        // dominant slot.
        if self.is_submissive() != fragment.is_submissive() {
            return false;
        }
        self.tags.is_subset(&fragment.tags)
    }

    pub fn is_submissive(&self) -> bool {
        self.tags.contains(&PositionTag::Submissive)
    }

    /// Two slots are interchangeable when any actor fitting one fits the other.
    pub fn is_similar(&self, other: &PositionInfo) -> bool {
        let sexes = |info: &PositionInfo| info.sexes.iter().copied().collect::<BTreeSet<_>>();
        let races = |info: &PositionInfo| {
            info.races
                .iter()
                .map(|race| race.as_str().to_ascii_lowercase())
                .collect::<BTreeSet<_>>()
        };
        sexes(self) == sexes(other) && races(self) == races(other) && self.tags == other.tags
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagePosition {
    pub event: String,
    #[serde(default)]
    pub offset: Coordinate,
    #[serde(default)]
    pub climax: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub positions: Vec<StagePosition>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub fixed_length: Option<f32>,
}

impl Stage {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|value| value.eq_ignore_ascii_case(tag))
    }
}

/// Furniture families a scene can be staged on, plus the scene-wide offset
/// applied on top of the furniture offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneFurniture {
    #[serde(default = "standalone_only")]
    pub allowed: Vec<FurnitureType>,
    #[serde(default)]
    pub offset: Coordinate,
}

impl Default for SceneFurniture {
    fn default() -> Self {
        Self {
            allowed: standalone_only(),
            offset: Coordinate::ORIGIN,
        }
    }
}

fn standalone_only() -> Vec<FurnitureType> {
    vec![FurnitureType::None]
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// Stage is not part of the scene.
    None,
    Default,
    Root,
    Branch,
    Sink,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "enabled")]
    pub enabled: bool,
    pub positions: Vec<PositionInfo>,
    pub stages: Vec<Stage>,
    pub start: StageId,
    #[serde(default)]
    pub graph: BTreeMap<StageId, Vec<StageId>>,
    #[serde(default)]
    pub furniture: SceneFurniture,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Scene {
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn nth_position(&self, n: usize) -> Option<&PositionInfo> {
        self.positions.get(n)
    }

    pub fn stage(&self, id: &StageId) -> Option<&Stage> {
        self.stages.iter().find(|stage| &stage.id == id)
    }

    pub fn start_stage(&self) -> Option<&Stage> {
        self.stage(&self.start)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|value| value.eq_ignore_ascii_case(tag))
    }

    pub fn is_compatible_furniture(&self, kind: FurnitureType) -> bool {
        self.furniture.allowed.contains(&kind)
    }

    pub fn requires_furniture(&self) -> bool {
        !self.is_compatible_furniture(FurnitureType::None)
    }

    pub fn node_type(&self, id: &StageId) -> NodeType {
        if self.stage(id).is_none() {
            return NodeType::None;
        }
        if id == &self.start {
            return NodeType::Root;
        }
        match self.branches(id).len() {
            0 => NodeType::Sink,
            1 => NodeType::Default,
            _ => NodeType::Branch,
        }
    }

    pub fn branches(&self, id: &StageId) -> &[StageId] {
        self.graph.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn branch_to(&self, id: &StageId, n: usize) -> Option<&StageId> {
        self.branches(id).get(n)
    }

    pub fn nth_animation_event(&self, stage: &StageId, n: usize) -> Option<&str> {
        self.stage(stage)
            .and_then(|stage| stage.positions.get(n))
            .map(|position| position.event.as_str())
    }

    pub fn ending_stages(&self) -> Vec<&StageId> {
        self.stages
            .iter()
            .map(|stage| &stage.id)
            .filter(|id| self.branches(id).is_empty())
            .collect()
    }

    pub fn fixed_length_stages(&self) -> Vec<&StageId> {
        self.stages
            .iter()
            .filter(|stage| stage.fixed_length.is_some())
            .map(|stage| &stage.id)
            .collect()
    }

    pub fn fixed_length(&self, id: &StageId) -> Option<f32> {
        self.stage(id).and_then(|stage| stage.fixed_length)
    }

    /// Stages in which position `n` climaxes, or any position when `n` is None.
    pub fn climax_stages(&self, n: Option<usize>) -> Vec<&StageId> {
        self.stages
            .iter()
            .filter(|stage| match n {
                Some(n) => stage.positions.get(n).is_some_and(|p| p.climax),
                None => stage.positions.iter().any(|p| p.climax),
            })
            .map(|stage| &stage.id)
            .collect()
    }

    pub fn climaxing_actors(&self, id: &StageId) -> Vec<usize> {
        self.stage(id)
            .map(|stage| {
                stage
                    .positions
                    .iter()
                    .enumerate()
                    .filter(|(_, position)| position.climax)
                    .map(|(idx, _)| idx)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Shortest path from `from` to any ending stage, inclusive of both ends.
    pub fn path_min(&self, from: &StageId) -> Vec<StageId> {
        if self.stage(from).is_none() {
            return Vec::new();
        }
        let mut parents: BTreeMap<&StageId, &StageId> = BTreeMap::new();
        let mut visited: BTreeSet<&StageId> = BTreeSet::from([from]);
        let mut queue: VecDeque<&StageId> = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            let next = self.branches(current);
            if next.is_empty() {
                let mut path = vec![current.clone()];
                let mut cursor = current;
                while let Some(&parent) = parents.get(cursor) {
                    path.push(parent.clone());
                    cursor = parent;
                }
                path.reverse();
                return path;
            }
            for target in next {
                if visited.insert(target) {
                    parents.insert(target, current);
                    queue.push_back(target);
                }
            }
        }
        // Every reachable stage loops back; there is no ending to reach.
        vec![from.clone()]
    }

    /// Longest loop-free path from `from` to an ending stage.
    pub fn path_max(&self, from: &StageId) -> Vec<StageId> {
        if self.stage(from).is_none() {
            return Vec::new();
        }
        let mut trail = vec![from];
        let mut best: Vec<&StageId> = Vec::new();
        self.walk_longest(&mut trail, &mut best);
        if best.is_empty() {
            return vec![from.clone()];
        }
        best.into_iter().cloned().collect()
    }

    fn walk_longest<'a>(&'a self, trail: &mut Vec<&'a StageId>, best: &mut Vec<&'a StageId>) {
        let Some(current) = trail.last().copied() else {
            return;
        };
        let next = self.branches(current);
        if next.is_empty() {
            if trail.len() > best.len() {
                *best = trail.clone();
            }
            return;
        }
        for target in next {
            if trail.contains(&target) {
                continue;
            }
            trail.push(target);
            self.walk_longest(trail, best);
            trail.pop();
        }
    }

    pub fn validate(&self) -> Result<(), PackError> {
        if self.positions.is_empty() {
            return Err(PackError::NoPositions(self.id.clone()));
        }
        if self.stages.is_empty() {
            return Err(PackError::NoStages(self.id.clone()));
        }
        let mut seen = BTreeSet::new();
        for stage in &self.stages {
            if !seen.insert(&stage.id) {
                return Err(PackError::DuplicateStage {
                    scene: self.id.clone(),
                    stage: stage.id.clone(),
                });
            }
            if stage.positions.len() != self.positions.len() {
                return Err(PackError::StagePositionMismatch {
                    scene: self.id.clone(),
                    stage: stage.id.clone(),
                    expected: self.positions.len(),
                    found: stage.positions.len(),
                });
            }
        }
        if !seen.contains(&self.start) {
            return Err(PackError::UnknownStage {
                scene: self.id.clone(),
                stage: self.start.clone(),
            });
        }
        for (source, targets) in &self.graph {
            for stage in std::iter::once(source).chain(targets.iter()) {
                if !seen.contains(stage) {
                    return Err(PackError::UnknownStage {
                        scene: self.id.clone(),
                        stage: stage.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ObjectRef;

    fn stage(id: &str, climax: &[bool]) -> Stage {
        Stage {
            id: StageId::from(id),
            positions: climax
                .iter()
                .enumerate()
                .map(|(idx, climax)| StagePosition {
                    event: format!("{id}_a{}", idx + 1),
                    offset: Coordinate::ORIGIN,
                    climax: *climax,
                })
                .collect(),
            tags: BTreeSet::new(),
            fixed_length: None,
        }
    }

    /// s1 -> s2 -> {s3, s4}; s3 -> s5; s4 and s5 end.
    fn branching_scene() -> Scene {
        let mut graph = BTreeMap::new();
        graph.insert(StageId::from("s1"), vec![StageId::from("s2")]);
        graph.insert(
            StageId::from("s2"),
            vec![StageId::from("s3"), StageId::from("s4")],
        );
        graph.insert(StageId::from("s3"), vec![StageId::from("s5")]);
        let mut stages = vec![
            stage("s1", &[false, false]),
            stage("s2", &[false, false]),
            stage("s3", &[false, false]),
            stage("s4", &[true, false]),
            stage("s5", &[true, true]),
        ];
        stages[3].fixed_length = Some(4.5);
        Scene {
            id: SceneId::from("branching"),
            name: "Branching".to_string(),
            enabled: true,
            positions: vec![PositionInfo::default(), PositionInfo::default()],
            stages,
            start: StageId::from("s1"),
            graph,
            furniture: SceneFurniture::default(),
            tags: BTreeSet::new(),
        }
    }

    #[test]
    fn classifies_nodes() {
        let scene = branching_scene();
        assert_eq!(
            scene.start_stage().map(|stage| &stage.id),
            Some(&StageId::from("s1"))
        );
        assert_eq!(scene.node_type(&StageId::from("s1")), NodeType::Root);
        assert_eq!(scene.node_type(&StageId::from("s2")), NodeType::Branch);
        assert_eq!(scene.node_type(&StageId::from("s3")), NodeType::Default);
        assert_eq!(scene.node_type(&StageId::from("s4")), NodeType::Sink);
        assert_eq!(scene.node_type(&StageId::from("nope")), NodeType::None);
        assert_eq!(
            scene.branch_to(&StageId::from("s2"), 1),
            Some(&StageId::from("s4"))
        );
    }

    #[test]
    fn finds_shortest_and_longest_paths() {
        let scene = branching_scene();
        let min: Vec<String> = scene
            .path_min(&StageId::from("s1"))
            .into_iter()
            .map(|id| id.0)
            .collect();
        assert_eq!(min, vec!["s1", "s2", "s4"]);
        let max: Vec<String> = scene
            .path_max(&StageId::from("s1"))
            .into_iter()
            .map(|id| id.0)
            .collect();
        assert_eq!(max, vec!["s1", "s2", "s3", "s5"]);
    }

    #[test]
    fn longest_path_survives_cycles() {
        let mut scene = branching_scene();
        scene
            .graph
            .insert(StageId::from("s3"), vec![StageId::from("s1"), StageId::from("s5")]);
        let max = scene.path_max(&StageId::from("s1"));
        assert_eq!(max.len(), 4);
    }

    #[test]
    fn reports_markers() {
        let scene = branching_scene();
        assert_eq!(scene.ending_stages().len(), 2);
        assert_eq!(scene.fixed_length(&StageId::from("s4")), Some(4.5));
        assert_eq!(scene.fixed_length_stages(), vec![&StageId::from("s4")]);
        assert_eq!(scene.climax_stages(Some(1)), vec![&StageId::from("s5")]);
        assert_eq!(scene.climax_stages(None).len(), 2);
        assert_eq!(scene.climaxing_actors(&StageId::from("s5")), vec![0, 1]);
        assert_eq!(
            scene.nth_animation_event(&StageId::from("s2"), 1),
            Some("s2_a2")
        );
    }

    #[test]
    fn validation_rejects_dangling_branches() {
        let mut scene = branching_scene();
        scene
            .graph
            .insert(StageId::from("s4"), vec![StageId::from("missing")]);
        assert!(matches!(
            scene.validate(),
            Err(PackError::UnknownStage { .. })
        ));
    }

    #[test]
    fn validation_rejects_short_stages() {
        let mut scene = branching_scene();
        scene.stages[2].positions.pop();
        assert!(matches!(
            scene.validate(),
            Err(PackError::StagePositionMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn slots_match_sex_race_and_submission() {
        let slot = PositionInfo {
            sexes: vec![Sex::Female],
            races: vec![RaceKey::from("human")],
            tags: BTreeSet::new(),
            scale: 1.0,
        };
        let female = ActorFragment::new(ObjectRef(1), Sex::Female, "Human");
        let male = ActorFragment::new(ObjectRef(2), Sex::Male, "human");
        let wolf = ActorFragment::new(ObjectRef(3), Sex::Female, "wolf");
        assert!(slot.can_fill(&female));
        assert!(!slot.can_fill(&male));
        assert!(!slot.can_fill(&wolf));
        assert!(!slot.can_fill(&female.clone().with_tag(PositionTag::Submissive)));

        let mut victim = PositionInfo::default();
        victim.tags.insert(PositionTag::Submissive);
        assert!(victim.can_fill(&male.clone().with_tag(PositionTag::Submissive)));
        assert!(!victim.can_fill(&male));
        assert!(victim.is_similar(&victim.clone()));
        assert!(!victim.is_similar(&slot));
    }
}
