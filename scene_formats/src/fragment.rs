use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{ObjectRef, RaceKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    Futa,
    CreatureMale,
    CreatureFemale,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::Futa => "futa",
            Sex::CreatureMale => "creature_male",
            Sex::CreatureFemale => "creature_female",
        };
        f.pad(label)
    }
}

/// Actor traits a position slot may demand beyond sex and race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionTag {
    Submissive,
    Vampire,
    Unconscious,
    Dead,
}

/// Snapshot of the actor traits that matter to slot matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorFragment {
    pub actor: ObjectRef,
    pub sex: Sex,
    pub race: RaceKey,
    #[serde(default = "unit_scale")]
    pub scale: f32,
    #[serde(default)]
    pub tags: BTreeSet<PositionTag>,
}

impl ActorFragment {
    pub fn new(actor: ObjectRef, sex: Sex, race: impl Into<RaceKey>) -> Self {
        Self {
            actor,
            sex,
            race: race.into(),
            scale: 1.0,
            tags: BTreeSet::new(),
        }
    }

    pub fn with_tag(mut self, tag: PositionTag) -> Self {
        self.tags.insert(tag);
        self
    }

    pub fn is_submissive(&self) -> bool {
        self.tags.contains(&PositionTag::Submissive)
    }
}

pub(crate) fn unit_scale() -> f32 {
    1.0
}

impl From<String> for RaceKey {
    fn from(value: String) -> Self {
        RaceKey(value)
    }
}
