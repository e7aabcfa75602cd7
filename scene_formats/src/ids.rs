use std::fmt;

use serde::{Deserialize, Serialize};

/// Handle to an object owned by the host world (actor, furniture, marker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectRef(pub u32);

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a scene inside a scene pack.
    SceneId
);
string_id!(
    /// Identifier of a stage, unique within its scene.
    StageId
);
string_id!(
    /// Entry in the expression catalogue.
    ExpressionId
);
string_id!(
    /// Entry in the voice catalogue.
    VoiceId
);
string_id!(
    /// Race classification key ("human", "wolf", ...). Compared case-insensitively.
    RaceKey
);

impl RaceKey {
    pub fn matches(&self, other: &RaceKey) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_refs_render_as_form_ids() {
        assert_eq!(ObjectRef(0x14).to_string(), "00000014");
        assert_eq!(ObjectRef(0xABCDEF01).to_string(), "ABCDEF01");
    }

    #[test]
    fn race_keys_ignore_case() {
        assert!(RaceKey::from("Human").matches(&RaceKey::from("human")));
        assert!(!RaceKey::from("wolf").matches(&RaceKey::from("human")));
    }
}
