use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

use crate::furniture::FurnitureDefinition;
use crate::ids::{ExpressionId, ObjectRef, SceneId, StageId, VoiceId};
use crate::scene::Scene;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackError {
    #[error("scene {0} is defined more than once")]
    DuplicateScene(SceneId),
    #[error("scene {0} has no positions")]
    NoPositions(SceneId),
    #[error("scene {0} has no stages")]
    NoStages(SceneId),
    #[error("scene {scene} defines stage {stage} more than once")]
    DuplicateStage { scene: SceneId, stage: StageId },
    #[error("scene {scene} references unknown stage {stage}")]
    UnknownStage { scene: SceneId, stage: StageId },
    #[error("stage {scene}/{stage} has {found} positions, expected {expected}")]
    StagePositionMismatch {
        scene: SceneId,
        stage: StageId,
        expected: usize,
        found: usize,
    },
    #[error("furniture reference {0} is defined more than once")]
    DuplicateFurniture(ObjectRef),
}

/// Scene content bundle: scene definitions, classified furniture and the
/// expression/voice catalogue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenePack {
    pub scenes: Vec<Scene>,
    pub furniture: Vec<FurnitureDefinition>,
    pub expressions: Vec<ExpressionId>,
    pub voices: Vec<VoiceId>,
}

impl ScenePack {
    pub fn parse(input: &[u8]) -> Result<Self> {
        let pack: ScenePack = serde_json::from_slice(input).context("decoding scene pack JSON")?;
        pack.validate()?;
        Ok(pack)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&bytes).with_context(|| format!("loading scene pack {}", path.display()))
    }

    /// Load a single pack file, or merge every `*.json` pack below a directory.
    pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::load_dir(path)
        } else {
            Self::load(path)
        }
    }

    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files: Vec<_> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("skipping unreadable pack entry: {err}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("json"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        if files.is_empty() {
            bail!("no scene packs found in {}", dir.display());
        }

        let mut merged = ScenePack::default();
        for path in files {
            debug!("loading scene pack {}", path.display());
            let pack = Self::load(&path)?;
            merged
                .merge(pack)
                .with_context(|| format!("merging {}", path.display()))?;
        }
        Ok(merged)
    }

    pub fn merge(&mut self, other: ScenePack) -> Result<(), PackError> {
        let known: BTreeSet<&SceneId> = self.scenes.iter().map(|scene| &scene.id).collect();
        if let Some(dup) = other.scenes.iter().find(|scene| known.contains(&scene.id)) {
            return Err(PackError::DuplicateScene(dup.id.clone()));
        }
        let refs: BTreeSet<ObjectRef> = self.furniture.iter().map(|def| def.reference).collect();
        if let Some(dup) = other.furniture.iter().find(|def| refs.contains(&def.reference)) {
            return Err(PackError::DuplicateFurniture(dup.reference));
        }
        self.scenes.extend(other.scenes);
        self.furniture.extend(other.furniture);
        for expression in other.expressions {
            if !self.expressions.contains(&expression) {
                self.expressions.push(expression);
            }
        }
        for voice in other.voices {
            if !self.voices.contains(&voice) {
                self.voices.push(voice);
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), PackError> {
        let mut ids = BTreeSet::new();
        for scene in &self.scenes {
            if !ids.insert(&scene.id) {
                return Err(PackError::DuplicateScene(scene.id.clone()));
            }
            scene.validate()?;
        }
        let mut refs = BTreeSet::new();
        for def in &self.furniture {
            if !refs.insert(def.reference) {
                return Err(PackError::DuplicateFurniture(def.reference));
            }
        }
        Ok(())
    }

    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|scene| scene.id.as_str() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PACK: &str = r#"{
        "scenes": [
            {
                "id": "duo_standing",
                "name": "Standing Duo",
                "positions": [{ "sexes": ["female"] }, {}],
                "start": "a",
                "graph": { "a": ["b"] },
                "stages": [
                    { "id": "a", "positions": [{ "event": "a1" }, { "event": "a2" }] },
                    { "id": "b", "positions": [{ "event": "b1" }, { "event": "b2", "climax": true }] }
                ]
            }
        ],
        "furniture": [
            {
                "reference": 4096,
                "details": [{ "kind": "bed_double", "offsets": [{ "location": [0, 0, 40] }] }]
            }
        ],
        "expressions": ["happy"],
        "voices": ["breathy"]
    }"#;

    #[test]
    fn parses_pack() {
        let pack = ScenePack::parse(PACK.as_bytes()).expect("pack parses");
        let scene = pack.scene("duo_standing").expect("scene present");
        assert_eq!(scene.position_count(), 2);
        assert!(scene.enabled);
        assert!(!scene.requires_furniture());
        assert_eq!(pack.furniture[0].reference, ObjectRef(4096));
        assert_eq!(pack.expressions, vec![ExpressionId::from("happy")]);
    }

    #[test]
    fn merge_rejects_duplicate_scenes() {
        let mut pack = ScenePack::parse(PACK.as_bytes()).expect("pack parses");
        let again = ScenePack::parse(PACK.as_bytes()).expect("pack parses");
        assert_eq!(
            pack.merge(again),
            Err(PackError::DuplicateScene(SceneId::from("duo_standing")))
        );
    }

    #[test]
    fn loads_directory_of_packs() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut file = fs::File::create(dir.path().join("base.json"))?;
        file.write_all(PACK.as_bytes())?;
        fs::write(
            dir.path().join("extra.json"),
            r#"{ "expressions": ["happy", "sad"] }"#,
        )?;
        fs::write(dir.path().join("notes.txt"), "ignored")?;

        let pack = ScenePack::load_path(dir.path())?;
        assert_eq!(pack.scenes.len(), 1);
        assert_eq!(pack.expressions.len(), 2);
        Ok(())
    }

    #[test]
    fn rejects_invalid_graphs() {
        let broken = PACK.replace(r#""graph": { "a": ["b"] }"#, r#""graph": { "a": ["z"] }"#);
        let err = ScenePack::parse(broken.as_bytes()).expect_err("dangling branch rejected");
        assert_eq!(
            err.to_string(),
            "scene duo_standing references unknown stage z"
        );
    }
}
