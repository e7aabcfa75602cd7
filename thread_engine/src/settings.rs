use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

/// Tunables the host can override from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Alpha applied to actors placed in ghost mode.
    pub ghost_alpha: f32,
    /// How far (world units) to look for furniture when an instance is created.
    pub furniture_search_radius: f32,
    /// Hand the scene menu to every newly created instance when it is free.
    pub open_menu_on_create: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ghost_alpha: 0.1,
            furniture_search_radius: 750.0,
            open_menu_on_create: false,
        }
    }
}

impl EngineSettings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let settings: EngineSettings = serde_json::from_str(&text)
            .with_context(|| format!("parsing settings from {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.ghost_alpha),
            "ghost_alpha must be within 0..=1 (got {})",
            self.ghost_alpha
        );
        ensure!(
            self.furniture_search_radius >= 0.0,
            "furniture_search_radius must not be negative (got {})",
            self.furniture_search_radius
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_yields_defaults() {
        let settings = EngineSettings::load(None).expect("defaults load");
        assert_eq!(settings, EngineSettings::default());
    }

    #[test]
    fn partial_files_keep_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "ghost_alpha": 0.35 }"#)?;
        let settings = EngineSettings::load(Some(&path))?;
        assert_eq!(settings.ghost_alpha, 0.35);
        assert_eq!(settings.furniture_search_radius, 750.0);
        Ok(())
    }

    #[test]
    fn rejects_out_of_range_alpha() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "ghost_alpha": 3.0 }"#)?;
        assert!(EngineSettings::load(Some(&path)).is_err());
        Ok(())
    }
}
