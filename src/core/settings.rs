//! User preferences
//!
//! Persisted as TOML in the platform config directory.

use crate::window::accent::AccentMode;
use crate::window::theme::ThemeName;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Assign accent colours from the fixed palette by registration order
    #[serde(default)]
    pub sorted_colors: bool,

    /// Colour theme
    #[serde(default)]
    pub theme: ThemeName,
}

impl Settings {
    /// Load settings from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse settings file: {:?}", path))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, content).with_context(|| format!("Failed to write settings file: {:?}", path))?;

        Ok(())
    }

    /// Get the settings file path
    pub fn settings_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "runz", "runz").context("Failed to determine settings directory")?;
        Ok(proj_dirs.config_dir().join("settings.toml"))
    }

    pub fn accent_mode(&self) -> AccentMode {
        AccentMode::from_sorted(self.sorted_colors)
    }
}
