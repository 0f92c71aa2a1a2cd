//! Configuration loading and management
//!
//! Handles parsing of `.orgsync.toml` configuration files. The merge
//! tuning constants live here so the similarity scoring stays
//! configuration, not incidental hard-coded values.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Org file to pull to / push from when the CLI gives none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_file: Option<PathBuf>,

    /// Task store path; defaults to the platform data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<PathBuf>,

    /// Merge tuning
    #[serde(default)]
    pub merge: MergeConfig,
}

/// Tuning knobs for the matching passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Similarity a fuzzy match must strictly exceed
    #[serde(default = "default_ratio_threshold")]
    pub ratio_threshold: f64,

    /// Weight of the best title-pair similarity
    #[serde(default = "default_title_weight")]
    pub title_weight: f64,

    /// Weight of the note-text similarity
    #[serde(default = "default_notes_weight")]
    pub notes_weight: f64,
}

fn default_ratio_threshold() -> f64 {
    0.85
}

fn default_title_weight() -> f64 {
    0.7
}

fn default_notes_weight() -> f64 {
    0.3
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            ratio_threshold: default_ratio_threshold(),
            title_weight: default_title_weight(),
            notes_weight: default_notes_weight(),
        }
    }
}

impl MergeConfig {
    fn validate(&self) -> Result<()> {
        if !(self.ratio_threshold > 0.0 && self.ratio_threshold <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "merge.ratio_threshold must be in (0, 1], got {}",
                self.ratio_threshold
            )));
        }
        for (name, value) in [
            ("merge.title_weight", self.title_weight),
            ("merge.notes_weight", self.notes_weight),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be in (0, 1), got {value}"
                )));
            }
        }
        if (self.title_weight + self.notes_weight - 1.0).abs() > 1e-9 {
            return Err(Error::InvalidConfig(format!(
                "merge weights must sum to 1, got {}",
                self.title_weight + self.notes_weight
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from an `.orgsync.toml` file
    pub fn load(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory, or return defaults
    pub fn load_from_dir(dir: &std::path::Path) -> Self {
        let config_path = dir.join(".orgsync.toml");
        if config_path.exists() {
            Self::load(&config_path).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &PathBuf) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.merge.validate()
    }

    /// The task store to use: explicit override, configured path, or
    /// the platform data directory.
    pub fn store_path(&self, override_path: Option<&PathBuf>) -> Result<PathBuf> {
        if let Some(path) = override_path {
            return Ok(path.clone());
        }
        if let Some(path) = &self.store {
            return Ok(path.clone());
        }
        default_store_path().ok_or_else(|| {
            Error::InvalidConfig("no store configured and no platform data directory".to_string())
        })
    }
}

/// Platform data-directory location for the task store.
pub fn default_store_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "orgsync")
        .map(|dirs| dirs.data_dir().join("tasks.json"))
}
