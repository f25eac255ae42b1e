// Studio configuration at `~/.storyloom/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use storyloom_common::render::RenderEngine;

use crate::autosave::{AutosaveConfig, DEFAULT_QUIET_PERIOD_MS};
use crate::session::EntitySort;

/// Root directory for Storyloom global state: `~/.storyloom/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".storyloom"))
}

/// Path to the global config file: `~/.storyloom/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

/// Stories root used when none is configured: `~/.storyloom/stories`, or
/// `./stories` without a home directory.
pub fn default_stories_root() -> PathBuf {
    global_dir().map(|d| d.join("stories")).unwrap_or_else(|| PathBuf::from("stories"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct StudioConfig {
    /// Directory holding one subdirectory per story.
    pub stories_root: Option<PathBuf>,
    pub autosave: AutosaveSettings,
    pub render: RenderSettings,
    pub entities: EntitySettings,
}

impl StudioConfig {
    /// Load from `~/.storyloom/config.toml`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load() -> Self {
        global_config_path().and_then(|p| Self::load_from(&p).ok()).unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = global_config_path().ok_or_else(|| {
            ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine home directory",
            ))
        })?;
        self.save_to(&path)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    pub fn stories_root(&self) -> PathBuf {
        self.stories_root.clone().unwrap_or_else(default_stories_root)
    }

    pub fn autosave_config(&self) -> AutosaveConfig {
        AutosaveConfig::with_millis(self.autosave.quiet_period_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AutosaveSettings {
    /// Quiet period before a pending edit is saved, clamped to 50–10000.
    pub quiet_period_ms: u64,
}

impl Default for AutosaveSettings {
    fn default() -> Self {
        Self { quiet_period_ms: DEFAULT_QUIET_PERIOD_MS }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RenderSettings {
    pub engine: RenderEngine,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EntitySettings {
    pub sort: EntitySort,
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config I/O error: {e}"),
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Serialize(e) => write!(f, "config serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
