//! Timer preferences - user-specific overrides for timer presentation
//!
//! Preferences are stored separately from timer records so a household can
//! share session state while each device keeps its own chime and display
//! settings. Consumed by audio/UI collaborators; the engine's transition
//! logic never reads them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Individual timer preference overrides.
/// All fields are optional - only set fields override the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerPreference {
    /// Override whether the completion chime plays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chime_enabled: Option<bool>,

    /// Override the chime sound file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chime_file: Option<String>,

    /// Drop the finished timer from lists after this many seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_dismiss_secs: Option<u32>,
}

impl TimerPreference {
    /// Check if this preference has any overrides set
    pub fn is_empty(&self) -> bool {
        self.chime_enabled.is_none() && self.chime_file.is_none() && self.auto_dismiss_secs.is_none()
    }
}

/// Collection of timer preferences keyed by timer id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerPreferences {
    /// Timer preferences by key
    #[serde(default)]
    pub timers: HashMap<String, TimerPreference>,
}

impl TimerPreferences {
    /// Create empty preferences
    pub fn new() -> Self {
        Self::default()
    }

    /// Load preferences from a TOML file. A missing file is not an error;
    /// it yields empty preferences.
    pub fn load(path: &Path) -> Result<Self, PreferencesError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| PreferencesError::Io(path.to_path_buf(), e))?;

        toml::from_str(&content).map_err(|e| PreferencesError::Parse(path.to_path_buf(), e))
    }

    /// Save preferences to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), PreferencesError> {
        // Clean up empty preferences before saving
        let cleaned = self.without_empty();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PreferencesError::Io(path.to_path_buf(), e))?;
        }

        let content = toml::to_string_pretty(&cleaned).map_err(PreferencesError::Serialize)?;

        std::fs::write(path, content).map_err(|e| PreferencesError::Io(path.to_path_buf(), e))
    }

    /// Get preference for a timer by key
    pub fn get(&self, key: &str) -> Option<&TimerPreference> {
        self.timers.get(key)
    }

    /// Set preference for a timer. An all-`None` preference removes the
    /// entry instead.
    pub fn set(&mut self, key: String, pref: TimerPreference) {
        if pref.is_empty() {
            self.timers.remove(&key);
        } else {
            self.timers.insert(key, pref);
        }
    }

    /// Update the chime toggle for a timer
    pub fn update_chime_enabled(&mut self, key: &str, enabled: bool) {
        let pref = self.timers.entry(key.to_string()).or_default();
        pref.chime_enabled = Some(enabled);
    }

    /// Whether the chime should play for a timer (defaults to on)
    pub fn chime_enabled(&self, key: &str) -> bool {
        self.get(key).and_then(|p| p.chime_enabled).unwrap_or(true)
    }

    fn without_empty(&self) -> Self {
        Self {
            timers: self
                .timers
                .iter()
                .filter(|(_, pref)| !pref.is_empty())
                .map(|(key, pref)| (key.clone(), pref.clone()))
                .collect(),
        }
    }
}

/// Errors during preference loading/saving
#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("failed to read or write preferences file {0}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse preferences TOML in {0}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("failed to serialize preferences")]
    Serialize(#[source] toml::ser::Error),
}
