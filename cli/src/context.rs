//! Shared state for the CLI application.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use sous_core::{TimerEngine, TimerPreferences};

/// Holds all shared state for the CLI application.
/// This is a lightweight container - timer logic lives in the core engine.
#[derive(Clone)]
pub struct CliContext {
    pub engine: TimerEngine,
    /// Session every timer created by this process belongs to
    pub session_id: String,
    /// Actor recorded on start commands
    pub user: String,
    pub preferences: Arc<Mutex<TimerPreferences>>,
    prefs_path: PathBuf,
}

impl CliContext {
    pub fn new(session_id: String, user: String) -> Self {
        let prefs_path = PathBuf::from("sous-prefs.toml");
        let preferences = TimerPreferences::load(&prefs_path).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "could not load preferences, starting empty");
            TimerPreferences::new()
        });

        Self {
            engine: TimerEngine::new(),
            session_id,
            user,
            preferences: Arc::new(Mutex::new(preferences)),
            prefs_path,
        }
    }

    /// Persist current preferences to disk.
    pub fn save_preferences(&self) {
        let prefs = self.preferences.lock().unwrap();
        if let Err(err) = prefs.save(&self.prefs_path) {
            tracing::warn!(error = %err, "could not save preferences");
        }
    }
}
