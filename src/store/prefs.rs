use super::write_json_atomic;
use crate::domain::IntentState;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const PREFS_FILE: &str = "prefs.json";

/// The only parts of [`IntentState`] that survive a restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub launch_at_login_enabled: bool,
    #[serde(default)]
    pub legacy_cleanup_completed: bool,
}

pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(PREFS_FILE),
        }
    }

    /// Load preferences into a fresh state whose live flags are all inactive.
    pub fn load(&self) -> IntentState {
        let prefs = self.load_preferences();
        IntentState::from_durable(prefs.launch_at_login_enabled, prefs.legacy_cleanup_completed)
    }

    pub fn load_preferences(&self) -> Preferences {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return Preferences::default();
        };
        serde_json::from_str(&contents).unwrap_or_else(|error| {
            tracing::warn!(%error, path = %self.path.display(), "ignoring unreadable preferences");
            Preferences::default()
        })
    }

    /// Persist the durable subset of `state`. Failures are logged, not raised.
    pub fn save(&self, state: &IntentState) {
        let prefs = Preferences {
            launch_at_login_enabled: state.launch_at_login_enabled,
            legacy_cleanup_completed: state.legacy_cleanup_completed,
        };
        if let Err(error) = write_json_atomic(&self.path, &prefs) {
            tracing::warn!(error = %format!("{error:#}"), "failed to persist preferences");
        }
    }
}
