use super::{remove_if_exists, write_json_atomic};
use crate::domain::{CURRENT_SESSION_SCHEMA_VERSION, OverrideSession};
use chrono::Utc;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const SESSION_FILE: &str = "override_session.json";

#[derive(Deserialize)]
struct SchemaHeader {
    schema_version: u32,
}

/// Versioned on-disk record of the override session.
///
/// Records that cannot be parsed, or whose `schema_version` differs from the
/// current one, are deleted on load instead of being partially trusted.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<OverrideSession> {
        let contents = fs::read_to_string(&self.path).ok()?;

        let version = serde_json::from_str::<SchemaHeader>(&contents)
            .map(|header| header.schema_version)
            .ok();
        if version != Some(CURRENT_SESSION_SCHEMA_VERSION) {
            tracing::warn!(?version, "discarding override session with unknown schema");
            self.discard();
            return None;
        }

        match serde_json::from_str::<OverrideSession>(&contents) {
            Ok(session) => Some(session),
            Err(error) => {
                tracing::warn!(%error, "discarding unreadable override session");
                self.discard();
                None
            }
        }
    }

    /// Persist `session`, or delete the record when `None`.
    pub fn save(&self, session: Option<&OverrideSession>) {
        let result = match session {
            Some(session) => write_json_atomic(&self.path, session),
            None => remove_if_exists(&self.path),
        };
        if let Err(error) = result {
            tracing::warn!(error = %format!("{error:#}"), "failed to persist override session");
        }
    }

    /// Flag the stored record for retry without going through its owner.
    ///
    /// Returns `false` when there is no record to flag.
    pub fn mark_pending(&self, error: &str) -> bool {
        let Some(mut session) = self.load() else {
            return false;
        };
        session.pending_restore = true;
        session.last_restore_error = Some(error.to_string());
        session.last_restore_attempt_at = Some(Utc::now());
        self.save(Some(&session));
        true
    }

    fn discard(&self) {
        if let Err(error) = remove_if_exists(&self.path) {
            tracing::warn!(error = %format!("{error:#}"), "failed to discard override session");
        }
    }
}
