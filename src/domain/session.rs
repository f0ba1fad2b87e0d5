use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CURRENT_SESSION_SCHEMA_VERSION: u32 = 1;

/// System policy values the orchestrator changes and must put back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagedKey {
    SleepDisabled,
}

/// Pre-existing system policy values, keyed by what they control.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub values: BTreeMap<ManagedKey, bool>,
}

impl Snapshot {
    pub fn sleep_disabled(value: bool) -> Self {
        Self {
            values: BTreeMap::from([(ManagedKey::SleepDisabled, value)]),
        }
    }

    pub fn get(&self, key: ManagedKey) -> Option<bool> {
        self.values.get(&key).copied()
    }
}

/// Durable record of the system policy before this orchestrator changed it.
///
/// Exists exactly while the policy may differ from the captured baseline; it
/// is destroyed only by a restore that completes without error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideSession {
    pub schema_version: u32,
    pub captured_at: DateTime<Utc>,
    pub snapshot: Snapshot,
    #[serde(default)]
    pub pending_restore: bool,
    #[serde(default)]
    pub last_restore_error: Option<String>,
    #[serde(default)]
    pub last_restore_attempt_at: Option<DateTime<Utc>>,
}

impl OverrideSession {
    pub fn new(snapshot: Snapshot, captured_at: DateTime<Utc>) -> Self {
        Self {
            schema_version: CURRENT_SESSION_SCHEMA_VERSION,
            captured_at,
            snapshot,
            pending_restore: false,
            last_restore_error: None,
            last_restore_attempt_at: None,
        }
    }

    pub fn pending_restore_message(&self) -> Option<String> {
        if !self.pending_restore {
            return None;
        }
        Some(match &self.last_restore_error {
            Some(error) => format!("Sleep restore is pending: {error}"),
            None => "Sleep restore is pending and will retry.".into(),
        })
    }
}
