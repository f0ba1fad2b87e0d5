use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// How long a transient error stays visible unless superseded
    #[serde(default = "default_error_display_secs")]
    pub error_display_secs: u64,
    #[serde(default = "default_approval_poll_attempts")]
    pub approval_poll_attempts: u32,
    #[serde(default = "default_approval_poll_interval_ms")]
    pub approval_poll_interval_ms: u64,
    /// Upper bound on restoring sleep settings while quitting
    #[serde(default = "default_termination_deadline_ms")]
    pub termination_deadline_ms: u64,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default)]
    pub lock_on_lid_close: bool,
}

fn default_error_display_secs() -> u64 {
    6
}

fn default_approval_poll_attempts() -> u32 {
    30
}

fn default_approval_poll_interval_ms() -> u64 {
    1_000
}

fn default_termination_deadline_ms() -> u64 {
    5_000
}

fn default_refresh_interval_secs() -> u64 {
    30
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            error_display_secs: default_error_display_secs(),
            approval_poll_attempts: default_approval_poll_attempts(),
            approval_poll_interval_ms: default_approval_poll_interval_ms(),
            termination_deadline_ms: default_termination_deadline_ms(),
            refresh_interval_secs: default_refresh_interval_secs(),
            lock_on_lid_close: false,
        }
    }
}

impl OrchestratorConfig {
    pub fn error_display(&self) -> Duration {
        Duration::from_secs(self.error_display_secs)
    }

    pub fn approval_poll_interval(&self) -> Duration {
        Duration::from_millis(self.approval_poll_interval_ms)
    }

    pub fn termination_deadline(&self) -> Duration {
        Duration::from_millis(self.termination_deadline_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}
