use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Retry and repair budget for reaching a ready privileged helper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupConfig {
    /// Pings tried against an enabled-but-unreachable helper before repairing.
    #[serde(default = "default_soft_retry_attempts")]
    pub soft_retry_attempts: u32,
    #[serde(default = "default_soft_retry_interval_ms")]
    pub soft_retry_interval_ms: u64,
    /// Pings tried after a fresh registration.
    #[serde(default = "default_post_register_attempts")]
    pub post_register_attempts: u32,
    /// Pings tried after the unregister/register repair pass.
    #[serde(default = "default_post_repair_attempts")]
    pub post_repair_attempts: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_repair_cooldown_secs")]
    pub repair_cooldown_secs: u64,
    /// When set, setup refuses to run unless the executable lives under it.
    #[serde(default)]
    pub required_install_prefix: Option<PathBuf>,
}

fn default_soft_retry_attempts() -> u32 {
    5
}

fn default_soft_retry_interval_ms() -> u64 {
    500
}

fn default_post_register_attempts() -> u32 {
    10
}

fn default_post_repair_attempts() -> u32 {
    10
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_repair_cooldown_secs() -> u64 {
    60
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            soft_retry_attempts: default_soft_retry_attempts(),
            soft_retry_interval_ms: default_soft_retry_interval_ms(),
            post_register_attempts: default_post_register_attempts(),
            post_repair_attempts: default_post_repair_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
            repair_cooldown_secs: default_repair_cooldown_secs(),
            required_install_prefix: None,
        }
    }
}

impl SetupConfig {
    pub fn soft_retry_interval(&self) -> Duration {
        Duration::from_millis(self.soft_retry_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn repair_cooldown(&self) -> Duration {
        Duration::from_secs(self.repair_cooldown_secs)
    }
}
