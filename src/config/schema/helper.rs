use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelperConfig {
    /// Service manager label of the privileged helper
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
    /// Helper binary; defaults to the running executable
    #[serde(default)]
    pub executable_path: Option<PathBuf>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_ping_timeout_ms")]
    pub ping_timeout_ms: u64,
    #[serde(default = "default_pmset_path")]
    pub pmset_path: PathBuf,
    #[serde(default = "default_legacy_paths")]
    pub legacy_paths: Vec<PathBuf>,
    #[serde(default = "default_backup_root")]
    pub backup_root: PathBuf,
    /// Non-root user ids the helper answers; root is always allowed
    #[serde(default)]
    pub allowed_uids: Vec<u32>,
}

fn default_label() -> String {
    "dev.lidwake.helper".into()
}

fn default_socket_path() -> PathBuf {
    PathBuf::from("/var/run/lidwake-helper.sock")
}

fn default_request_timeout_ms() -> u64 {
    8_000
}

fn default_ping_timeout_ms() -> u64 {
    2_000
}

fn default_pmset_path() -> PathBuf {
    PathBuf::from("/usr/bin/pmset")
}

fn default_legacy_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/private/etc/sudoers.d/lidwake_pmset"),
        PathBuf::from("/private/etc/sudoers.d/lidwake_pmset_tmp"),
    ]
}

fn default_backup_root() -> PathBuf {
    PathBuf::from("/Library/Application Support/lidwake/legacy-backup")
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            socket_path: default_socket_path(),
            executable_path: None,
            request_timeout_ms: default_request_timeout_ms(),
            ping_timeout_ms: default_ping_timeout_ms(),
            pmset_path: default_pmset_path(),
            legacy_paths: default_legacy_paths(),
            backup_root: default_backup_root(),
            allowed_uids: Vec::new(),
        }
    }
}

impl HelperConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }
}
