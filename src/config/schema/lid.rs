use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LidConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Directory containing one `*/state` file per lid switch
    #[serde(default = "default_lid_state_dir")]
    pub lid_state_dir: PathBuf,
    /// Lock commands tried in order; the first executable one that exits 0 wins
    #[serde(default = "default_lock_commands")]
    pub lock_commands: Vec<Vec<String>>,
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_lid_state_dir() -> PathBuf {
    PathBuf::from("/proc/acpi/button/lid")
}

fn default_lock_commands() -> Vec<Vec<String>> {
    let commands: &[&[&str]] = if cfg!(target_os = "macos") {
        &[
            &[
                "/System/Library/CoreServices/Menu Extras/User.menu/Contents/Resources/CGSession",
                "-suspend",
            ],
            &["/System/Library/CoreServices/CGSession", "-suspend"],
            &[
                "/System/Library/CoreServices/ScreenSaverEngine.app/Contents/MacOS/ScreenSaverEngine",
            ],
        ]
    } else {
        &[
            &["/usr/bin/loginctl", "lock-session"],
            &["/usr/bin/xdg-screensaver", "lock"],
        ]
    };
    commands
        .iter()
        .map(|argv| argv.iter().map(|s| (*s).to_string()).collect())
        .collect()
}

impl Default for LidConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            lid_state_dir: default_lid_state_dir(),
            lock_commands: default_lock_commands(),
        }
    }
}

impl LidConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(50))
    }
}
