use super::Config;
use std::path::PathBuf;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("LIDWAKE_STATE_DIR")
            && !dir.is_empty()
        {
            self.state_dir = PathBuf::from(dir);
        }

        if let Ok(socket) = std::env::var("LIDWAKE_HELPER_SOCKET")
            && !socket.is_empty()
        {
            self.helper.socket_path = PathBuf::from(socket);
        }

        if let Ok(raw) = std::env::var("LIDWAKE_HELPER_ALLOWED_UIDS")
            && let Ok(uids) = raw
                .split(',')
                .map(|uid| uid.trim().parse::<u32>())
                .collect::<Result<Vec<_>, _>>()
        {
            self.helper.allowed_uids = uids;
        }

        if let Ok(raw) = std::env::var("LIDWAKE_LOCK_ON_LID_CLOSE")
            && let Ok(enabled) = raw.parse::<bool>()
        {
            self.orchestrator.lock_on_lid_close = enabled;
        }
    }
}
