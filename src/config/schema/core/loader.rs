use super::Config;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::Path;

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let mut config = Self::load_or_init_in(&home.join(".lidwake"))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load `config.toml` from `dir`, writing defaults when it does not exist.
    pub fn load_or_init_in(dir: &Path) -> Result<Self> {
        let config_path = dir.join("config.toml");
        let state_dir = dir.join("state");

        if !dir.exists() {
            fs::create_dir_all(dir).context("Failed to create .lidwake directory")?;
        }
        fs::create_dir_all(&state_dir).context("Failed to create state directory")?;

        if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path;
            config.state_dir = state_dir;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self {
                config_path,
                state_dir,
                ..Self::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.helper.label.trim().is_empty() {
            anyhow::bail!("helper.label must not be empty");
        }
        if self.helper.request_timeout_ms == 0 || self.helper.ping_timeout_ms == 0 {
            anyhow::bail!("helper timeouts must be greater than zero");
        }
        Ok(())
    }
}
