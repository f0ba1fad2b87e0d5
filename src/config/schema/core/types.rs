use super::super::{HelperConfig, LidConfig, OrchestratorConfig, SetupConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Directory holding the durable preference and override-session records
    #[serde(skip)]
    pub state_dir: PathBuf,

    #[serde(default)]
    pub setup: SetupConfig,

    #[serde(default)]
    pub helper: HelperConfig,

    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    #[serde(default)]
    pub lid: LidConfig,
}
