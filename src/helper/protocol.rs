use serde::{Deserialize, Serialize};

/// One request per connection, encoded as a single JSON line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum HelperRequest {
    Ping,
    SetPolicy { sleep_disabled: bool },
    ReadPolicy,
    CleanupLegacyArtifacts,
}

impl HelperRequest {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::SetPolicy { .. } => "set_policy",
            Self::ReadPolicy => "read_policy",
            Self::CleanupLegacyArtifacts => "cleanup_legacy_artifacts",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HelperResponse {
    Ok,
    Value { sleep_disabled: bool },
    Cleanup { report: CleanupReport },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CleanupReport {
    pub cleaned_paths: Vec<String>,
    pub skipped_paths: Vec<String>,
    pub backup_directory: String,
}
