use crate::domain::SetupState;
use std::fmt;
use thiserror::Error;

// ─── Privileged helper IPC errors ────────────────────────────────────────────

/// Failures of a single request to the privileged helper.
///
/// The transport never retries on its own; callers decide whether a timeout
/// or an unreachable helper warrants another attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HelperError {
    #[error("Privileged helper did not respond to {operation} in time.")]
    Timeout { operation: &'static str },

    #[error("Could not connect to the privileged helper service: {0}")]
    Unreachable(String),

    #[error("{0}")]
    Rejected(String),

    #[error("Privileged helper returned an invalid response: {0}")]
    InvalidResponse(String),
}

// ─── Capability errors ───────────────────────────────────────────────────────

/// Errors raised by the capability collaborators the orchestrator drives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// The helper is not ready; the payload tells the UI which action to offer.
    #[error("{}", .0.detail())]
    SetupRequired(SetupState),

    #[error(transparent)]
    Helper(#[from] HelperError),

    #[error("local sleep assertion failed: {0}")]
    LocalAssertion(String),

    #[error("helper registration failed: {0}")]
    Registration(String),

    #[error("login item update failed: {0}")]
    LoginItem(String),

    #[error("lid monitoring failed: {0}")]
    LidMonitor(String),

    #[error("screen lock failed: {0}")]
    ScreenLock(String),
}

// ─── Transition failures ─────────────────────────────────────────────────────

/// A failed enable/disable attempt, optionally compounded by a failed rollback.
///
/// The rendered message never drops either fact: the base failure comes
/// first, followed by whatever the rollback could not undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionFailure {
    pub base: String,
    pub rollback_issue: Option<String>,
}

impl TransitionFailure {
    pub fn new(base: impl Into<String>, rollback_issue: Option<String>) -> Self {
        Self {
            base: base.into(),
            rollback_issue,
        }
    }

    pub fn rollback_failed(&self) -> bool {
        self.rollback_issue.is_some()
    }
}

impl fmt::Display for TransitionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rollback_issue {
            Some(issue) => write!(f, "{} {}", self.base, issue),
            None => f.write_str(&self.base),
        }
    }
}

impl std::error::Error for TransitionFailure {}
