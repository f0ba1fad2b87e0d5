/// Readiness of the privileged helper. Only `Ready` permits system-policy
/// operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupState {
    NotInApplications,
    NotRegistered,
    ApprovalRequired,
    Ready,
    Unavailable(String),
}

impl SetupState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::NotInApplications => "Move lidwake to its install location",
            Self::NotRegistered => "Enable Closed-Lid Control",
            Self::ApprovalRequired => "Approval Required",
            Self::Ready => "Closed-Lid Control Ready",
            Self::Unavailable(_) => "Closed-Lid Control Unavailable",
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Self::NotInApplications => {
                "Install lidwake in its install location to enable privileged closed-lid control."
            }
            Self::NotRegistered => "Run one-time setup to register the privileged helper.",
            Self::ApprovalRequired => "Approve the privileged helper before it can run.",
            Self::Ready => "Closed-lid commands are available.",
            Self::Unavailable(reason) => reason,
        }
    }

    /// Short actionable message shown when Full Awake is blocked on setup.
    pub fn blocked_message(&self) -> String {
        match self {
            Self::Ready => "Ready.".into(),
            Self::ApprovalRequired => "Approve helper in Login Items.".into(),
            Self::NotInApplications => "Move app to its install location.".into(),
            Self::NotRegistered => "Finish one-time setup.".into(),
            Self::Unavailable(detail) => format!("Helper unavailable: {detail}"),
        }
    }
}
