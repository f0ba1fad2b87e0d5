use super::IntentState;

/// Observable keep-awake mode, derived from [`IntentState`] and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Mode {
    #[strum(to_string = "Off")]
    Off,
    #[strum(to_string = "Full Awake")]
    FullAwake,
}

impl Mode {
    /// Both planes must be active; any partial combination collapses to `Off`.
    pub fn derive(state: &IntentState) -> Self {
        if state.local_assertion_active && state.system_policy_active_by_app {
            Self::FullAwake
        } else {
            Self::Off
        }
    }

    pub fn detail(self) -> &'static str {
        match self {
            Self::Off => "Restores normal sleep behavior.",
            Self::FullAwake => "Prevents sleep with the lid open and with the lid closed.",
        }
    }
}
