use super::SetupState;

/// Current awake configuration as owned by the orchestrator.
///
/// Only `launch_at_login_enabled` and `legacy_cleanup_completed` survive a
/// restart. The live flags are re-derived from the collaborators on every
/// process start and never read back from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentState {
    pub local_assertion_active: bool,
    pub system_policy_active_by_app: bool,
    pub launch_at_login_enabled: bool,
    pub setup_state: SetupState,
    pub legacy_cleanup_completed: bool,
    pub transient_error: Option<String>,
}

impl Default for IntentState {
    fn default() -> Self {
        Self {
            local_assertion_active: false,
            system_policy_active_by_app: false,
            launch_at_login_enabled: false,
            setup_state: SetupState::NotRegistered,
            legacy_cleanup_completed: false,
            transient_error: None,
        }
    }
}

impl IntentState {
    /// Rebuild a state from the two durable preferences, with every live flag
    /// forced inactive.
    pub fn from_durable(launch_at_login_enabled: bool, legacy_cleanup_completed: bool) -> Self {
        Self {
            launch_at_login_enabled,
            legacy_cleanup_completed,
            ..Self::default()
        }
    }

    /// Reset everything that must be re-derived after a restart.
    pub fn reset_live_flags(&mut self) {
        self.local_assertion_active = false;
        self.system_policy_active_by_app = false;
        self.setup_state = SetupState::NotRegistered;
        self.transient_error = None;
    }
}
