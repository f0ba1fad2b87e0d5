use super::{Core, Orchestrator, Phase, lock};
use crate::domain::SetupState;
use crate::error::{ControlError, TransitionFailure};

impl Orchestrator {
    /// Run a full enable/disable transition and wait for it.
    ///
    /// Returns `false` without doing anything when another transition is
    /// already in flight.
    pub async fn set_enabled(&self, target: bool) -> bool {
        if !self.begin_transition(target) {
            return false;
        }
        self.run_transition(target).await;
        true
    }

    /// Start a transition in the background. The pending target is visible in
    /// [`status`](Self::status) before this returns.
    pub fn request_enable(&self, target: bool) -> bool {
        if !self.begin_transition(target) {
            return false;
        }
        let this = self.clone();
        tokio::spawn(async move { this.run_transition(target).await });
        true
    }

    fn begin_transition(&self, target: bool) -> bool {
        {
            let mut phase = lock(&self.inner.phase);
            if phase.is_transitioning() {
                tracing::debug!(target, current = ?*phase, "transition already in flight; request ignored");
                return false;
            }
            *phase = Phase::Transitioning { target };
        }
        self.publish_phase(Phase::Transitioning { target });
        self.disarm_lid();
        true
    }

    async fn run_transition(&self, target: bool) {
        self.await_restore_retry().await;

        let mut core = self.inner.core.lock().await;
        tracing::info!(target, "full awake transition started");
        if target {
            self.apply_enable(&mut core).await;
        } else {
            self.apply_disable(&mut core).await;
        }

        *lock(&self.inner.phase) = Phase::Idle;
        self.update_lid_monitoring(&core.intent);
        self.publish(&core);
        tracing::info!(
            target,
            local = core.intent.local_assertion_active,
            policy = core.intent.system_policy_active_by_app,
            "full awake transition finished"
        );
    }

    async fn apply_enable(&self, core: &mut Core) {
        let previous_local = core.intent.local_assertion_active;
        let previous_policy = core.intent.system_policy_active_by_app;

        if !core.intent.setup_state.is_ready() {
            let state = self.inner.collab.setup.start_setup().await;
            core.intent.setup_state = state.clone();
            if !state.is_ready() {
                self.open_approval_if_required(&state);
                self.set_transient_error(core, state.blocked_message());
                return;
            }
        }

        let mut captured = false;
        let Err(error) = self.enable_planes(core, &mut captured).await else {
            return;
        };

        let base = match &error {
            ControlError::SetupRequired(state) => {
                core.intent.setup_state = state.clone();
                self.open_approval_if_required(state);
                state.blocked_message()
            }
            other => format!("Could not enable Full Awake: {other}"),
        };
        let rollback_issue = self
            .rollback_failed_enable(core, previous_local, previous_policy, captured)
            .await;
        let failure = TransitionFailure::new(base, rollback_issue);
        if failure.rollback_failed() {
            tracing::error!(%failure, "enable rollback incomplete");
        }
        self.set_transient_error(core, failure.to_string());
        self.persist(core);
    }

    async fn enable_planes(&self, core: &mut Core, captured: &mut bool) -> Result<(), ControlError> {
        let policy = self.inner.collab.policy.as_ref();
        *captured = core.sessions.ensure_captured(policy).await?;

        self.inner.collab.local.set_enabled(true)?;
        core.intent.local_assertion_active = true;

        policy.set_enabled(true).await?;
        core.intent.system_policy_active_by_app = true;

        core.sessions.mark_armed();
        self.persist(core);
        Ok(())
    }

    /// Revert the system policy first, then the local assertion.
    async fn rollback_failed_enable(
        &self,
        core: &mut Core,
        previous_local: bool,
        previous_policy: bool,
        captured: bool,
    ) -> Option<String> {
        let policy = self.inner.collab.policy.as_ref();
        let mut issues = Vec::new();

        if captured {
            if let Err(error) = core.sessions.restore(policy, false).await {
                issues.push(format!("Could not restore baseline sleep settings: {error}"));
            }
        } else if core.intent.system_policy_active_by_app != previous_policy
            && let Err(error) = policy.set_enabled(previous_policy).await
        {
            issues.push(format!(
                "Closed-lid awake may be inconsistent because rollback failed: {error}"
            ));
        }
        core.intent.system_policy_active_by_app = previous_policy;

        issues.extend(self.rollback_local(core, previous_local));
        (!issues.is_empty()).then(|| issues.join(" "))
    }

    async fn apply_disable(&self, core: &mut Core) {
        let previous_local = core.intent.local_assertion_active;
        let previous_policy = core.intent.system_policy_active_by_app;

        let local_issue = match self.inner.collab.local.set_enabled(false) {
            Ok(()) => {
                core.intent.local_assertion_active = false;
                None
            }
            Err(error) => {
                core.intent.local_assertion_active = self.inner.collab.local.is_enabled();
                Some(format!("Could not disable open-lid awake: {error}"))
            }
        };

        let policy = self.inner.collab.policy.as_ref();
        let result = if core.sessions.has_session() {
            core.sessions.restore(policy, true).await
        } else {
            policy.set_enabled(false).await
        };

        match result {
            Ok(()) => {
                core.intent.system_policy_active_by_app = false;
                self.persist(core);
                if let Some(issue) = local_issue {
                    self.set_transient_error(core, issue);
                }
            }
            Err(error) => {
                let base = match &error {
                    ControlError::SetupRequired(state) => {
                        core.intent.setup_state = state.clone();
                        format!(
                            "Could not restore previous sleep settings: {}",
                            state.blocked_message()
                        )
                    }
                    other => format!("Could not restore previous sleep settings: {other}"),
                };
                let mut issues: Vec<String> = local_issue.into_iter().collect();
                issues.extend(
                    self.rollback_failed_disable(core, previous_local, previous_policy)
                        .await,
                );
                let failure =
                    TransitionFailure::new(base, (!issues.is_empty()).then(|| issues.join(" ")));
                self.set_transient_error(core, failure.to_string());
                self.persist(core);
            }
        }
    }

    /// Put both planes back to where they were, keeping the policy flag on.
    async fn rollback_failed_disable(
        &self,
        core: &mut Core,
        previous_local: bool,
        previous_policy: bool,
    ) -> Option<String> {
        let mut issues = Vec::new();
        issues.extend(self.rollback_local(core, previous_local));

        if previous_policy
            && let Err(error) = self.inner.collab.policy.set_enabled(true).await
        {
            issues.push(format!(
                "Closed-lid awake may be inconsistent because rollback failed: {error}"
            ));
        }
        core.intent.system_policy_active_by_app = previous_policy;
        (!issues.is_empty()).then(|| issues.join(" "))
    }

    /// The collaborator's read-back, not the requested value, becomes the truth.
    pub(super) fn rollback_local(&self, core: &mut Core, previous: bool) -> Option<String> {
        let local = self.inner.collab.local.as_ref();
        match local.set_enabled(previous) {
            Ok(()) => {
                core.intent.local_assertion_active = previous;
                None
            }
            Err(error) => {
                let observed = local.is_enabled();
                core.intent.local_assertion_active = observed;
                (observed != previous).then(|| {
                    format!("Open-lid awake may still be active because rollback failed: {error}")
                })
            }
        }
    }

    fn open_approval_if_required(&self, state: &SetupState) {
        if *state == SetupState::ApprovalRequired {
            self.inner.collab.setup.open_approval_ui();
        }
    }
}
