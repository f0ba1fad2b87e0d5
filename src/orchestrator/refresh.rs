use super::{Core, Orchestrator};
use crate::util::GenerationToken;
use tokio::task::JoinHandle;

impl Orchestrator {
    /// Re-derive the setup state and the live policy flag.
    ///
    /// Never runs alongside a transition; if one is in flight this is a no-op.
    pub async fn refresh_setup_state(&self) {
        self.retry_pending_restore_if_needed().await;
        self.refresh_once().await;
    }

    async fn refresh_once(&self) {
        if self.is_transitioning() {
            return;
        }
        let mut core = self.inner.core.lock().await;
        if self.is_transitioning() {
            return;
        }
        self.refresh_locked(&mut core).await;
        self.update_lid_monitoring(&core.intent);
        self.publish(&core);
    }

    /// Both planes must agree "off" once the helper stops being ready.
    pub(super) async fn refresh_locked(&self, core: &mut Core) {
        let state = self.inner.collab.setup.refresh_status().await;
        tracing::debug!(?state, "setup state refreshed");
        core.intent.setup_state = state.clone();

        if !state.is_ready() {
            core.intent.system_policy_active_by_app = false;
            if core.intent.local_assertion_active {
                let local = self.inner.collab.local.as_ref();
                match local.set_enabled(false) {
                    Ok(()) => core.intent.local_assertion_active = false,
                    Err(error) => {
                        core.intent.local_assertion_active = local.is_enabled();
                        self.set_transient_error(
                            core,
                            format!(
                                "Could not restore default sleep while helper is unavailable: {error}"
                            ),
                        );
                    }
                }
                if !core.intent.local_assertion_active {
                    tracing::info!("helper unavailable; released local sleep assertion");
                    self.persist(core);
                }
            }
            return;
        }

        match self.inner.collab.policy.read_current_value().await {
            Ok(true) => {}
            Ok(false) => core.intent.system_policy_active_by_app = false,
            Err(error) => {
                core.intent.system_policy_active_by_app = false;
                self.set_transient_error(
                    core,
                    format!("Could not read current sleep policy: {error}"),
                );
            }
        }
    }

    /// Open the approval surface and poll until the helper is ready.
    ///
    /// A newer call supersedes the running poll.
    pub fn open_approval_settings(&self) -> JoinHandle<()> {
        self.inner.collab.setup.open_approval_ui();
        let token = self.inner.approval_generation.begin();
        let this = self.clone();
        tokio::spawn(async move { this.poll_for_approval(token).await })
    }

    async fn poll_for_approval(&self, token: GenerationToken) {
        let attempts = self.inner.config.approval_poll_attempts.max(1);
        let interval = self.inner.config.approval_poll_interval();
        for attempt in 1..=attempts {
            if !token.is_current() {
                tracing::debug!("approval poll superseded");
                return;
            }
            self.refresh_once().await;
            if self.status().intent.setup_state.is_ready() {
                tracing::info!(attempt, "helper approved");
                return;
            }
            tokio::time::sleep(interval).await;
        }
        tracing::info!(attempts, "approval poll gave up");
    }
}
