use super::{Orchestrator, RestoreRetry, lock};
use crate::capabilities::BoxFuture;
use futures_util::FutureExt;
use tokio::time::{Instant, timeout_at};

const SHUTDOWN_RESTORE_TIMEOUT: &str = "Restore did not finish before shutdown.";
const RESTORE_FAILED: &str = "Could not restore previous sleep settings";
pub(super) const LAUNCH_RESTORE_FAILED: &str = "Could not restore previous sleep settings on launch";

impl Orchestrator {
    /// Retry a pending restore, joining the attempt already in flight if any.
    ///
    /// Skipped while a transition runs; the transition itself awaits any
    /// in-flight retry before touching state.
    pub async fn retry_pending_restore_if_needed(&self) {
        if self.is_transitioning() {
            return;
        }
        self.join_restore_retry(RESTORE_FAILED).await;
    }

    /// Start the shared retry, or wait for the one already running.
    ///
    /// `failure_context` prefixes the surfaced error when this call starts
    /// the attempt.
    pub(super) async fn join_restore_retry(&self, failure_context: &'static str) {
        let retry = {
            let mut slot = lock(&self.inner.restore_retry);
            if let Some(in_flight) = slot.as_ref() {
                in_flight.clone()
            } else {
                let this = self.clone();
                let attempt: BoxFuture<'static, ()> =
                    Box::pin(async move { this.run_restore_retry(failure_context).await });
                let shared: RestoreRetry = attempt.shared();
                *slot = Some(shared.clone());
                shared
            }
        };
        retry.await;
    }

    pub(super) async fn await_restore_retry(&self) {
        let in_flight = lock(&self.inner.restore_retry).clone();
        if let Some(retry) = in_flight {
            retry.await;
        }
    }

    async fn run_restore_retry(&self, failure_context: &'static str) {
        {
            let mut core = self.inner.core.lock().await;
            if core.sessions.pending_restore() {
                tracing::info!("retrying pending sleep restore");
                let policy = self.inner.collab.policy.as_ref();
                match core.sessions.restore(policy, true).await {
                    Ok(()) => {
                        core.intent.system_policy_active_by_app = false;
                        if core.intent.local_assertion_active
                            && let Some(issue) = self.rollback_local(&mut core, false)
                        {
                            self.set_transient_error(&mut core, issue);
                        }
                        self.persist(&core);
                    }
                    Err(error) => self.set_transient_error(
                        &mut core,
                        format!("{failure_context}: {error}"),
                    ),
                }
                self.update_lid_monitoring(&core.intent);
                self.publish(&core);
            }
        }
        *lock(&self.inner.restore_retry) = None;
    }

    /// Best-effort shutdown of both planes within the configured deadline.
    ///
    /// A restore that cannot finish in time leaves the session flagged
    /// pending so the next launch retries it.
    pub async fn prepare_for_termination(&self) {
        self.inner.approval_generation.invalidate();
        self.disarm_lid();

        let deadline = Instant::now() + self.inner.config.termination_deadline();
        let Ok(mut core) = timeout_at(deadline, self.inner.core.lock()).await else {
            tracing::warn!("shutdown deadline passed while a transition was still running");
            if self.inner.session_record.mark_pending(SHUTDOWN_RESTORE_TIMEOUT) {
                tracing::warn!("override session left pending for the next launch");
            }
            return;
        };

        let local = self.inner.collab.local.as_ref();
        core.intent.local_assertion_active = match local.set_enabled(false) {
            Ok(()) => false,
            Err(error) => {
                tracing::warn!(%error, "could not release local sleep assertion on shutdown");
                local.is_enabled()
            }
        };

        let policy = self.inner.collab.policy.as_ref();
        if core.sessions.has_session() {
            match timeout_at(deadline, core.sessions.restore(policy, true)).await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => tracing::warn!(%error, "restore on shutdown failed; will retry at next launch"),
                Err(_) => {
                    tracing::warn!("restore on shutdown timed out; will retry at next launch");
                    core.sessions.mark_pending(Some(SHUTDOWN_RESTORE_TIMEOUT.into()));
                }
            }
            core.intent.system_policy_active_by_app = false;
        } else if core.intent.system_policy_active_by_app {
            match timeout_at(deadline, policy.set_enabled(false)).await {
                Ok(Ok(())) => core.intent.system_policy_active_by_app = false,
                Ok(Err(error)) => self.set_transient_error(
                    &mut core,
                    format!("Could not restore previous sleep settings during quit: {error}"),
                ),
                Err(_) => self.set_transient_error(
                    &mut core,
                    format!(
                        "Could not restore previous sleep settings during quit: timed out after {}ms.",
                        self.inner.config.termination_deadline_ms
                    ),
                ),
            }
        }

        self.persist(&core);
        self.publish(&core);
        tracing::info!("prepared for termination");
    }
}
