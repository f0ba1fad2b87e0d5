use super::restore::LAUNCH_RESTORE_FAILED;
use super::{Core, Orchestrator};
use std::sync::atomic::Ordering;

impl Orchestrator {
    /// Reconcile durable intent with the collaborators. Runs once per process.
    pub async fn bootstrap(&self) {
        if self.inner.bootstrapped.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut core = self.inner.core.lock().await;
        tracing::info!("bootstrapping orchestrator");

        let mut intent = core.prefs.load();
        intent.reset_live_flags();
        core.intent = intent;
        self.persist(&core);

        let local = self.inner.collab.local.as_ref();
        if let Err(error) = local.set_enabled(false) {
            core.intent.local_assertion_active = local.is_enabled();
            self.persist(&core);
            self.set_transient_error(&mut core, format!("Could not restore default sleep: {error}"));
        }

        let login_item = self.inner.collab.login_item.as_ref();
        let wanted = core.intent.launch_at_login_enabled;
        if login_item.read_enabled() != wanted
            && let Err(error) = login_item.set_enabled(wanted)
        {
            self.set_transient_error(
                &mut core,
                format!("Could not apply launch-at-login setting: {error}"),
            );
        }

        // A session surviving a restart always needs restoring, armed or not.
        let restore_needed = core.sessions.has_session();
        if restore_needed {
            core.sessions.mark_pending(None);
        }
        drop(core);

        if restore_needed {
            self.join_restore_retry(LAUNCH_RESTORE_FAILED).await;
        }

        let mut core = self.inner.core.lock().await;
        self.refresh_locked(&mut core).await;
        self.run_legacy_cleanup(&mut core).await;
        self.update_lid_monitoring(&core.intent);
        self.publish(&core);
    }

    async fn run_legacy_cleanup(&self, core: &mut Core) {
        if !core.intent.setup_state.is_ready() || core.intent.legacy_cleanup_completed {
            return;
        }
        match self.inner.collab.policy.cleanup_legacy_artifacts().await {
            Ok(report) => {
                tracing::info!(
                    cleaned = report.cleaned_paths.len(),
                    skipped = report.skipped_paths.len(),
                    backup = %report.backup_directory,
                    "legacy cleanup finished"
                );
                core.intent.legacy_cleanup_completed = true;
                self.persist(core);
            }
            Err(error) => self.set_transient_error(core, format!("Legacy cleanup failed: {error}")),
        }
    }
}
