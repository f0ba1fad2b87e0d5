//! Crash-safe record of the system policy's value before it was overridden.

use crate::capabilities::SystemPolicyControl;
use crate::domain::OverrideSession;
use crate::error::ControlError;
use crate::store::SessionStore;
use chrono::Utc;

/// Owns the in-memory override session and its durable record.
///
/// Every change is written through to the [`SessionStore`] before the next
/// suspension point, so a crash at any await leaves a record that still
/// names the baseline to restore.
pub struct OverrideSessionManager {
    store: SessionStore,
    current: Option<OverrideSession>,
}

impl OverrideSessionManager {
    pub fn load(store: SessionStore) -> Self {
        let current = store.load();
        if let Some(session) = &current {
            tracing::info!(
                pending_restore = session.pending_restore,
                captured_at = %session.captured_at,
                "found override session from a previous run"
            );
        }
        Self { store, current }
    }

    pub fn current(&self) -> Option<&OverrideSession> {
        self.current.as_ref()
    }

    pub fn has_session(&self) -> bool {
        self.current.is_some()
    }

    pub fn pending_restore(&self) -> bool {
        self.current.as_ref().is_some_and(|s| s.pending_restore)
    }

    pub fn pending_restore_message(&self) -> Option<String> {
        self.current
            .as_ref()
            .and_then(OverrideSession::pending_restore_message)
    }

    /// Capture a baseline unless a session already exists.
    ///
    /// Returns `true` when this call created the session.
    pub async fn ensure_captured(
        &mut self,
        policy: &dyn SystemPolicyControl,
    ) -> Result<bool, ControlError> {
        if self.current.is_some() {
            return Ok(false);
        }
        let snapshot = policy.capture_baseline().await?;
        tracing::info!(?snapshot, "captured system policy baseline");
        self.current = Some(OverrideSession::new(snapshot, Utc::now()));
        self.persist();
        Ok(true)
    }

    /// The override is actively managed again; stale restore failures no longer apply.
    pub fn mark_armed(&mut self) {
        if let Some(session) = self.current.as_mut() {
            session.pending_restore = false;
            session.last_restore_error = None;
            self.persist();
        }
    }

    /// Flag the session for a later retry without attempting a restore now.
    ///
    /// `None` keeps whatever error was recorded before.
    pub fn mark_pending(&mut self, error: Option<String>) {
        if let Some(session) = self.current.as_mut() {
            session.pending_restore = true;
            if error.is_some() {
                session.last_restore_error = error;
            }
            session.last_restore_attempt_at = Some(Utc::now());
            self.persist();
        }
    }

    /// Push the captured baseline back through `policy`.
    ///
    /// Success destroys the session. Failure keeps it, records the error and,
    /// when `mark_pending_on_failure` is set, flags it for retry.
    pub async fn restore(
        &mut self,
        policy: &dyn SystemPolicyControl,
        mark_pending_on_failure: bool,
    ) -> Result<(), ControlError> {
        let Some(session) = self.current.as_mut() else {
            return Ok(());
        };
        session.last_restore_attempt_at = Some(Utc::now());
        session.pending_restore = false;
        session.last_restore_error = None;
        let snapshot = session.snapshot.clone();
        self.persist();

        match policy.restore(&snapshot).await {
            Ok(()) => {
                tracing::info!(?snapshot, "system policy restored to baseline");
                self.current = None;
                self.persist();
                Ok(())
            }
            Err(error) => {
                tracing::warn!(%error, mark_pending_on_failure, "system policy restore failed");
                if let Some(session) = self.current.as_mut() {
                    session.pending_restore = mark_pending_on_failure;
                    session.last_restore_error = Some(error.to_string());
                    session.last_restore_attempt_at = Some(Utc::now());
                }
                self.persist();
                Err(error)
            }
        }
    }

    fn persist(&self) {
        self.store.save(self.current.as_ref());
    }
}
