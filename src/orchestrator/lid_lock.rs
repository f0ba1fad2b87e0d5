use super::{Orchestrator, lock};
use crate::capabilities::LockCapability;
use crate::domain::{IntentState, Mode};
use std::sync::Arc;
use std::sync::atomic::Ordering;

impl Orchestrator {
    pub fn lock_on_lid_close(&self) -> bool {
        self.inner.lock_on_lid_close.load(Ordering::SeqCst)
    }

    /// Toggle locking the screen when the lid closes.
    ///
    /// Refused, with a transient error, when the host cannot lock the screen.
    pub async fn set_lock_on_lid_close(&self, enabled: bool) -> bool {
        let mut core = self.inner.core.lock().await;
        let capability = self.inner.collab.lock.capability();
        let applied = if enabled && !capability.is_supported() {
            let reason = match capability {
                LockCapability::Unsupported(reason) if !reason.is_empty() => reason,
                _ => "unsupported on this host.".into(),
            };
            self.inner.lock_on_lid_close.store(false, Ordering::SeqCst);
            self.set_transient_error(&mut core, format!("Lock on lid close is unavailable: {reason}"));
            false
        } else {
            self.inner.lock_on_lid_close.store(enabled, Ordering::SeqCst);
            true
        };
        self.update_lid_monitoring(&core.intent);
        self.publish(&core);
        applied
    }

    fn should_monitor_lid(&self, intent: &IntentState) -> bool {
        let collab = &self.inner.collab;
        self.lock_on_lid_close()
            && Mode::derive(intent) == Mode::FullAwake
            && !self.is_transitioning()
            && collab.lid.is_supported()
            && collab.lock.capability().is_supported()
    }

    pub(super) fn update_lid_monitoring(&self, intent: &IntentState) {
        if self.should_monitor_lid(intent) {
            self.arm_lid();
        } else {
            self.disarm_lid();
        }
    }

    fn arm_lid(&self) {
        let mut task = lock(&self.inner.lid_task);
        if task.is_some() {
            return;
        }

        let mut events = match self.inner.collab.lid.start() {
            Ok(events) => events,
            Err(error) => {
                self.inner.collab.lid.stop();
                self.report_async_error(format!("Could not monitor lid state: {error}"));
                return;
            }
        };

        self.inner.lid_armed.store(true, Ordering::SeqCst);
        let weak = Arc::downgrade(&self.inner);
        *task = Some(tokio::spawn(async move {
            let mut last_closed = None;
            while let Some(closed) = events.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if last_closed == Some(closed) {
                    continue;
                }
                last_closed = Some(closed);
                if closed {
                    Orchestrator { inner }.lock_after_lid_close();
                }
            }
        }));
        tracing::debug!("lid monitoring armed");
    }

    pub(super) fn disarm_lid(&self) {
        self.inner.lid_armed.store(false, Ordering::SeqCst);
        let handle = lock(&self.inner.lid_task).take();
        if let Some(handle) = handle {
            self.inner.collab.lid.stop();
            handle.abort();
            tracing::debug!("lid monitoring disarmed");
        }
        self.inner.lock_in_flight.store(false, Ordering::SeqCst);
    }

    fn lock_after_lid_close(&self) {
        if !self.inner.lid_armed.load(Ordering::SeqCst) {
            return;
        }
        if self.inner.lock_in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!("screen lock already in flight; lid close ignored");
            return;
        }

        let this = self.clone();
        tokio::spawn(async move {
            if this.inner.lid_armed.load(Ordering::SeqCst)
                && let Err(error) = this.inner.collab.lock.lock_now().await
            {
                this.report_async_error(format!("Could not lock computer on lid close: {error}"));
            }
            this.inner.lock_in_flight.store(false, Ordering::SeqCst);
        });
    }

    /// Surface an error from outside the serialized context.
    fn report_async_error(&self, message: String) {
        let this = self.clone();
        tokio::spawn(async move {
            let mut core = this.inner.core.lock().await;
            this.set_transient_error(&mut core, message);
            this.publish(&core);
        });
    }
}
