//! Coordinates the local assertion and the system sleep policy as one
//! "awake" intent.
//!
//! All mutation of [`IntentState`] and of the override session happens while
//! holding the `core` lock, so no two operations interleave their effects.
//! The `phase` flag is the single-flight guard for full enable/disable
//! transitions and is checked synchronously, before any await, so a second
//! request is rejected instead of queued.

mod bootstrap;
mod lid_lock;
mod refresh;
mod restore;
mod status;
mod transition;

pub use status::{Phase, StatusSnapshot};

use crate::capabilities::{
    BoxFuture, LidMonitor, LocalAssertionControl, LoginItemControl, ScreenLock,
    SetupStateProvider, SystemPolicyControl,
};
use crate::config::OrchestratorConfig;
use crate::domain::IntentState;
use crate::error::ControlError;
use crate::override_session::OverrideSessionManager;
use crate::store::{PreferenceStore, SessionStore};
use crate::util::Generation;
use futures_util::future::Shared;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// The capability objects the orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub local: Arc<dyn LocalAssertionControl>,
    pub policy: Arc<dyn SystemPolicyControl>,
    pub setup: Arc<dyn SetupStateProvider>,
    pub login_item: Arc<dyn LoginItemControl>,
    pub lid: Arc<dyn LidMonitor>,
    pub lock: Arc<dyn ScreenLock>,
}

struct Core {
    intent: IntentState,
    sessions: OverrideSessionManager,
    prefs: PreferenceStore,
}

type RestoreRetry = Shared<BoxFuture<'static, ()>>;

struct Inner {
    collab: Collaborators,
    config: OrchestratorConfig,
    /// Direct handle on the session record for use without the `core` lock.
    session_record: SessionStore,
    phase: Mutex<Phase>,
    core: tokio::sync::Mutex<Core>,
    status_tx: watch::Sender<StatusSnapshot>,
    restore_retry: Mutex<Option<RestoreRetry>>,
    error_generation: Generation,
    approval_generation: Generation,
    bootstrapped: AtomicBool,
    lock_on_lid_close: AtomicBool,
    lid_armed: AtomicBool,
    lock_in_flight: AtomicBool,
    lid_task: Mutex<Option<JoinHandle<()>>>,
}

/// Cheaply cloneable handle to the keep-awake orchestrator.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Orchestrator {
    /// Build an orchestrator whose durable state lives in `state_dir`.
    ///
    /// Live flags always start inactive; call [`bootstrap`](Self::bootstrap)
    /// to reconcile them with the collaborators.
    pub fn new(collab: Collaborators, config: OrchestratorConfig, state_dir: &Path) -> Self {
        let prefs = PreferenceStore::new(state_dir);
        let intent = prefs.load();
        let sessions = OverrideSessionManager::load(SessionStore::new(state_dir));
        let initial = StatusSnapshot::new(&intent, Phase::Idle, sessions.pending_restore_message());
        let (status_tx, _) = watch::channel(initial);
        let lock_on_lid_close = config.lock_on_lid_close;

        Self {
            inner: Arc::new(Inner {
                collab,
                config,
                session_record: SessionStore::new(state_dir),
                phase: Mutex::new(Phase::Idle),
                core: tokio::sync::Mutex::new(Core {
                    intent,
                    sessions,
                    prefs,
                }),
                status_tx,
                restore_retry: Mutex::new(None),
                error_generation: Generation::new(),
                approval_generation: Generation::new(),
                bootstrapped: AtomicBool::new(false),
                lock_on_lid_close: AtomicBool::new(lock_on_lid_close),
                lid_armed: AtomicBool::new(false),
                lock_in_flight: AtomicBool::new(false),
                lid_task: Mutex::new(None),
            }),
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        self.inner.status_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.inner.status_tx.subscribe()
    }

    pub fn phase(&self) -> Phase {
        *lock(&self.inner.phase)
    }

    pub fn is_transitioning(&self) -> bool {
        self.phase().is_transitioning()
    }

    /// Apply a launch-at-login change; the preference is persisted only on success.
    pub async fn set_launch_at_login(&self, enabled: bool) -> Result<(), ControlError> {
        let mut core = self.inner.core.lock().await;
        let result = self.inner.collab.login_item.set_enabled(enabled);
        match &result {
            Ok(()) => {
                core.intent.launch_at_login_enabled = enabled;
                self.persist(&core);
            }
            Err(error) => {
                self.set_transient_error(&mut core, format!("Launch-at-login update failed: {error}"));
            }
        }
        self.publish(&core);
        result
    }

    fn persist(&self, core: &Core) {
        core.prefs.save(&core.intent);
    }

    fn publish(&self, core: &Core) {
        let snapshot = StatusSnapshot::new(
            &core.intent,
            self.phase(),
            core.sessions.pending_restore_message(),
        );
        self.inner.status_tx.send_replace(snapshot);
    }

    fn publish_phase(&self, phase: Phase) {
        self.inner
            .status_tx
            .send_modify(|snapshot| snapshot.with_phase(phase));
    }

    /// Show `message` until it expires or a newer message replaces it.
    fn set_transient_error(&self, core: &mut Core, message: String) {
        tracing::warn!(%message, "surfacing error");
        core.intent.transient_error = Some(message);

        let token = self.inner.error_generation.begin();
        let display = self.inner.config.error_display();
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(display).await;
            if !token.is_current() {
                return;
            }
            let mut core = this.inner.core.lock().await;
            if token.is_current() {
                core.intent.transient_error = None;
                this.publish(&core);
            }
        });
    }
}
