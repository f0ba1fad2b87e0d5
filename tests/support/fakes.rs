#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::{Notify, mpsc};

use lidwake::capabilities::{
    BoxFuture, LidMonitor, LocalAssertionControl, LockCapability, LoginItemControl,
    RegistrationStatus, ScreenLock, ServiceRegistry, SetupStateProvider, SystemPolicyControl,
};
use lidwake::config::OrchestratorConfig;
use lidwake::domain::{ManagedKey, SetupState, Snapshot};
use lidwake::error::{ControlError, HelperError};
use lidwake::helper::{CleanupReport, HelperRequest, HelperResponse, HelperTransport};
use lidwake::orchestrator::{Collaborators, Orchestrator, Phase};

/// A suspension point a test can observe and release.
#[derive(Default)]
pub struct Gate {
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl Gate {
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.armed.store(false, Ordering::SeqCst);
        self.release.notify_waiters();
        self.release.notify_one();
    }

    async fn pass(&self) {
        if self.armed.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

#[derive(Default)]
pub struct FakeLocal {
    pub enabled: Mutex<bool>,
    pub calls: Mutex<Vec<bool>>,
    pub fail_enable: AtomicBool,
    pub fail_disable: AtomicBool,
}

impl FakeLocal {
    pub fn is_on(&self) -> bool {
        *self.enabled.lock().unwrap()
    }
}

impl LocalAssertionControl for FakeLocal {
    fn set_enabled(&self, enabled: bool) -> Result<(), ControlError> {
        self.calls.lock().unwrap().push(enabled);
        let failing = if enabled { &self.fail_enable } else { &self.fail_disable };
        if failing.load(Ordering::SeqCst) {
            return Err(ControlError::LocalAssertion("assertion refused".into()));
        }
        *self.enabled.lock().unwrap() = enabled;
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.is_on()
    }
}

#[derive(Default)]
pub struct FakePolicy {
    pub value: Mutex<bool>,
    pub set_calls: Mutex<Vec<bool>>,
    pub captures: AtomicUsize,
    pub restores: AtomicUsize,
    pub cleanups: AtomicUsize,
    pub fail_enable: Mutex<Option<ControlError>>,
    pub fail_restore: AtomicBool,
    pub fail_read: AtomicBool,
    pub enable_gate: Gate,
    pub restore_gate: Gate,
}

impl FakePolicy {
    pub fn current(&self) -> bool {
        *self.value.lock().unwrap()
    }

    pub fn set_calls(&self) -> Vec<bool> {
        self.set_calls.lock().unwrap().clone()
    }
}

impl SystemPolicyControl for FakePolicy {
    fn set_enabled(&self, enabled: bool) -> BoxFuture<'_, Result<(), ControlError>> {
        Box::pin(async move {
            if enabled {
                self.enable_gate.pass().await;
            }
            self.set_calls.lock().unwrap().push(enabled);
            if enabled && let Some(error) = self.fail_enable.lock().unwrap().clone() {
                return Err(error);
            }
            *self.value.lock().unwrap() = enabled;
            Ok(())
        })
    }

    fn read_current_value(&self) -> BoxFuture<'_, Result<bool, ControlError>> {
        Box::pin(async move {
            if self.fail_read.load(Ordering::SeqCst) {
                return Err(HelperError::Timeout {
                    operation: "read_policy",
                }
                .into());
            }
            Ok(self.current())
        })
    }

    fn capture_baseline(&self) -> BoxFuture<'_, Result<Snapshot, ControlError>> {
        Box::pin(async move {
            self.captures.fetch_add(1, Ordering::SeqCst);
            Ok(Snapshot::sleep_disabled(self.current()))
        })
    }

    fn restore<'a>(&'a self, snapshot: &'a Snapshot) -> BoxFuture<'a, Result<(), ControlError>> {
        Box::pin(async move {
            self.restores.fetch_add(1, Ordering::SeqCst);
            self.restore_gate.pass().await;
            if self.fail_restore.load(Ordering::SeqCst) {
                return Err(HelperError::Unreachable("helper exited".into()).into());
            }
            if let Some(value) = snapshot.get(ManagedKey::SleepDisabled) {
                *self.value.lock().unwrap() = value;
            }
            Ok(())
        })
    }

    fn cleanup_legacy_artifacts(&self) -> BoxFuture<'_, Result<CleanupReport, ControlError>> {
        Box::pin(async move {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
            Ok(CleanupReport {
                cleaned_paths: vec!["/private/etc/sudoers.d/lidwake_pmset".into()],
                skipped_paths: Vec::new(),
                backup_directory: "/tmp/backup".into(),
            })
        })
    }
}

pub struct FakeSetup {
    pub refresh_state: Mutex<SetupState>,
    pub start_state: Mutex<SetupState>,
    pub refreshes: AtomicUsize,
    pub starts: AtomicUsize,
    pub approvals_opened: AtomicUsize,
}

impl FakeSetup {
    pub fn new(state: SetupState) -> Self {
        Self {
            refresh_state: Mutex::new(state.clone()),
            start_state: Mutex::new(state),
            refreshes: AtomicUsize::new(0),
            starts: AtomicUsize::new(0),
            approvals_opened: AtomicUsize::new(0),
        }
    }

    pub fn set_state(&self, state: SetupState) {
        *self.refresh_state.lock().unwrap() = state.clone();
        *self.start_state.lock().unwrap() = state;
    }
}

impl SetupStateProvider for FakeSetup {
    fn refresh_status(&self) -> BoxFuture<'_, SetupState> {
        Box::pin(async move {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            self.refresh_state.lock().unwrap().clone()
        })
    }

    fn start_setup(&self) -> BoxFuture<'_, SetupState> {
        Box::pin(async move {
            self.starts.fetch_add(1, Ordering::SeqCst);
            let state = self.start_state.lock().unwrap().clone();
            *self.refresh_state.lock().unwrap() = state.clone();
            state
        })
    }

    fn open_approval_ui(&self) {
        self.approvals_opened.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeLoginItem {
    pub enabled: Mutex<bool>,
    pub calls: Mutex<Vec<bool>>,
    pub fail: AtomicBool,
}

impl LoginItemControl for FakeLoginItem {
    fn set_enabled(&self, enabled: bool) -> Result<(), ControlError> {
        self.calls.lock().unwrap().push(enabled);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ControlError::LoginItem("launchctl refused".into()));
        }
        *self.enabled.lock().unwrap() = enabled;
        Ok(())
    }

    fn read_enabled(&self) -> bool {
        *self.enabled.lock().unwrap()
    }
}

pub struct FakeLid {
    pub supported: bool,
    pub sender: Mutex<Option<mpsc::Sender<bool>>>,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

impl FakeLid {
    pub fn new(supported: bool) -> Self {
        Self {
            supported,
            sender: Mutex::new(None),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn is_running(&self) -> bool {
        self.sender.lock().unwrap().is_some()
    }

    pub async fn emit(&self, closed: bool) {
        let sender = self.sender.lock().unwrap().clone();
        if let Some(sender) = sender {
            sender.send(closed).await.unwrap();
        }
    }
}

impl LidMonitor for FakeLid {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn start(&self) -> Result<mpsc::Receiver<bool>, ControlError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(8);
        *self.sender.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.sender.lock().unwrap().take();
    }
}

pub struct FakeLock {
    pub supported: bool,
    pub locks: AtomicUsize,
    pub gate: Gate,
}

impl FakeLock {
    pub fn new(supported: bool) -> Self {
        Self {
            supported,
            locks: AtomicUsize::new(0),
            gate: Gate::default(),
        }
    }
}

impl ScreenLock for FakeLock {
    fn capability(&self) -> LockCapability {
        if self.supported {
            LockCapability::Supported
        } else {
            LockCapability::Unsupported("No screen lock command is available.".into())
        }
    }

    fn lock_now(&self) -> BoxFuture<'_, Result<(), ControlError>> {
        Box::pin(async move {
            self.locks.fetch_add(1, Ordering::SeqCst);
            self.gate.pass().await;
            Ok(())
        })
    }
}

/// Registration record that enables itself on `register()`.
pub struct FakeRegistry {
    pub status: Mutex<RegistrationStatus>,
    pub registers: AtomicUsize,
    pub unregisters: AtomicUsize,
}

impl FakeRegistry {
    pub fn new(status: RegistrationStatus) -> Self {
        Self {
            status: Mutex::new(status),
            registers: AtomicUsize::new(0),
            unregisters: AtomicUsize::new(0),
        }
    }
}

impl ServiceRegistry for FakeRegistry {
    fn status(&self) -> RegistrationStatus {
        *self.status.lock().unwrap()
    }

    fn register(&self) -> Result<(), ControlError> {
        self.registers.fetch_add(1, Ordering::SeqCst);
        *self.status.lock().unwrap() = RegistrationStatus::Enabled;
        Ok(())
    }

    fn unregister(&self) -> Result<(), ControlError> {
        self.unregisters.fetch_add(1, Ordering::SeqCst);
        *self.status.lock().unwrap() = RegistrationStatus::NotRegistered;
        Ok(())
    }
}

/// Helper transport that answers every ping.
pub struct PingOk;

impl HelperTransport for PingOk {
    fn call(&self, _request: HelperRequest) -> BoxFuture<'_, Result<HelperResponse, HelperError>> {
        Box::pin(async { Ok(HelperResponse::Ok) })
    }
}

pub fn test_config() -> OrchestratorConfig {
    OrchestratorConfig {
        error_display_secs: 6,
        approval_poll_attempts: 5,
        approval_poll_interval_ms: 1_000,
        termination_deadline_ms: 5_000,
        refresh_interval_secs: 30,
        lock_on_lid_close: false,
    }
}

pub struct Harness {
    pub tmp: TempDir,
    pub local: Arc<FakeLocal>,
    pub policy: Arc<FakePolicy>,
    pub setup: Arc<FakeSetup>,
    pub login_item: Arc<FakeLoginItem>,
    pub lid: Arc<FakeLid>,
    pub lock: Arc<FakeLock>,
    pub config: OrchestratorConfig,
}

impl Harness {
    pub fn new(state: SetupState) -> Self {
        Self::with_config(state, test_config())
    }

    pub fn with_config(state: SetupState, config: OrchestratorConfig) -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
            local: Arc::new(FakeLocal::default()),
            policy: Arc::new(FakePolicy::default()),
            setup: Arc::new(FakeSetup::new(state)),
            login_item: Arc::new(FakeLoginItem::default()),
            lid: Arc::new(FakeLid::new(true)),
            lock: Arc::new(FakeLock::new(true)),
            config,
        }
    }

    pub fn state_dir(&self) -> &Path {
        self.tmp.path()
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            local: self.local.clone(),
            policy: self.policy.clone(),
            setup: self.setup.clone(),
            login_item: self.login_item.clone(),
            lid: self.lid.clone(),
            lock: self.lock.clone(),
        }
    }

    /// A fresh orchestrator over the same durable state, as after a restart.
    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(self.collaborators(), self.config.clone(), self.state_dir())
    }
}

pub async fn wait_idle(orchestrator: &Orchestrator) {
    let mut rx = orchestrator.subscribe();
    tokio::time::timeout(
        Duration::from_secs(30),
        rx.wait_for(|status| status.phase == Phase::Idle),
    )
    .await
    .expect("transition did not finish")
    .unwrap();
}
