use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use lidwake::capabilities::RegistrationStatus;
use lidwake::config::SetupConfig;
use lidwake::domain::{Mode, SetupState, Snapshot};
use lidwake::error::ControlError;
use lidwake::helper::HelperClient;
use lidwake::orchestrator::{Collaborators, Orchestrator, Phase};
use lidwake::setup::SetupMachine;
use lidwake::store::SessionStore;

use super::fakes::{FakeRegistry, Harness, PingOk, wait_idle};

#[tokio::test]
async fn enable_when_ready_reaches_full_awake() {
    let h = Harness::new(SetupState::Ready);
    let orch = h.orchestrator();
    orch.bootstrap().await;

    assert!(orch.set_enabled(true).await);

    let status = orch.status();
    assert_eq!(status.mode, Mode::FullAwake);
    assert!(status.switch_on);
    assert_eq!(status.phase, Phase::Idle);
    assert!(h.local.is_on());
    assert!(h.policy.current());
    assert_eq!(h.setup.starts.load(Ordering::SeqCst), 0);

    let session = SessionStore::new(h.state_dir()).load().unwrap();
    assert_eq!(session.snapshot, Snapshot::sleep_disabled(false));
    assert!(!session.pending_restore);
}

#[tokio::test]
async fn repeated_enable_captures_baseline_once() {
    let h = Harness::new(SetupState::Ready);
    let orch = h.orchestrator();

    orch.set_enabled(true).await;
    orch.set_enabled(true).await;

    assert_eq!(h.policy.captures.load(Ordering::SeqCst), 1);
    assert!(h.policy.set_calls().len() <= 2);
    assert_eq!(orch.status().mode, Mode::FullAwake);
    assert_eq!(
        SessionStore::new(h.state_dir()).load().unwrap().snapshot,
        Snapshot::sleep_disabled(false)
    );
}

#[tokio::test]
async fn concurrent_request_is_rejected_while_transitioning() {
    let h = Harness::new(SetupState::Ready);
    let orch = h.orchestrator();
    h.policy.enable_gate.arm();

    assert!(orch.request_enable(true));
    h.policy.enable_gate.wait_entered().await;

    assert_eq!(orch.phase(), Phase::Transitioning { target: true });
    assert!(orch.status().switch_on);
    assert!(!orch.request_enable(false));
    assert!(!orch.set_enabled(false).await);

    h.policy.enable_gate.open();
    wait_idle(&orch).await;

    assert_eq!(orch.status().mode, Mode::FullAwake);
    assert_eq!(h.local.calls.lock().unwrap().as_slice(), &[true]);
}

#[tokio::test]
async fn policy_failure_rolls_back_local_assertion() {
    let h = Harness::new(SetupState::Ready);
    *h.policy.fail_enable.lock().unwrap() =
        Some(ControlError::LocalAssertion("pmset refused".into()));
    let orch = h.orchestrator();

    assert!(orch.set_enabled(true).await);

    let status = orch.status();
    assert_eq!(status.mode, Mode::Off);
    assert!(!status.intent.local_assertion_active);
    assert!(!h.local.is_on());
    assert_eq!(h.local.calls.lock().unwrap().as_slice(), &[true, false]);
    assert!(SessionStore::new(h.state_dir()).load().is_none());
    assert_eq!(h.policy.restores.load(Ordering::SeqCst), 1);
    assert!(
        status
            .intent
            .transient_error
            .unwrap()
            .starts_with("Could not enable Full Awake:")
    );
}

#[tokio::test]
async fn failed_local_rollback_is_reported_and_observed() {
    let h = Harness::new(SetupState::Ready);
    *h.policy.fail_enable.lock().unwrap() =
        Some(ControlError::LocalAssertion("pmset refused".into()));
    h.local.fail_disable.store(true, Ordering::SeqCst);
    let orch = h.orchestrator();

    orch.set_enabled(true).await;

    let status = orch.status();
    assert!(status.intent.local_assertion_active);
    assert_eq!(status.mode, Mode::Off);
    let error = status.intent.transient_error.unwrap();
    assert!(error.starts_with("Could not enable Full Awake:"));
    assert!(error.contains("Open-lid awake may still be active because rollback failed"));
}

#[tokio::test]
async fn setup_required_during_enable_records_state_and_rolls_back() {
    let h = Harness::new(SetupState::Ready);
    *h.policy.fail_enable.lock().unwrap() =
        Some(ControlError::SetupRequired(SetupState::ApprovalRequired));
    let orch = h.orchestrator();

    orch.set_enabled(true).await;

    let status = orch.status();
    assert_eq!(status.intent.setup_state, SetupState::ApprovalRequired);
    assert_eq!(status.mode, Mode::Off);
    assert_eq!(
        status.intent.transient_error.as_deref(),
        Some("Approve helper in Login Items.")
    );
    assert_eq!(h.setup.approvals_opened.load(Ordering::SeqCst), 1);
    assert!(!h.local.is_on());
}

#[tokio::test]
async fn unready_setup_aborts_without_touching_capabilities() {
    let h = Harness::new(SetupState::ApprovalRequired);
    let orch = h.orchestrator();

    assert!(orch.set_enabled(true).await);

    let status = orch.status();
    assert_eq!(status.mode, Mode::Off);
    assert_eq!(
        status.blocked_message.as_deref(),
        Some("Approve helper in Login Items.")
    );
    assert_eq!(h.setup.starts.load(Ordering::SeqCst), 1);
    assert_eq!(h.setup.approvals_opened.load(Ordering::SeqCst), 1);
    assert!(h.local.calls.lock().unwrap().is_empty());
    assert!(h.policy.set_calls().is_empty());
    assert_eq!(h.policy.captures.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn unregistered_helper_is_registered_once_then_enabled() {
    let h = Harness::new(SetupState::NotRegistered);
    let registry = Arc::new(FakeRegistry::new(RegistrationStatus::NotRegistered));
    let client = HelperClient::new(
        Arc::new(PingOk),
        Duration::from_secs(8),
        Duration::from_secs(2),
    );
    let machine = SetupMachine::new(
        registry.clone(),
        client,
        SetupConfig::default(),
        std::env::current_exe().unwrap(),
        Arc::new(|| {}),
    );
    let collab = Collaborators {
        setup: Arc::new(machine),
        ..h.collaborators()
    };
    let orch = Orchestrator::new(collab, h.config.clone(), h.state_dir());

    orch.set_enabled(true).await;

    assert_eq!(registry.registers.load(Ordering::SeqCst), 1);
    let status = orch.status();
    assert_eq!(status.intent.setup_state, SetupState::Ready);
    assert_eq!(status.mode, Mode::FullAwake);
}

#[tokio::test]
async fn disable_restores_captured_baseline() {
    let h = Harness::new(SetupState::Ready);
    *h.policy.value.lock().unwrap() = true;
    let orch = h.orchestrator();

    orch.set_enabled(true).await;
    orch.set_enabled(false).await;

    let status = orch.status();
    assert_eq!(status.mode, Mode::Off);
    assert!(!h.local.is_on());
    // Baseline was already "sleep disabled"; restore puts that back.
    assert!(h.policy.current());
    assert!(SessionStore::new(h.state_dir()).load().is_none());
    assert!(status.intent.transient_error.is_none());
}

#[tokio::test]
async fn disable_without_session_turns_policy_off_directly() {
    let h = Harness::new(SetupState::Ready);
    let orch = h.orchestrator();

    orch.set_enabled(false).await;

    assert_eq!(h.policy.set_calls(), vec![false]);
    assert_eq!(h.policy.restores.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_restore_on_disable_keeps_full_awake_and_pending() {
    let h = Harness::new(SetupState::Ready);
    let orch = h.orchestrator();
    orch.set_enabled(true).await;

    h.policy.fail_restore.store(true, Ordering::SeqCst);
    orch.set_enabled(false).await;

    let status = orch.status();
    assert_eq!(status.mode, Mode::FullAwake);
    assert!(h.local.is_on());
    assert!(
        status
            .intent
            .transient_error
            .unwrap()
            .starts_with("Could not restore previous sleep settings:")
    );
    assert!(status.pending_restore_message.is_some());

    let session = SessionStore::new(h.state_dir()).load().unwrap();
    assert!(session.pending_restore);
    assert!(session.last_restore_error.is_some());
}

#[tokio::test]
async fn local_release_failure_does_not_block_policy_restore() {
    let h = Harness::new(SetupState::Ready);
    let orch = h.orchestrator();
    orch.set_enabled(true).await;

    h.local.fail_disable.store(true, Ordering::SeqCst);
    orch.set_enabled(false).await;

    assert_eq!(h.policy.restores.load(Ordering::SeqCst), 1);
    assert!(!h.policy.current());
    assert!(SessionStore::new(h.state_dir()).load().is_none());

    let status = orch.status();
    assert_eq!(status.intent.local_assertion_active, h.local.is_on());
    assert!(status.intent.local_assertion_active);
    assert!(!status.intent.system_policy_active_by_app);
    assert_eq!(status.mode, Mode::Off);
    assert!(
        status
            .intent
            .transient_error
            .unwrap()
            .starts_with("Could not disable open-lid awake:")
    );
}
