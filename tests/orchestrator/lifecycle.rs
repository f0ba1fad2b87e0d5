use std::sync::atomic::Ordering;
use std::time::Duration;

use lidwake::domain::{IntentState, Mode, SetupState};
use lidwake::store::PreferenceStore;

use super::fakes::{Harness, wait_idle};

#[tokio::test]
async fn bootstrap_forces_live_flags_off_and_reconciles_login_item() {
    let h = Harness::new(SetupState::Ready);
    *h.local.enabled.lock().unwrap() = true;
    PreferenceStore::new(h.state_dir()).save(&IntentState {
        launch_at_login_enabled: true,
        local_assertion_active: true,
        system_policy_active_by_app: true,
        ..IntentState::default()
    });

    let orch = h.orchestrator();
    orch.bootstrap().await;

    let status = orch.status();
    assert!(!h.local.is_on());
    assert!(!status.intent.local_assertion_active);
    assert!(!status.intent.system_policy_active_by_app);
    assert!(status.intent.launch_at_login_enabled);
    assert_eq!(h.login_item.calls.lock().unwrap().as_slice(), &[true]);
    assert_eq!(status.intent.setup_state, SetupState::Ready);
}

#[tokio::test]
async fn bootstrap_runs_once_per_process() {
    let h = Harness::new(SetupState::Ready);
    let orch = h.orchestrator();

    orch.bootstrap().await;
    orch.bootstrap().await;

    assert_eq!(h.setup.refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn legacy_cleanup_runs_once_across_restarts() {
    let h = Harness::new(SetupState::Ready);
    h.orchestrator().bootstrap().await;
    assert_eq!(h.policy.cleanups.load(Ordering::SeqCst), 1);
    assert!(PreferenceStore::new(h.state_dir()).load_preferences().legacy_cleanup_completed);

    h.orchestrator().bootstrap().await;
    assert_eq!(h.policy.cleanups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn legacy_cleanup_waits_for_ready_helper() {
    let h = Harness::new(SetupState::NotRegistered);
    h.orchestrator().bootstrap().await;
    assert_eq!(h.policy.cleanups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unready_helper_releases_local_assertion_on_refresh() {
    let h = Harness::new(SetupState::Ready);
    let orch = h.orchestrator();
    orch.bootstrap().await;
    orch.set_enabled(true).await;
    assert_eq!(orch.status().mode, Mode::FullAwake);

    h.setup
        .set_state(SetupState::Unavailable("helper crashed".into()));
    orch.refresh_setup_state().await;

    let status = orch.status();
    assert_eq!(status.mode, Mode::Off);
    assert!(!h.local.is_on());
    assert!(!status.intent.system_policy_active_by_app);
    assert_eq!(
        status.blocked_message.as_deref(),
        Some("Helper unavailable: helper crashed")
    );
}

#[tokio::test]
async fn refresh_tracks_external_policy_changes() {
    let h = Harness::new(SetupState::Ready);
    let orch = h.orchestrator();
    orch.set_enabled(true).await;

    *h.policy.value.lock().unwrap() = false;
    orch.refresh_setup_state().await;
    assert!(!orch.status().intent.system_policy_active_by_app);

    h.policy.fail_read.store(true, Ordering::SeqCst);
    orch.refresh_setup_state().await;
    assert!(
        orch.status()
            .intent
            .transient_error
            .unwrap()
            .starts_with("Could not read current sleep policy:")
    );
}

#[tokio::test]
async fn refresh_is_skipped_while_transitioning() {
    let h = Harness::new(SetupState::Ready);
    let orch = h.orchestrator();
    h.policy.enable_gate.arm();

    assert!(orch.request_enable(true));
    h.policy.enable_gate.wait_entered().await;

    let before = h.setup.refreshes.load(Ordering::SeqCst);
    orch.refresh_setup_state().await;
    assert_eq!(h.setup.refreshes.load(Ordering::SeqCst), before);

    h.policy.enable_gate.open();
    wait_idle(&orch).await;
    assert_eq!(orch.status().mode, Mode::FullAwake);
}

#[tokio::test(start_paused = true)]
async fn transient_error_expires_unless_superseded() {
    let h = Harness::new(SetupState::ApprovalRequired);
    let orch = h.orchestrator();

    orch.set_enabled(true).await;
    assert!(orch.status().intent.transient_error.is_some());

    tokio::time::sleep(Duration::from_secs(4)).await;
    orch.set_enabled(true).await;

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(
        orch.status().intent.transient_error.is_some(),
        "newer message must outlive the first expiry"
    );

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(orch.status().intent.transient_error.is_none());
}

#[tokio::test]
async fn launch_at_login_persists_only_on_success() {
    let h = Harness::new(SetupState::Ready);
    let orch = h.orchestrator();

    orch.set_launch_at_login(true).await.unwrap();
    assert!(orch.status().intent.launch_at_login_enabled);
    assert!(PreferenceStore::new(h.state_dir()).load_preferences().launch_at_login_enabled);

    h.login_item.fail.store(true, Ordering::SeqCst);
    assert!(orch.set_launch_at_login(false).await.is_err());

    let status = orch.status();
    assert!(status.intent.launch_at_login_enabled);
    assert!(PreferenceStore::new(h.state_dir()).load_preferences().launch_at_login_enabled);
    assert_eq!(
        status.intent.transient_error.as_deref(),
        Some("Launch-at-login update failed: login item update failed: launchctl refused")
    );
}

#[tokio::test(start_paused = true)]
async fn approval_poll_stops_once_ready() {
    let h = Harness::new(SetupState::ApprovalRequired);
    let orch = h.orchestrator();

    let poll = orch.open_approval_settings();
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    h.setup.set_state(SetupState::Ready);
    poll.await.unwrap();

    assert_eq!(h.setup.approvals_opened.load(Ordering::SeqCst), 1);
    assert_eq!(h.setup.refreshes.load(Ordering::SeqCst), 4);
    assert_eq!(orch.status().intent.setup_state, SetupState::Ready);
}

#[tokio::test(start_paused = true)]
async fn newer_approval_poll_supersedes_older() {
    let h = Harness::new(SetupState::ApprovalRequired);
    let orch = h.orchestrator();

    let first = orch.open_approval_settings();
    let second = orch.open_approval_settings();
    first.await.unwrap();
    second.await.unwrap();

    assert_eq!(h.setup.approvals_opened.load(Ordering::SeqCst), 2);
    assert_eq!(h.setup.refreshes.load(Ordering::SeqCst), 5);
}
