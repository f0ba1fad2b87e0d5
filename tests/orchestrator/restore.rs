use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::Utc;
use lidwake::domain::{Mode, OverrideSession, SetupState, Snapshot};
use lidwake::store::SessionStore;

use super::fakes::{Harness, wait_idle};

fn seed_pending_session(h: &Harness, baseline: bool) {
    let mut session = OverrideSession::new(Snapshot::sleep_disabled(baseline), Utc::now());
    session.pending_restore = true;
    session.last_restore_error = Some("helper exited".into());
    SessionStore::new(h.state_dir()).save(Some(&session));
}

#[tokio::test]
async fn bootstrap_retries_pending_restore_and_clears_session() {
    let h = Harness::new(SetupState::Ready);
    *h.policy.value.lock().unwrap() = true;
    seed_pending_session(&h, false);

    let orch = h.orchestrator();
    assert_eq!(
        orch.status().pending_restore_message.as_deref(),
        Some("Sleep restore is pending: helper exited")
    );

    orch.bootstrap().await;

    assert_eq!(h.policy.restores.load(Ordering::SeqCst), 1);
    assert!(!h.policy.current());
    assert!(SessionStore::new(h.state_dir()).load().is_none());
    assert!(orch.status().pending_restore_message.is_none());
}

#[tokio::test]
async fn bootstrap_keeps_session_pending_when_restore_fails() {
    let h = Harness::new(SetupState::Ready);
    h.policy.fail_restore.store(true, Ordering::SeqCst);
    seed_pending_session(&h, false);

    let orch = h.orchestrator();
    orch.bootstrap().await;

    let session = SessionStore::new(h.state_dir()).load().unwrap();
    assert!(session.pending_restore);
    assert!(session.last_restore_attempt_at.is_some());
    let status = orch.status();
    assert!(
        status
            .intent
            .transient_error
            .unwrap()
            .starts_with("Could not restore previous sleep settings on launch:")
    );
    assert!(status.pending_restore_message.is_some());
}

#[tokio::test]
async fn concurrent_refreshes_share_one_restore_attempt() {
    let h = Harness::new(SetupState::Ready);
    seed_pending_session(&h, false);
    h.policy.restore_gate.arm();
    let orch = h.orchestrator();

    tokio::join!(
        orch.refresh_setup_state(),
        orch.refresh_setup_state(),
        async {
            h.policy.restore_gate.wait_entered().await;
            h.policy.restore_gate.open();
        }
    );

    assert_eq!(h.policy.restores.load(Ordering::SeqCst), 1);
    assert!(SessionStore::new(h.state_dir()).load().is_none());
}

#[tokio::test]
async fn bootstrap_restore_is_joined_by_refresh() {
    let h = Harness::new(SetupState::Ready);
    *h.policy.value.lock().unwrap() = true;
    seed_pending_session(&h, false);
    h.policy.restore_gate.arm();
    let orch = h.orchestrator();

    tokio::join!(orch.bootstrap(), orch.refresh_setup_state(), async {
        h.policy.restore_gate.wait_entered().await;
        h.policy.restore_gate.open();
    });

    assert_eq!(h.policy.restores.load(Ordering::SeqCst), 1);
    assert!(!h.policy.current());
    assert!(SessionStore::new(h.state_dir()).load().is_none());
}

#[tokio::test]
async fn bootstrap_restores_session_left_armed_by_a_crash() {
    let h = Harness::new(SetupState::Ready);
    *h.policy.value.lock().unwrap() = true;
    SessionStore::new(h.state_dir()).save(Some(&OverrideSession::new(
        Snapshot::sleep_disabled(false),
        Utc::now(),
    )));

    let orch = h.orchestrator();
    assert!(orch.status().pending_restore_message.is_none());
    orch.bootstrap().await;

    assert_eq!(h.policy.restores.load(Ordering::SeqCst), 1);
    assert!(!h.policy.current());
    assert!(SessionStore::new(h.state_dir()).load().is_none());
}

#[tokio::test]
async fn transition_waits_for_in_flight_restore_retry() {
    let h = Harness::new(SetupState::Ready);
    *h.policy.value.lock().unwrap() = true;
    seed_pending_session(&h, false);
    h.policy.restore_gate.arm();
    let orch = h.orchestrator();

    tokio::join!(orch.refresh_setup_state(), async {
        h.policy.restore_gate.wait_entered().await;
        assert!(orch.request_enable(true));
        tokio::task::yield_now().await;
        assert_eq!(h.policy.captures.load(Ordering::SeqCst), 0);
        h.policy.restore_gate.open();
    });
    wait_idle(&orch).await;

    assert_eq!(h.policy.restores.load(Ordering::SeqCst), 1);
    assert_eq!(h.policy.captures.load(Ordering::SeqCst), 1);
    assert_eq!(orch.status().mode, Mode::FullAwake);
    // The fresh baseline is the restored value, not the stale override.
    assert_eq!(
        SessionStore::new(h.state_dir()).load().unwrap().snapshot,
        Snapshot::sleep_disabled(false)
    );
}

#[tokio::test]
async fn termination_restores_both_planes() {
    let h = Harness::new(SetupState::Ready);
    let orch = h.orchestrator();
    orch.set_enabled(true).await;

    orch.prepare_for_termination().await;

    let status = orch.status();
    assert_eq!(status.mode, Mode::Off);
    assert!(!h.local.is_on());
    assert!(!h.policy.current());
    assert!(SessionStore::new(h.state_dir()).load().is_none());
}

#[tokio::test(start_paused = true)]
async fn termination_deadline_leaves_session_pending() {
    let h = Harness::new(SetupState::Ready);
    let orch = h.orchestrator();
    orch.set_enabled(true).await;
    h.policy.restore_gate.arm();

    let started = tokio::time::Instant::now();
    orch.prepare_for_termination().await;
    assert_eq!(started.elapsed(), Duration::from_secs(5));

    let session = SessionStore::new(h.state_dir()).load().unwrap();
    assert!(session.pending_restore);
    assert_eq!(
        session.last_restore_error.as_deref(),
        Some("Restore did not finish before shutdown.")
    );
    let status = orch.status();
    assert!(!status.intent.system_policy_active_by_app);
    assert!(!status.intent.local_assertion_active);
}

#[tokio::test(start_paused = true)]
async fn termination_behind_stuck_disable_marks_session_pending() {
    let h = Harness::new(SetupState::Ready);
    let orch = h.orchestrator();
    orch.set_enabled(true).await;
    h.policy.restore_gate.arm();

    assert!(orch.request_enable(false));
    h.policy.restore_gate.wait_entered().await;

    let started = tokio::time::Instant::now();
    orch.prepare_for_termination().await;
    assert_eq!(started.elapsed(), Duration::from_secs(5));

    assert!(h.policy.current());
    let session = SessionStore::new(h.state_dir()).load().unwrap();
    assert!(session.pending_restore);
    assert_eq!(
        session.last_restore_error.as_deref(),
        Some("Restore did not finish before shutdown.")
    );
    assert!(orch.is_transitioning());
}
