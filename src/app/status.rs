use chrono::{DateTime, Utc};
use std::path::PathBuf;

use lidwake::capabilities::LockCapability;
use lidwake::domain::SetupState;
use lidwake::orchestrator::StatusSnapshot;
use lidwake::store::Preferences;

/// Everything `lidwake status` shows, gathered without touching sleep settings.
pub struct StatusReport {
    pub setup_state: SetupState,
    pub preferences: Preferences,
    pub launch_at_login_registered: bool,
    pub pending_restore_message: Option<String>,
    pub session_captured_at: Option<DateTime<Utc>>,
    pub lock_on_lid_close: bool,
    pub lock_capability: LockCapability,
    pub config_path: PathBuf,
    pub state_dir: PathBuf,
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

pub fn render_status(report: &StatusReport) -> String {
    let mut lines = vec![
        "◆ lidwake".to_string(),
        String::new(),
        format!("Version     {}", env!("CARGO_PKG_VERSION")),
        format!("Config      {}", report.config_path.display()),
        format!("State       {}", report.state_dir.display()),
        String::new(),
        format!("Setup       {}", report.setup_state.title()),
        format!("            {}", report.setup_state.detail()),
    ];

    match (&report.session_captured_at, &report.pending_restore_message) {
        (_, Some(pending)) => lines.push(format!("Restore     {pending}")),
        (Some(captured_at), None) => lines.push(format!(
            "Session     active since {}",
            captured_at.format("%Y-%m-%d %H:%M:%S UTC")
        )),
        (None, None) => lines.push("Session     none".into()),
    }

    lines.push(String::new());
    let login = report.preferences.launch_at_login_enabled;
    let mut login_line = format!("Login       {}", on_off(login));
    if login != report.launch_at_login_registered {
        login_line.push_str(" (login item out of sync)");
    }
    lines.push(login_line);

    let lid_line = match &report.lock_capability {
        LockCapability::Supported => format!("Lid lock    {}", on_off(report.lock_on_lid_close)),
        LockCapability::Unsupported(reason) => format!("Lid lock    unavailable: {reason}"),
    };
    lines.push(lid_line);
    lines.push(format!(
        "Cleanup     {}",
        if report.preferences.legacy_cleanup_completed {
            "done"
        } else {
            "pending"
        }
    ));

    lines.join("\n")
}

/// One-line summary of a live orchestrator snapshot.
pub fn render_snapshot(snapshot: &StatusSnapshot) -> String {
    let mut line = format!("{}: {}", snapshot.mode, snapshot.mode.detail());
    if let Some(blocked) = &snapshot.blocked_message {
        line.push_str(&format!("\n  {blocked}"));
    }
    if let Some(error) = &snapshot.intent.transient_error {
        line.push_str(&format!("\n  {error}"));
    }
    if let Some(pending) = &snapshot.pending_restore_message {
        line.push_str(&format!("\n  {pending}"));
    }
    line
}
