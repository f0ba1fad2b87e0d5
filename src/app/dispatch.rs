use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use lidwake::capabilities::{LoginItemControl, ScreenLock};
use lidwake::commands::{Cli, Command, LoginItemCommands};
use lidwake::config::Config;
use lidwake::domain::SetupState;
use lidwake::helper::{HelperClient, SocketTransport};
use lidwake::orchestrator::{Collaborators, Orchestrator, StatusSnapshot};
use lidwake::platform::{
    AcpiLidMonitor, CommandScreenLock, HelperPolicy, InhibitAssertion, LaunchAgentLoginItem,
    UnitFileRegistry, open_approval_settings,
};
use lidwake::setup::{ApprovalOpener, SetupMachine};
use lidwake::store::{PreferenceStore, SessionStore};

use crate::app::status::{StatusReport, render_snapshot, render_status};

const LOGIN_ITEM_LABEL: &str = "dev.lidwake.agent";

/// Concrete collaborators wired from configuration.
struct Runtime {
    orchestrator: Orchestrator,
    setup: Arc<SetupMachine>,
    login_item: Arc<LaunchAgentLoginItem>,
    lock: Arc<CommandScreenLock>,
}

fn executable_path(config: &Config) -> Result<PathBuf> {
    match &config.helper.executable_path {
        Some(path) => Ok(path.clone()),
        None => std::env::current_exe().context("Could not resolve the lidwake executable"),
    }
}

fn build_runtime(config: &Config) -> Result<Runtime> {
    let executable = executable_path(config)?;

    let transport = Arc::new(SocketTransport::new(config.helper.socket_path.clone()));
    let client = HelperClient::new(
        transport,
        config.helper.request_timeout(),
        config.helper.ping_timeout(),
    );

    let registry = Arc::new(UnitFileRegistry::new(
        &config.helper.label,
        executable.clone(),
        config.helper.socket_path.clone(),
    ));
    let hint = registry.approval_hint();
    let opener: ApprovalOpener = Arc::new(move || open_approval_settings(&hint));

    let setup = Arc::new(SetupMachine::new(
        registry,
        client.clone(),
        config.setup.clone(),
        executable.clone(),
        opener,
    ));
    let policy = Arc::new(HelperPolicy::new(client, setup.clone()));
    let login_item = Arc::new(LaunchAgentLoginItem::new(LOGIN_ITEM_LABEL, executable)?);
    let lid = Arc::new(AcpiLidMonitor::new(
        config.lid.lid_state_dir.clone(),
        config.lid.poll_interval(),
    ));
    let lock = Arc::new(CommandScreenLock::new(config.lid.lock_commands.clone()));

    let collab = Collaborators {
        local: Arc::new(InhibitAssertion::new()),
        policy,
        setup: setup.clone(),
        login_item: login_item.clone(),
        lid,
        lock: lock.clone(),
    };
    let orchestrator = Orchestrator::new(collab, config.orchestrator.clone(), &config.state_dir);

    Ok(Runtime {
        orchestrator,
        setup,
        login_item,
        lock,
    })
}

/// Hold Full Awake until Ctrl-C, then put the sleep policy back.
async fn run_awake(config: &Config) -> Result<()> {
    let runtime = build_runtime(config)?;
    let orchestrator = runtime.orchestrator;

    orchestrator.bootstrap().await;
    orchestrator.set_enabled(true).await;
    let mut updates = orchestrator.subscribe();
    log_snapshot(&updates.borrow_and_update());

    let mut refresh = tokio::time::interval(config.orchestrator.refresh_interval());
    refresh.tick().await;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal.context("Failed to listen for Ctrl-C")?;
                info!("shutdown requested");
                break;
            }
            _ = refresh.tick() => orchestrator.refresh_setup_state().await,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                log_snapshot(&updates.borrow_and_update());
            }
        }
    }

    orchestrator.prepare_for_termination().await;
    let status = orchestrator.status();
    if let Some(pending) = status.pending_restore_message {
        warn!(%pending, "sleep settings were not fully restored");
    }
    Ok(())
}

fn log_snapshot(snapshot: &StatusSnapshot) {
    info!(
        mode = %snapshot.mode,
        setup = snapshot.intent.setup_state.title(),
        "status"
    );
    if let Some(error) = &snapshot.intent.transient_error {
        warn!(%error, "lidwake");
    }
}

async fn show_status(config: &Config) -> Result<()> {
    let runtime = build_runtime(config)?;
    let session = SessionStore::new(&config.state_dir).load();
    let report = StatusReport {
        setup_state: runtime.setup.refresh().await,
        preferences: PreferenceStore::new(&config.state_dir).load_preferences(),
        launch_at_login_registered: runtime.login_item.read_enabled(),
        pending_restore_message: session.as_ref().and_then(|s| s.pending_restore_message()),
        session_captured_at: session.map(|s| s.captured_at),
        lock_on_lid_close: config.orchestrator.lock_on_lid_close,
        lock_capability: runtime.lock.capability(),
        config_path: config.config_path.clone(),
        state_dir: config.state_dir.clone(),
    };
    println!("{}", render_status(&report));
    Ok(())
}

async fn run_setup(config: &Config, approve: bool) -> Result<()> {
    let runtime = build_runtime(config)?;
    let mut state = runtime.setup.start().await;

    if state == SetupState::ApprovalRequired && approve {
        info!("waiting for the privileged helper to be approved");
        runtime
            .orchestrator
            .open_approval_settings()
            .await
            .context("Approval poll failed")?;
        state = runtime.orchestrator.status().intent.setup_state;
    }

    println!("{}", state.title());
    println!("  {}", state.detail());
    if !state.is_ready() {
        anyhow::bail!("{}", state.blocked_message());
    }
    Ok(())
}

async fn run_restore(config: &Config) -> Result<()> {
    let runtime = build_runtime(config)?;
    runtime.orchestrator.bootstrap().await;
    let snapshot = runtime.orchestrator.status();
    println!("{}", render_snapshot(&snapshot));
    match snapshot.pending_restore_message {
        Some(pending) => anyhow::bail!("{pending}"),
        None => Ok(()),
    }
}

async fn run_login_item(config: &Config, command: LoginItemCommands) -> Result<()> {
    let runtime = build_runtime(config)?;
    let enabled = match command {
        LoginItemCommands::Status => {
            let registered = runtime.login_item.read_enabled();
            println!(
                "Launch at login: {}",
                if registered { "enabled" } else { "disabled" }
            );
            return Ok(());
        }
        LoginItemCommands::Enable => true,
        LoginItemCommands::Disable => false,
    };
    runtime
        .orchestrator
        .set_launch_at_login(enabled)
        .await
        .context("Launch-at-login update failed")?;
    println!(
        "Launch at login {}.",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Command::Run => run_awake(&config).await,
        Command::Status => show_status(&config).await,
        Command::Setup { approve } => run_setup(&config, approve).await,
        Command::Restore => run_restore(&config).await,
        Command::LoginItem { login_item_command } => {
            run_login_item(&config, login_item_command).await
        }
        Command::Helper => lidwake::helper::serve(&config.helper).await,
    }
}
