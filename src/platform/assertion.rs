use crate::capabilities::LocalAssertionControl;
use crate::error::ControlError;
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, PoisonError};

/// Local sleep assertion held by a long-running child process.
///
/// The assertion lives exactly as long as the child: `caffeinate -di` on
/// macOS, `systemd-inhibit` wrapping `tail --pid` elsewhere. Both default
/// commands watch this process id and exit with it, and dropping the value
/// kills the child.
pub struct InhibitAssertion {
    argv: Vec<String>,
    child: Mutex<Option<Child>>,
}

impl InhibitAssertion {
    pub fn new() -> Self {
        Self::with_command(default_command())
    }

    pub fn with_command(argv: Vec<String>) -> Self {
        Self {
            argv,
            child: Mutex::new(None),
        }
    }

    fn spawn(&self) -> Result<Child, ControlError> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| ControlError::LocalAssertion("no inhibitor command configured".into()))?;
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ControlError::LocalAssertion(format!("could not start {program}: {e}")))
    }
}

fn default_command() -> Vec<String> {
    let pid = std::process::id().to_string();
    let argv: Vec<&str> = if cfg!(target_os = "macos") {
        vec!["/usr/bin/caffeinate", "-di", "-w", pid.as_str()]
    } else {
        vec![
            "systemd-inhibit",
            "--what=idle:sleep",
            "--who=lidwake",
            "--why=Full Awake",
            "--mode=block",
            "tail",
            "--pid",
            pid.as_str(),
            "-f",
            "/dev/null",
        ]
    };
    argv.into_iter().map(str::to_string).collect()
}

fn stop_child(child: &mut Child) -> std::io::Result<()> {
    if child.try_wait()?.is_none() {
        child.kill()?;
    }
    child.wait()?;
    Ok(())
}

/// Stop the child in `slot`, keeping the handle when stopping fails so the
/// read-back still sees it.
fn release_with(
    slot: &mut Option<Child>,
    stop: impl FnOnce(&mut Child) -> std::io::Result<()>,
) -> std::io::Result<()> {
    if let Some(child) = slot.as_mut() {
        stop(child)?;
        *slot = None;
    }
    Ok(())
}

impl LocalAssertionControl for InhibitAssertion {
    fn set_enabled(&self, enabled: bool) -> Result<(), ControlError> {
        let mut guard = self.child.lock().unwrap_or_else(PoisonError::into_inner);

        if enabled {
            if let Some(child) = guard.as_mut()
                && matches!(child.try_wait(), Ok(None))
            {
                return Ok(());
            }
            let child = self.spawn()?;
            tracing::debug!(pid = child.id(), "local sleep assertion acquired");
            *guard = Some(child);
            return Ok(());
        }

        if guard.is_some() {
            release_with(&mut guard, stop_child).map_err(|e| {
                ControlError::LocalAssertion(format!("could not release sleep assertion: {e}"))
            })?;
            tracing::debug!("local sleep assertion released");
        }
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        let mut guard = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        let alive = guard
            .as_mut()
            .is_some_and(|child| matches!(child.try_wait(), Ok(None)));
        if !alive && guard.is_some() {
            tracing::warn!("sleep assertion process exited on its own");
            *guard = None;
        }
        alive
    }
}

impl Drop for InhibitAssertion {
    fn drop(&mut self) {
        let slot = self.child.get_mut().unwrap_or_else(PoisonError::into_inner);
        release_with(slot, stop_child).ok();
    }
}
