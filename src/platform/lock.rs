use super::utils::is_executable;
use crate::capabilities::{BoxFuture, LockCapability, ScreenLock};
use crate::error::ControlError;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Locks the screen by running the first configured command that succeeds.
pub struct CommandScreenLock {
    commands: Vec<Vec<String>>,
}

impl CommandScreenLock {
    pub fn new(commands: Vec<Vec<String>>) -> Self {
        Self { commands }
    }

    fn available(&self) -> impl Iterator<Item = &[String]> {
        self.commands
            .iter()
            .filter(|argv| argv.first().is_some_and(|p| is_executable(Path::new(p))))
            .map(Vec::as_slice)
    }

    async fn run_first(&self) -> Result<(), ControlError> {
        let mut last_error = String::from("No screen lock command is available.");
        for argv in self.available() {
            let Some((program, args)) = argv.split_first() else {
                continue;
            };
            let status = Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
            match status {
                Ok(status) if status.success() => {
                    tracing::info!(command = %program, "screen locked");
                    return Ok(());
                }
                Ok(status) => last_error = format!("{program} exited with {status}"),
                Err(e) => last_error = format!("{program}: {e}"),
            }
            tracing::debug!(error = %last_error, "screen lock command failed");
        }
        Err(ControlError::ScreenLock(last_error))
    }
}

impl ScreenLock for CommandScreenLock {
    fn capability(&self) -> LockCapability {
        if self.available().next().is_some() {
            LockCapability::Supported
        } else {
            LockCapability::Unsupported("No screen lock command is available.".into())
        }
    }

    fn lock_now(&self) -> BoxFuture<'_, Result<(), ControlError>> {
        Box::pin(self.run_first())
    }
}
