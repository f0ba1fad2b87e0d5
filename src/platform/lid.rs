use crate::capabilities::LidMonitor;
use crate::error::ControlError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Lid switch sensor reading ACPI button state files.
///
/// Emits the current state once on start, then only on changes.
pub struct AcpiLidMonitor {
    state_dir: PathBuf,
    poll_interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AcpiLidMonitor {
    pub fn new(state_dir: PathBuf, poll_interval: Duration) -> Self {
        Self {
            state_dir,
            poll_interval,
            task: Mutex::new(None),
        }
    }
}

/// `Some(true)` when the first lid switch reports closed.
fn read_lid_closed(state_dir: &Path) -> Option<bool> {
    let mut entries: Vec<PathBuf> = fs::read_dir(state_dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path().join("state"))
        .filter(|path| path.is_file())
        .collect();
    entries.sort();
    let raw = fs::read_to_string(entries.first()?).ok()?;
    let value = raw.split(':').nth(1).unwrap_or(&raw).trim();
    match value {
        "closed" => Some(true),
        "open" => Some(false),
        _ => None,
    }
}

impl LidMonitor for AcpiLidMonitor {
    fn is_supported(&self) -> bool {
        read_lid_closed(&self.state_dir).is_some()
    }

    fn start(&self) -> Result<mpsc::Receiver<bool>, ControlError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ControlError::LidMonitor(format!("no async runtime: {e}")))?;
        if !self.is_supported() {
            return Err(ControlError::LidMonitor(format!(
                "no lid switch under {}",
                self.state_dir.display()
            )));
        }

        let (tx, rx) = mpsc::channel(8);
        let state_dir = self.state_dir.clone();
        let interval = self.poll_interval;
        let handle = runtime.spawn(async move {
            let mut last = None;
            loop {
                if let Some(closed) = read_lid_closed(&state_dir)
                    && last != Some(closed)
                {
                    last = Some(closed);
                    if tx.send(closed).await.is_err() {
                        break;
                    }
                }
                tokio::time::sleep(interval).await;
            }
        });

        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
        tracing::debug!(dir = %self.state_dir.display(), "lid monitor started");
        Ok(rx)
    }

    fn stop(&self) {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
            tracing::debug!("lid monitor stopped");
        }
    }
}

impl Drop for AcpiLidMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
