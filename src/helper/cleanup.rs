use super::protocol::CleanupReport;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// Backs up and removes files left behind by older installs.
///
/// Every existing path is copied into a timestamped directory under
/// `backup_root` before it is deleted; missing paths are skipped silently.
pub struct LegacyCleanup {
    paths: Vec<PathBuf>,
    backup_root: PathBuf,
}

impl LegacyCleanup {
    pub fn new(paths: Vec<PathBuf>, backup_root: PathBuf) -> Self {
        Self { paths, backup_root }
    }

    pub fn run(&self, now: DateTime<Utc>) -> Result<CleanupReport> {
        let backup_dir = self
            .backup_root
            .join(now.format("%Y%m%d-%H%M%S").to_string());
        fs::create_dir_all(&backup_dir)
            .with_context(|| format!("Failed to create {}", backup_dir.display()))?;

        let mut report = CleanupReport {
            backup_directory: backup_dir.display().to_string(),
            ..CleanupReport::default()
        };

        for path in &self.paths {
            if !path.exists() {
                continue;
            }
            if !path.is_file() {
                report
                    .skipped_paths
                    .push(format!("{} (skipped: not a regular file)", path.display()));
                continue;
            }
            backup(path, &backup_dir)?;
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            tracing::info!(path = %path.display(), "removed legacy artifact");
            report.cleaned_paths.push(path.display().to_string());
        }

        Ok(report)
    }
}

fn backup(path: &Path, backup_dir: &Path) -> Result<()> {
    let relative = path.strip_prefix("/").unwrap_or(path);
    let destination = backup_dir.join(relative);
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(path, &destination).with_context(|| {
        format!(
            "Failed to back up {} to {}",
            path.display(),
            destination.display()
        )
    })?;
    Ok(())
}
