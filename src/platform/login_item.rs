use super::registry::ServiceManager;
use super::utils::{run_checked, xml_escape};
use crate::capabilities::LoginItemControl;
use crate::error::ControlError;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::process::Command;

/// Starts `lidwake run` at login via a per-user launchd agent or systemd user unit.
pub struct LaunchAgentLoginItem {
    manager: ServiceManager,
    label: String,
    executable: PathBuf,
    agent_dir: PathBuf,
    activate: bool,
}

impl LaunchAgentLoginItem {
    pub fn new(label: &str, executable: PathBuf) -> Result<Self> {
        let home = directories::UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let manager = ServiceManager::host();
        let agent_dir = match manager {
            ServiceManager::Launchd => home.join("Library").join("LaunchAgents"),
            ServiceManager::Systemd => home.join(".config").join("systemd").join("user"),
        };
        Ok(Self {
            manager,
            label: label.to_string(),
            executable,
            agent_dir,
            activate: true,
        })
    }

    /// Agent files only; never calls the service manager.
    pub fn in_dir(manager: ServiceManager, label: &str, executable: PathBuf, agent_dir: PathBuf) -> Self {
        Self {
            manager,
            label: label.to_string(),
            executable,
            agent_dir,
            activate: false,
        }
    }

    fn unit_name(&self) -> String {
        match self.manager {
            ServiceManager::Launchd => format!("{}.plist", self.label),
            ServiceManager::Systemd => format!("{}.service", self.label),
        }
    }

    pub fn agent_file(&self) -> PathBuf {
        self.agent_dir.join(self.unit_name())
    }

    fn render(&self) -> String {
        match self.manager {
            ServiceManager::Launchd => format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>Label</key>
  <string>{label}</string>
  <key>ProgramArguments</key>
  <array>
    <string>{exe}</string>
    <string>run</string>
  </array>
  <key>RunAtLoad</key>
  <true/>
</dict>
</plist>
"#,
                label = xml_escape(&self.label),
                exe = xml_escape(&self.executable.display().to_string()),
            ),
            ServiceManager::Systemd => format!(
                "[Unit]\nDescription=lidwake keep-awake session\n\n[Service]\nType=simple\nExecStart={} run\n\n[Install]\nWantedBy=default.target\n",
                self.executable.display()
            ),
        }
    }

    fn install(&self) -> Result<()> {
        fs::create_dir_all(&self.agent_dir)
            .with_context(|| format!("Failed to create {}", self.agent_dir.display()))?;
        let file = self.agent_file();
        fs::write(&file, self.render())
            .with_context(|| format!("Failed to write {}", file.display()))?;
        if self.activate && self.manager == ServiceManager::Systemd {
            run_checked(Command::new("systemctl").args(["--user", "daemon-reload"]))?;
            run_checked(
                Command::new("systemctl")
                    .args(["--user", "enable"])
                    .arg(self.unit_name()),
            )?;
        }
        Ok(())
    }

    fn uninstall(&self) -> Result<()> {
        if self.activate && self.manager == ServiceManager::Systemd {
            let _ = run_checked(
                Command::new("systemctl")
                    .args(["--user", "disable"])
                    .arg(self.unit_name()),
            );
        }
        let file = self.agent_file();
        if file.exists() {
            fs::remove_file(&file)
                .with_context(|| format!("Failed to remove {}", file.display()))?;
        }
        Ok(())
    }
}

impl LoginItemControl for LaunchAgentLoginItem {
    fn set_enabled(&self, enabled: bool) -> Result<(), ControlError> {
        let result = if enabled { self.install() } else { self.uninstall() };
        result.map_err(|e| ControlError::LoginItem(format!("{e:#}")))?;
        tracing::info!(enabled, agent = %self.agent_file().display(), "login item updated");
        Ok(())
    }

    fn read_enabled(&self) -> bool {
        self.agent_file().is_file()
    }
}
