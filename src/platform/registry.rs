use super::utils::{is_executable, run_capture, run_checked, xml_escape};
use crate::capabilities::{RegistrationStatus, ServiceRegistry};
use crate::error::ControlError;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceManager {
    Launchd,
    Systemd,
}

impl ServiceManager {
    pub fn host() -> Self {
        if cfg!(target_os = "macos") {
            Self::Launchd
        } else {
            Self::Systemd
        }
    }

    fn default_unit_dir(self) -> PathBuf {
        match self {
            Self::Launchd => PathBuf::from("/Library/LaunchDaemons"),
            Self::Systemd => PathBuf::from("/etc/systemd/system"),
        }
    }
}

/// Registration record for the privileged helper as a system service unit.
///
/// Writing the unit registers the helper; an administrator still has to
/// enable it, which is what `RequiresApproval` reports.
pub struct UnitFileRegistry {
    manager: ServiceManager,
    label: String,
    executable: PathBuf,
    socket_path: PathBuf,
    unit_dir: PathBuf,
    /// The registering user, the only non-root caller the helper will answer.
    client_uid: u32,
}

impl UnitFileRegistry {
    pub fn new(label: &str, executable: PathBuf, socket_path: PathBuf) -> Self {
        let manager = ServiceManager::host();
        Self::with_layout(manager, label, executable, socket_path, manager.default_unit_dir())
    }

    pub fn with_layout(
        manager: ServiceManager,
        label: &str,
        executable: PathBuf,
        socket_path: PathBuf,
        unit_dir: PathBuf,
    ) -> Self {
        Self {
            manager,
            label: label.to_string(),
            executable,
            socket_path,
            unit_dir,
            client_uid: nix::unistd::getuid().as_raw(),
        }
    }

    fn unit_name(&self) -> String {
        match self.manager {
            ServiceManager::Launchd => format!("{}.plist", self.label),
            ServiceManager::Systemd => format!("{}.service", self.label),
        }
    }

    pub fn unit_file(&self) -> PathBuf {
        self.unit_dir.join(self.unit_name())
    }

    fn render_unit(&self) -> String {
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
    <string>helper</string>
  </array>
  <key>EnvironmentVariables</key>
  <dict>
    <key>LIDWAKE_HELPER_SOCKET</key>
    <string>{socket}</string>
    <key>LIDWAKE_HELPER_ALLOWED_UIDS</key>
    <string>{uid}</string>
  </dict>
  <key>RunAtLoad</key>
  <true/>
  <key>KeepAlive</key>
  <true/>
</dict>
</plist>
"#,
                label = xml_escape(&self.label),
                exe = xml_escape(&self.executable.display().to_string()),
                socket = xml_escape(&self.socket_path.display().to_string()),
                uid = self.client_uid,
            ),
            ServiceManager::Systemd => format!(
                "[Unit]\nDescription=lidwake privileged helper\n\n[Service]\nType=simple\nEnvironment=LIDWAKE_HELPER_SOCKET={socket}\nEnvironment=LIDWAKE_HELPER_ALLOWED_UIDS={uid}\nExecStart={exe} helper\nRestart=always\nRestartSec=3\n\n[Install]\nWantedBy=multi-user.target\n",
                socket = self.socket_path.display(),
                exe = self.executable.display(),
                uid = self.client_uid,
            ),
        }
    }

    fn is_enabled(&self) -> bool {
        let check = match self.manager {
            ServiceManager::Launchd => run_capture(
                Command::new("launchctl")
                    .arg("print")
                    .arg(format!("system/{}", self.label)),
            ),
            ServiceManager::Systemd => run_capture(
                Command::new("systemctl")
                    .arg("is-enabled")
                    .arg(self.unit_name()),
            ),
        };
        match check {
            Ok((ok, text)) => match self.manager {
                ServiceManager::Launchd => ok,
                ServiceManager::Systemd => ok && text.trim() == "enabled",
            },
            Err(error) => {
                tracing::debug!(%error, "service manager query failed");
                false
            }
        }
    }

    /// Best-effort activation; failure leaves the unit awaiting approval.
    fn activate(&self, unit_file: &Path) {
        let result = match self.manager {
            ServiceManager::Launchd => run_checked(
                Command::new("launchctl")
                    .arg("bootstrap")
                    .arg("system")
                    .arg(unit_file),
            ),
            ServiceManager::Systemd => {
                run_checked(Command::new("systemctl").arg("daemon-reload"))
            }
        };
        if let Err(error) = result {
            tracing::debug!(%error, "helper activation deferred to administrator");
        }
    }

    fn deactivate(&self) {
        let result = match self.manager {
            ServiceManager::Launchd => run_checked(
                Command::new("launchctl")
                    .arg("bootout")
                    .arg(format!("system/{}", self.label)),
            ),
            ServiceManager::Systemd => run_checked(
                Command::new("systemctl")
                    .args(["disable", "--now"])
                    .arg(self.unit_name()),
            ),
        };
        if let Err(error) = result {
            tracing::debug!(%error, "helper deactivation skipped");
        }
    }

    /// What an administrator runs to approve the helper.
    pub fn approval_hint(&self) -> String {
        match self.manager {
            ServiceManager::Launchd => format!(
                "sudo launchctl bootstrap system {}",
                self.unit_file().display()
            ),
            ServiceManager::Systemd => {
                format!("sudo systemctl enable --now {}", self.unit_name())
            }
        }
    }
}

impl ServiceRegistry for UnitFileRegistry {
    fn status(&self) -> RegistrationStatus {
        if !self.unit_file().is_file() {
            return RegistrationStatus::NotRegistered;
        }
        if !is_executable(&self.executable) {
            return RegistrationStatus::NotFound;
        }
        if self.is_enabled() {
            RegistrationStatus::Enabled
        } else {
            RegistrationStatus::RequiresApproval
        }
    }

    fn register(&self) -> Result<(), ControlError> {
        if !is_executable(&self.executable) {
            return Err(ControlError::Registration(format!(
                "helper executable {} is missing",
                self.executable.display()
            )));
        }
        let file = self.unit_file();
        fs::create_dir_all(&self.unit_dir)
            .and_then(|()| fs::write(&file, self.render_unit()))
            .map_err(|e| {
                ControlError::Registration(format!("could not write {}: {e}", file.display()))
            })?;
        tracing::info!(unit = %file.display(), "helper unit installed");
        self.activate(&file);
        Ok(())
    }

    fn unregister(&self) -> Result<(), ControlError> {
        self.deactivate();
        let file = self.unit_file();
        match fs::remove_file(&file) {
            Ok(()) => {
                tracing::info!(unit = %file.display(), "helper unit removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ControlError::Registration(format!(
                "could not remove {}: {e}",
                file.display()
            ))),
        }
    }
}

/// Opens the settings pane where background items are approved.
pub fn open_approval_settings(hint: &str) {
    if cfg!(target_os = "macos") {
        let opened = run_checked(
            Command::new("open").arg("x-apple.systempreferences:com.apple.LoginItems-Settings.extension"),
        );
        if let Err(error) = opened {
            tracing::warn!(%error, "could not open Login Items settings");
        }
    }
    tracing::info!(command = hint, "approve the privileged helper");
}
