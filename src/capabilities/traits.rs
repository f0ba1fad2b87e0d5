use crate::domain::{SetupState, Snapshot};
use crate::error::ControlError;
use crate::helper::CleanupReport;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// In-process sleep assertion, effective only while the lid is open.
///
/// Implementations own the underlying handle; `is_enabled` is an authoritative
/// read-back, not a cached echo of the last request.
pub trait LocalAssertionControl: Send + Sync {
    fn set_enabled(&self, enabled: bool) -> Result<(), ControlError>;

    fn is_enabled(&self) -> bool;
}

/// Machine-wide sleep policy, reachable only through the privileged helper.
pub trait SystemPolicyControl: Send + Sync {
    fn set_enabled(&self, enabled: bool) -> BoxFuture<'_, Result<(), ControlError>>;

    fn read_current_value(&self) -> BoxFuture<'_, Result<bool, ControlError>>;

    /// Read the managed values once so they can be put back later.
    fn capture_baseline(&self) -> BoxFuture<'_, Result<Snapshot, ControlError>>;

    fn restore<'a>(&'a self, snapshot: &'a Snapshot) -> BoxFuture<'a, Result<(), ControlError>>;

    fn cleanup_legacy_artifacts(&self) -> BoxFuture<'_, Result<CleanupReport, ControlError>>;
}

/// Establishes and inspects the privileged helper's registration.
pub trait SetupStateProvider: Send + Sync {
    /// Inspect only; never mutates registration.
    fn refresh_status(&self) -> BoxFuture<'_, SetupState>;

    /// Inspect and try to reach `Ready`.
    fn start_setup(&self) -> BoxFuture<'_, SetupState>;

    fn open_approval_ui(&self);
}

/// Registration record status as reported by the OS service manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum RegistrationStatus {
    NotRegistered,
    RequiresApproval,
    Enabled,
    NotFound,
}

/// The OS service manager holding the helper's registration record.
pub trait ServiceRegistry: Send + Sync {
    fn status(&self) -> RegistrationStatus;

    fn register(&self) -> Result<(), ControlError>;

    fn unregister(&self) -> Result<(), ControlError>;
}

/// Lid hardware sensor. `start` yields `true` for closed, `false` for open.
pub trait LidMonitor: Send + Sync {
    fn is_supported(&self) -> bool;

    fn start(&self) -> Result<mpsc::Receiver<bool>, ControlError>;

    fn stop(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockCapability {
    Supported,
    Unsupported(String),
}

impl LockCapability {
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported)
    }
}

pub trait ScreenLock: Send + Sync {
    fn capability(&self) -> LockCapability;

    fn lock_now(&self) -> BoxFuture<'_, Result<(), ControlError>>;
}

pub trait LoginItemControl: Send + Sync {
    fn set_enabled(&self, enabled: bool) -> Result<(), ControlError>;

    fn read_enabled(&self) -> bool;
}
