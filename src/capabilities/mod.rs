mod traits;

pub use traits::{
    BoxFuture, LidMonitor, LocalAssertionControl, LockCapability, LoginItemControl,
    RegistrationStatus, ScreenLock, ServiceRegistry, SetupStateProvider, SystemPolicyControl,
};
