//! Concrete collaborators backed by the host operating system.

mod assertion;
mod lid;
mod lock;
mod login_item;
mod policy;
mod registry;
mod utils;

pub use assertion::InhibitAssertion;
pub use lid::AcpiLidMonitor;
pub use lock::CommandScreenLock;
pub use login_item::LaunchAgentLoginItem;
pub use policy::HelperPolicy;
pub use registry::{ServiceManager, UnitFileRegistry, open_approval_settings};
