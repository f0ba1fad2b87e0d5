mod intent;
mod mode;
mod session;
mod setup_state;

pub use intent::IntentState;
pub use mode::Mode;
pub use session::{CURRENT_SESSION_SCHEMA_VERSION, ManagedKey, OverrideSession, Snapshot};
pub use setup_state::SetupState;
