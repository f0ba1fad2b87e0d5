mod core;
mod helper;
mod lid;
mod orchestrator;
mod setup;

pub use core::Config;
pub use helper::HelperConfig;
pub use lid::LidConfig;
pub use orchestrator::OrchestratorConfig;
pub use setup::SetupConfig;
