pub mod schema;

pub use schema::{Config, HelperConfig, LidConfig, OrchestratorConfig, SetupConfig};
