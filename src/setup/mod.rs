mod cooldown;
mod machine;


pub use cooldown::RepairCooldown;
pub use machine::{ApprovalOpener, SetupMachine};
