#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod capabilities;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod helper;
pub mod orchestrator;
pub mod override_session;
pub mod platform;
pub mod setup;
pub mod store;
#[doc(hidden)]
pub mod util;

pub use config::Config;
pub use orchestrator::{Collaborators, Orchestrator, StatusSnapshot};
