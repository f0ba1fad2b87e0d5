//! Privileged helper: the request/response contract, the unprivileged client
//! that talks to it, and the root-side server that performs the changes.

mod cleanup;
mod client;
mod pmset;
mod protocol;
mod server;
mod transport;

pub use cleanup::LegacyCleanup;
pub use client::{HelperClient, HelperTransport};
pub use pmset::{SleepDisabledParseError, parse_sleep_disabled};
pub use protocol::{CleanupReport, HelperRequest, HelperResponse};
pub use server::{PrivilegedService, serve};
pub use transport::SocketTransport;
