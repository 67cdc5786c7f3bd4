//! REST surface consumed by the dashboard UI.

pub mod handlers;
pub mod pid_file;
pub mod server;

pub use pid_file::{ProcessStatus, ServerPidFile, ServerPidInfo};
pub use server::{AppState, DEFAULT_PORT, find_available_port, router, start_server};
