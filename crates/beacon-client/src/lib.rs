//! Single-connection TCP client for the beacon heartbeat protocol.
//!
//! The client connects, sends one payload, answers `PING` with `PONG`, and
//! runs until the server hangs up or sends `ERROR`. How the run ended is
//! reported as a [`CloseReason`], which [`exit_code`] maps to a process
//! exit status.

mod client;
mod config;
mod error;
mod exit;
mod session;

pub use client::{Client, ClientHandle, connect};
pub use config::{Cli, ClientConfig, DEFAULT_CONNECT_TIMEOUT_SECS, resolve_payload};
pub use error::{ClientError, ConfigError};
pub use exit::{EXIT_FAILURE, EXIT_SUCCESS, ErrorPolicy, exit_code};
pub use session::{CloseReason, Session};
