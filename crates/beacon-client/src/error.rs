//! Client error types.

use beacon_core::{CodecError, Endpoint};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Failure while establishing or driving the connection.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: Endpoint,
        #[source]
        source: io::Error,
    },
    #[error("timed out connecting to {endpoint} after {timeout:?}")]
    ConnectTimeout { endpoint: Endpoint, timeout: Duration },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("session task ended without reporting an outcome")]
    Aborted,
}

/// Failure while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}
