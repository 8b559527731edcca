//! Client configuration.
//!
//! Values come from three layers, later ones winning: built-in defaults, an
//! optional TOML file, then command-line flags (or their environment
//! variables).
//!
//! ```toml
//! server = "127.0.0.1:8888"
//! codec = "binary"
//! connect_timeout_secs = 10
//! max_frame_length = 16777216
//! on_error_message = "clean"
//! ```

use crate::{ConfigError, ErrorPolicy};
use beacon_core::{CodecKind, DEFAULT_MAX_FRAME_LENGTH, DEFAULT_PAYLOAD, Endpoint};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default bound on establishing the connection.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Command-line interface of the `beacon-client` binary.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Connect to a beacon server, send one payload and answer heartbeats until the server hangs up"
)]
pub struct Cli {
    /// Payload to send once connected.
    pub payload: Option<String>,

    /// TOML config file.
    #[arg(long, env = "BEACON_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Server host.
    #[arg(long, env = "BEACON_HOST")]
    pub host: Option<String>,

    /// Server port.
    #[arg(long, env = "BEACON_PORT")]
    pub port: Option<u16>,

    /// Wire encoding: `binary` (varint-framed protobuf) or `text`.
    #[arg(long, env = "BEACON_CODEC", value_name = "CODEC")]
    pub codec: Option<CodecKind>,

    /// Give up connecting after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u64>,

    /// Largest binary frame body accepted or sent.
    #[arg(long, value_name = "BYTES")]
    pub max_frame_length: Option<usize>,

    /// Exit status when the server closes the session with an ERROR message.
    #[arg(long, value_enum)]
    pub on_error_message: Option<ErrorPolicy>,
}

impl Cli {
    /// Build the effective configuration: defaults, then the config file,
    /// then flags.
    pub fn resolve(&self) -> Result<ClientConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)?,
            None => ClientConfig::default(),
        };

        if let Some(host) = &self.host {
            config.server = config.server.with_host(host.clone());
        }
        if let Some(port) = self.port {
            config.server = config.server.with_port(port);
        }
        if let Some(codec) = self.codec {
            config.codec = codec;
        }
        if let Some(secs) = self.connect_timeout {
            config.connect_timeout_secs = secs;
        }
        if let Some(max) = self.max_frame_length {
            config.max_frame_length = max;
        }
        if let Some(policy) = self.on_error_message {
            config.on_error_message = policy;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Effective client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Server to connect to.
    pub server: Endpoint,
    /// Framing strategy.
    pub codec: CodecKind,
    pub connect_timeout_secs: u64,
    /// Only applies to binary framing.
    pub max_frame_length: usize,
    pub on_error_message: ErrorPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: Endpoint::default(),
            codec: CodecKind::default(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            on_error_message: ErrorPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Parse and validate TOML config text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid("connect_timeout_secs must be at least 1"));
        }
        if self.max_frame_length == 0 {
            return Err(ConfigError::Invalid("max_frame_length must be at least 1"));
        }
        Ok(())
    }
}

/// The payload to send: the caller's argument, or [`DEFAULT_PAYLOAD`].
pub fn resolve_payload(arg: Option<String>) -> String {
    match arg {
        Some(payload) => {
            tracing::info!(%payload, "using provided payload");
            payload
        }
        None => {
            tracing::warn!(
                payload = DEFAULT_PAYLOAD,
                "payload argument not provided, using default"
            );
            DEFAULT_PAYLOAD.to_string()
        }
    }
}
