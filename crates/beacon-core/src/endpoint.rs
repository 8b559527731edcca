//! Remote server address.
//!
//! Endpoint format: `host:port`
//!
//! The host may be a name, an IPv4 address, or a bracketed IPv6 address
//! (`[::1]:8888`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The server a client connects to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Create a new endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The host name or address, without brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Replace the host.
    pub fn with_host(self, host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..self
        }
    }

    /// Replace the port.
    pub fn with_port(self, port: u16) -> Self {
        Self { port, ..self }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new("127.0.0.1", 8888)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| EndpointParseError::MissingPort(s.to_string()))?;

        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() {
            return Err(EndpointParseError::EmptyHost);
        }

        let port = port
            .parse()
            .map_err(|_| EndpointParseError::InvalidPort(port.to_string()))?;

        Ok(Self::new(host, port))
    }
}

impl TryFrom<String> for Endpoint {
    type Error = EndpointParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

/// Error parsing an endpoint string.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EndpointParseError {
    #[error("endpoint must be host:port, got: {0}")]
    MissingPort(String),
    #[error("endpoint host cannot be empty")]
    EmptyHost,
    #[error("invalid port: {0}")]
    InvalidPort(String),
}
