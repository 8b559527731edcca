//! Protocol messages.
//!
//! A [`Message`] is a protobuf record carrying a type tag, a text payload,
//! a status code and a timestamp. The type tag decides which of the other
//! fields mean anything, but every field is carried on the wire regardless.

use crate::CodecError;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Payload of every heartbeat reply.
pub const PONG_PAYLOAD: &str = "PONG response";

/// Payload sent when the caller does not supply one.
pub const DEFAULT_PAYLOAD: &str = "Hello! This is Client.";

/// The closed set of message type tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MessageType {
    /// Application data. Observed, never answered.
    Data = 0,
    /// Heartbeat request.
    Ping = 1,
    /// Heartbeat reply.
    Pong = 2,
    /// The peer reports a failure in `status_code`.
    Error = 3,
}

impl MessageType {
    /// The tag name as it appears in logs.
    pub fn name(self) -> &'static str {
        match self {
            MessageType::Data => "DATA",
            MessageType::Ping => "PING",
            MessageType::Pong => "PONG",
            MessageType::Error => "ERROR",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A unit of protocol communication.
///
/// The type tag is kept raw so that a frame with an unrecognised tag still
/// decodes; [`Message::message_type`] reports it.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Message {
    #[prost(enumeration = "MessageType", tag = "1")]
    pub r#type: i32,
    #[prost(string, tag = "2")]
    pub payload: String,
    /// Meaningful only on `ERROR` messages.
    #[prost(int32, tag = "3")]
    pub status_code: i32,
    /// Milliseconds since the Unix epoch.
    #[prost(int64, tag = "4")]
    pub timestamp: i64,
}

impl Message {
    fn with_type(message_type: MessageType, payload: impl Into<String>) -> Self {
        Self {
            r#type: message_type.into(),
            payload: payload.into(),
            status_code: 0,
            timestamp: 0,
        }
    }

    /// A `DATA` message carrying `payload`.
    pub fn data(payload: impl Into<String>) -> Self {
        Self::with_type(MessageType::Data, payload)
    }

    /// A heartbeat request.
    pub fn ping() -> Self {
        Self::with_type(MessageType::Ping, "PING")
    }

    /// A heartbeat reply stamped with the current time.
    pub fn pong() -> Self {
        Self {
            timestamp: now_millis(),
            ..Self::with_type(MessageType::Pong, PONG_PAYLOAD)
        }
    }

    /// An `ERROR` message reporting `status_code`.
    pub fn error(status_code: i32, payload: impl Into<String>) -> Self {
        Self {
            status_code,
            ..Self::with_type(MessageType::Error, payload)
        }
    }

    /// The message's type, or [`CodecError::UnknownMessageType`] when the
    /// raw tag is outside the closed set.
    pub fn message_type(&self) -> Result<MessageType, CodecError> {
        MessageType::try_from(self.r#type).map_err(|_| CodecError::UnknownMessageType(self.r#type))
    }
}

/// Current wall-clock time in milliseconds, never zero.
fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_millis()).ok())
        .unwrap_or(1)
        .max(1)
}
