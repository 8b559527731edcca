//! Core types for the beacon heartbeat protocol.
//!
//! This crate provides the protocol primitives: the message model, the two
//! interchangeable frame codecs, and the remote endpoint type. Connection
//! handling lives in `beacon-client`; this crate does no I/O of its own.

mod codec;
mod endpoint;
mod error;
mod message;

pub use codec::{
    BinaryCodec, Codec, CodecKind, DEFAULT_MAX_FRAME_LENGTH, TextCodec, UnknownCodecKind, WireCodec,
};
pub use endpoint::{Endpoint, EndpointParseError};
pub use error::CodecError;
pub use message::{DEFAULT_PAYLOAD, Message, MessageType, PONG_PAYLOAD};

use std::fmt;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Establishing the connection.
    Connecting,
    /// Connected; the initial payload has been handed to the codec.
    Active,
    /// Terminal. Nothing is sent or processed after this.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Connecting => "connecting",
            SessionState::Active => "active",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}
