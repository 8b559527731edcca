//! Codec error taxonomy.

use std::io;

/// Error produced while framing, encoding or decoding a [`Message`](crate::Message).
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },
    #[error("malformed length prefix: {0}")]
    Varint(#[from] unsigned_varint::decode::Error),
    #[error("malformed message body: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("failed to encode message body: {0}")]
    Encode(#[from] prost::EncodeError),
    #[error("unknown message type tag {0}")]
    UnknownMessageType(i32),
}
