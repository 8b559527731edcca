//! Frame codecs.
//!
//! Two interchangeable strategies turn a byte stream into [`Message`]s:
//!
//! - [`BinaryCodec`]: `[varint body length][protobuf body]`, one frame per
//!   message.
//! - [`TextCodec`]: no framing at all; whatever a single read delivers is
//!   one message, and a write is the raw payload.
//!
//! Both implement the `tokio_util` codec traits, so either can be handed
//! to `Framed`. [`Codec`] picks one at runtime.

use crate::{CodecError, Message, MessageType};
use bytes::{Buf, BufMut, BytesMut};
use prost::Message as _;
use std::fmt;
use std::str::FromStr;
use tokio_util::codec::{Decoder, Encoder};
use unsigned_varint::{decode, encode};

/// Default upper bound on a single frame body (16 MiB).
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

/// Literal written in reply to a text-mode heartbeat.
const TEXT_PONG: &[u8] = b"PONG\n";

/// A codec that frames [`Message`]s in both directions.
pub trait WireCodec:
    Decoder<Item = Message, Error = CodecError> + Encoder<Message, Error = CodecError>
{
}

impl<T> WireCodec for T where
    T: Decoder<Item = Message, Error = CodecError> + Encoder<Message, Error = CodecError>
{
}

/// Varint length-prefixed protobuf framing.
#[derive(Debug, Clone)]
pub struct BinaryCodec {
    max_frame_length: usize,
    /// Body length of a frame whose prefix has been consumed but whose body
    /// has not fully arrived.
    pending_len: Option<usize>,
}

impl BinaryCodec {
    /// Create a codec that refuses frames longer than `max_frame_length`.
    pub fn new(max_frame_length: usize) -> Self {
        Self {
            max_frame_length,
            pending_len: None,
        }
    }

    fn check_length(&self, len: usize) -> Result<(), CodecError> {
        if len > self.max_frame_length {
            return Err(CodecError::FrameTooLarge {
                len,
                max: self.max_frame_length,
            });
        }
        Ok(())
    }

    /// Consume the length prefix, once enough bytes are buffered.
    fn decode_prefix(&mut self, src: &mut BytesMut) -> Result<Option<usize>, CodecError> {
        if let Some(len) = self.pending_len {
            return Ok(Some(len));
        }

        let (len, consumed) = match decode::usize(&src[..]) {
            Ok((len, rest)) => (len, src.len() - rest.len()),
            Err(decode::Error::Insufficient) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        // must be rejected before any space is reserved for the body
        self.check_length(len)?;

        src.advance(consumed);
        self.pending_len = Some(len);
        Ok(Some(len))
    }
}

impl Default for BinaryCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LENGTH)
    }
}

impl Decoder for BinaryCodec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(len) = self.decode_prefix(src)? else {
            return Ok(None);
        };

        if src.len() < len {
            src.reserve(len - src.len());
            return Ok(None);
        }

        self.pending_len = None;
        let body = src.split_to(len).freeze();
        tracing::trace!(len, "decoded frame");
        Ok(Some(Message::decode(body)?))
    }
}

impl Encoder<Message> for BinaryCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let len = item.encoded_len();
        self.check_length(len)?;

        let mut prefix = encode::usize_buffer();
        let prefix = encode::usize(len, &mut prefix);
        dst.reserve(prefix.len() + len);
        dst.put_slice(prefix);
        item.encode(dst)?;
        Ok(())
    }
}

/// Unframed text. Each read event yields one message.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl TextCodec {
    pub fn new() -> Self {
        Self
    }

    /// Classify a chunk of text. Only a bare `PING` is a heartbeat request.
    fn classify(text: &str) -> MessageType {
        if text.trim().eq_ignore_ascii_case("PING") {
            MessageType::Ping
        } else {
            MessageType::Data
        }
    }
}

impl Decoder for TextCodec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let chunk = src.split();
        let payload = String::from_utf8_lossy(&chunk).into_owned();
        Ok(Some(Message {
            r#type: Self::classify(&payload).into(),
            payload,
            ..Message::default()
        }))
    }
}

impl Encoder<Message> for TextCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item.message_type() {
            Ok(MessageType::Pong) => dst.put_slice(TEXT_PONG),
            _ => dst.put_slice(item.payload.as_bytes()),
        }
        Ok(())
    }
}

/// Which framing strategy to speak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    #[default]
    Binary,
    Text,
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecKind::Binary => f.write_str("binary"),
            CodecKind::Text => f.write_str("text"),
        }
    }
}

impl FromStr for CodecKind {
    type Err = UnknownCodecKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" => Ok(CodecKind::Binary),
            "text" => Ok(CodecKind::Text),
            _ => Err(UnknownCodecKind(s.to_string())),
        }
    }
}

/// Error parsing a [`CodecKind`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown codec {0:?}, expected \"binary\" or \"text\"")]
pub struct UnknownCodecKind(String);

/// A framing strategy chosen at runtime.
#[derive(Debug, Clone)]
pub enum Codec {
    Binary(BinaryCodec),
    Text(TextCodec),
}

impl Codec {
    /// Build the strategy named by `kind`. `max_frame_length` only applies
    /// to binary framing.
    pub fn new(kind: CodecKind, max_frame_length: usize) -> Self {
        match kind {
            CodecKind::Binary => Codec::Binary(BinaryCodec::new(max_frame_length)),
            CodecKind::Text => Codec::Text(TextCodec::new()),
        }
    }

    pub fn kind(&self) -> CodecKind {
        match self {
            Codec::Binary(_) => CodecKind::Binary,
            Codec::Text(_) => CodecKind::Text,
        }
    }
}

impl Decoder for Codec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self {
            Codec::Binary(codec) => codec.decode(src),
            Codec::Text(codec) => codec.decode(src),
        }
    }
}

impl Encoder<Message> for Codec {
    type Error = CodecError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match self {
            Codec::Binary(codec) => codec.encode(item, dst),
            Codec::Text(codec) => codec.encode(item, dst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(msg: &Message) -> BytesMut {
        let mut buf = BytesMut::new();
        BinaryCodec::default().encode(msg.clone(), &mut buf).unwrap();
        buf
    }

    fn samples() -> Vec<Message> {
        vec![
            Message::data(""),
            Message::data("Hello! This is Client."),
            Message::ping(),
            Message::pong(),
            Message::error(42, "bad request"),
            Message::error(-1, ""),
            Message {
                r#type: MessageType::Data.into(),
                payload: "x".repeat(300),
                status_code: 7,
                timestamp: i64::MAX,
            },
        ]
    }

    #[test]
    fn binary_roundtrip() {
        for msg in samples() {
            let mut buf = encoded(&msg);
            let decoded = BinaryCodec::default().decode(&mut buf).unwrap();
            assert_eq!(decoded, Some(msg));
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn binary_prefix_is_body_length() {
        let msg = Message::data("abc");
        let buf = encoded(&msg);
        assert_eq!(buf[0] as usize, msg.encoded_len());
        assert_eq!(buf.len(), 1 + msg.encoded_len());
    }

    #[test]
    fn binary_split_at_every_boundary() {
        for msg in samples() {
            let whole = encoded(&msg);
            for split in 0..=whole.len() {
                let mut codec = BinaryCodec::default();
                let mut buf = BytesMut::from(&whole[..split]);
                let first = codec.decode(&mut buf).unwrap();
                if split < whole.len() {
                    assert_eq!(first, None, "split at {split}");
                    buf.extend_from_slice(&whole[split..]);
                    assert_eq!(codec.decode(&mut buf).unwrap(), Some(msg.clone()));
                } else {
                    assert_eq!(first, Some(msg.clone()));
                }
            }
        }
    }

    #[test]
    fn binary_byte_at_a_time() {
        let msg = Message::data("y".repeat(200));
        let whole = encoded(&msg);
        let mut codec = BinaryCodec::default();
        let mut buf = BytesMut::new();
        let mut out = Vec::new();
        for byte in whole.iter() {
            buf.put_u8(*byte);
            if let Some(m) = codec.decode(&mut buf).unwrap() {
                out.push(m);
            }
        }
        assert_eq!(out, vec![msg]);
    }

    #[test]
    fn binary_back_to_back_frames_keep_order() {
        let mut buf = BytesMut::new();
        let mut codec = BinaryCodec::default();
        codec.encode(Message::ping(), &mut buf).unwrap();
        codec.encode(Message::data("one"), &mut buf).unwrap();
        codec.encode(Message::error(3, "two"), &mut buf).unwrap();

        let first = codec.decode(&mut buf).unwrap().unwrap();
        let second = codec.decode(&mut buf).unwrap().unwrap();
        let third = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.message_type().unwrap(), MessageType::Ping);
        assert_eq!(second.payload, "one");
        assert_eq!(third.status_code, 3);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn binary_rejects_oversized_prefix() {
        let mut codec = BinaryCodec::new(16);
        let mut prefix = encode::usize_buffer();
        let mut buf = BytesMut::from(encode::usize(17, &mut prefix));
        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::FrameTooLarge { len: 17, max: 16 })
        ));
    }

    #[test]
    fn binary_refuses_to_encode_oversized() {
        let mut codec = BinaryCodec::new(4);
        let mut buf = BytesMut::new();
        assert!(matches!(
            codec.encode(Message::data("far too long"), &mut buf),
            Err(CodecError::FrameTooLarge { .. })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn binary_rejects_overlong_varint() {
        let mut buf = BytesMut::from(&[0xffu8; 11][..]);
        assert!(matches!(
            BinaryCodec::default().decode(&mut buf),
            Err(CodecError::Varint(_))
        ));
    }

    #[test]
    fn binary_rejects_garbage_body() {
        // length 2, then a field header with wire type 7 (invalid)
        let mut buf = BytesMut::from(&[0x02u8, 0x0f, 0x00][..]);
        assert!(matches!(
            BinaryCodec::default().decode(&mut buf),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn binary_keeps_unknown_type_tag() {
        let msg = Message {
            r#type: 12,
            ..Message::data("future")
        };
        let mut buf = encoded(&msg);
        let decoded = BinaryCodec::default().decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.r#type, 12);
        assert!(matches!(
            decoded.message_type(),
            Err(CodecError::UnknownMessageType(12))
        ));
    }

    #[test]
    fn binary_truncated_frame_at_eof_is_an_error() {
        let whole = encoded(&Message::data("cut short"));
        let mut buf = BytesMut::from(&whole[..whole.len() - 2]);
        assert!(BinaryCodec::default().decode_eof(&mut buf).is_err());
    }

    #[test]
    fn text_classifies_ping() {
        for raw in ["PING", "ping\n", "  Ping \r\n"] {
            let mut buf = BytesMut::from(raw);
            let msg = TextCodec.decode(&mut buf).unwrap().unwrap();
            assert_eq!(msg.message_type().unwrap(), MessageType::Ping, "{raw:?}");
            assert_eq!(msg.payload, raw);
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn text_anything_else_is_data() {
        for raw in ["hello", "PING PONG", "PONG\n", "pingpong"] {
            let mut buf = BytesMut::from(raw);
            let msg = TextCodec.decode(&mut buf).unwrap().unwrap();
            assert_eq!(msg.message_type().unwrap(), MessageType::Data, "{raw:?}");
        }
    }

    #[test]
    fn text_empty_buffer_yields_nothing() {
        let mut buf = BytesMut::new();
        assert_eq!(TextCodec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn text_encodes_raw_payload_and_literal_pong() {
        let mut buf = BytesMut::new();
        TextCodec.encode(Message::data("ping-test"), &mut buf).unwrap();
        assert_eq!(&buf[..], b"ping-test");

        buf.clear();
        TextCodec.encode(Message::pong(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"PONG\n");
    }

    #[test]
    fn codec_kind_parses() {
        assert_eq!("binary".parse::<CodecKind>().unwrap(), CodecKind::Binary);
        assert_eq!("TEXT".parse::<CodecKind>().unwrap(), CodecKind::Text);
        assert!("json".parse::<CodecKind>().is_err());
        assert_eq!(Codec::new(CodecKind::Text, 0).kind(), CodecKind::Text);
    }
}
