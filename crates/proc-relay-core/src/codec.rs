//! `\r\n`-delimited JSON framing.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::protocol::Message;

/// Record separator on the wire.
const DELIMITER: &[u8] = b"\r\n";

/// Framing error.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed JSON record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Splits an incoming byte stream into discrete JSON records and serializes
/// outgoing messages.
///
/// A chunk may carry zero, one, or several delimiters; partial trailing data
/// stays buffered until its delimiter arrives. Empty segments are dropped.
/// A segment that is not syntactically valid JSON is fatal for the
/// connection; a segment that is valid JSON but not a recognizable message
/// shape (missing `type`, missing required fields) is skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageCodec;

impl MessageCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, CodecError> {
        while let Some(pos) = src
            .windows(DELIMITER.len())
            .position(|window| window == DELIMITER)
        {
            let record = src.split_to(pos + DELIMITER.len());
            let segment = &record[..pos];
            if segment.is_empty() {
                continue;
            }
            match serde_json::from_slice::<Message>(segment) {
                Ok(msg) => return Ok(Some(msg)),
                Err(e) if e.is_data() => {
                    tracing::debug!("skipping unrecognized record: {e}");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = CodecError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<(), CodecError> {
        let json = serde_json::to_vec(&msg)?;
        dst.reserve(json.len() + DELIMITER.len());
        dst.put_slice(&json);
        dst.put_slice(DELIMITER);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut MessageCodec, buf: &mut BytesMut) -> Vec<Message> {
        let mut out = Vec::new();
        while let Some(msg) = codec.decode(buf).unwrap() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_multi_record_chunk() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::from(
            &b"{\"type\":\"hello\",\"send\":true}\r\n{\"type\":\"ok\"}\r\n"[..],
        );

        let msgs = decode_all(&mut codec, &mut buf);
        assert_eq!(msgs.len(), 2);
        assert!(matches!(msgs[0], Message::Hello { send: Some(true) }));
        assert!(matches!(msgs[1], Message::Ack));
    }

    #[test]
    fn test_partial_record_buffered_across_chunks() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::from(&b"{\"type\":\"hel"[..]);

        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"lo\",\"send\":false}\r\n");
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(msg, Message::Hello { send: Some(false) }));
    }

    #[test]
    fn test_empty_segments_dropped() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::from(&b"\r\n\r\n{\"type\":\"ok\"}\r\n\r\n"[..]);

        let msgs = decode_all(&mut codec, &mut buf);
        assert_eq!(msgs.len(), 1);
        assert!(matches!(msgs[0], Message::Ack));
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::from(&b"not json\r\n"[..]);

        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }

    #[test]
    fn test_unrecognized_record_skipped() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::from(&b"{\"noise\":1}\r\n{\"type\":\"ok\"}\r\n"[..]);

        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(msg, Message::Ack));
    }

    #[test]
    fn test_unknown_type_yields_unknown() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::from(&b"{\"type\":\"goodbye\"}\r\n"[..]);

        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(msg, Message::Unknown));
    }

    #[test]
    fn test_encode_appends_delimiter() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(Message::Ack, &mut buf).unwrap();
        assert_eq!(&buf[..], b"{\"type\":\"ok\"}\r\n");
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(Message::hello(true), &mut buf).unwrap();
        codec.encode(Message::error("bad"), &mut buf).unwrap();

        let msgs = decode_all(&mut codec, &mut buf);
        assert_eq!(msgs.len(), 2);
        assert!(matches!(msgs[0], Message::Hello { send: Some(true) }));
        assert!(matches!(&msgs[1], Message::Error { msg } if msg == "bad"));
    }
}
