//! Channel framing.
//!
//! # Wire format
//!
//! ```text
//! META:<json>    text    begin an inbound file: {id, name, size}
//! <raw bytes>    binary  one chunk of the file currently in flight
//! EOF            text    terminates the current file (exact literal)
//! MSG:<json>     text    discrete chat entry: {kind, text}
//! ```
//!
//! The text sub-kinds are told apart by a fixed literal prefix matched
//! before any JSON parse; `EOF` is an exact-equality check. There is no
//! version field and no checksum; integrity relies on the transport's
//! ordered, reliable delivery within one channel lifetime.

use crate::ProtocolError;
use crate::chat::ChatPayload;
use crate::types::TransferMeta;

/// Prefix of a file-metadata frame.
pub const META_PREFIX: &str = "META:";

/// Prefix of a chat-message frame.
pub const MSG_PREFIX: &str = "MSG:";

/// End-of-file marker, matched as an exact literal.
pub const EOF_LITERAL: &str = "EOF";

/// A frame as seen by the transport: either a text frame or raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFrame {
    Text(String),
    Binary(Vec<u8>),
}

impl WireFrame {
    /// Payload length in bytes, used for flow-control accounting.
    pub fn byte_len(&self) -> usize {
        match self {
            WireFrame::Text(s) => s.len(),
            WireFrame::Binary(b) => b.len(),
        }
    }
}

/// A decoded channel frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Begins an inbound file; resets receiver accumulation for that id.
    Meta(TransferMeta),
    /// One chunk of the file currently being received, in arrival order.
    Chunk(Vec<u8>),
    /// Terminates the current file.
    Eof,
    /// A chat entry, independent of any file transfer.
    Msg(ChatPayload),
}

impl Frame {
    /// Decodes a transport frame into the channel vocabulary.
    pub fn decode(wire: WireFrame) -> Result<Self, ProtocolError> {
        match wire {
            WireFrame::Binary(data) => Ok(Frame::Chunk(data)),
            WireFrame::Text(text) => {
                if text == EOF_LITERAL {
                    return Ok(Frame::Eof);
                }
                if let Some(json) = text.strip_prefix(META_PREFIX) {
                    let meta = serde_json::from_str(json)
                        .map_err(|source| ProtocolError::MalformedFrame {
                            kind: "META",
                            source,
                        })?;
                    return Ok(Frame::Meta(meta));
                }
                if let Some(json) = text.strip_prefix(MSG_PREFIX) {
                    let payload = serde_json::from_str(json)
                        .map_err(|source| ProtocolError::MalformedFrame {
                            kind: "MSG",
                            source,
                        })?;
                    return Ok(Frame::Msg(payload));
                }
                Err(ProtocolError::UnknownFrame)
            }
        }
    }

    /// Encodes the frame for the transport.
    pub fn encode(&self) -> Result<WireFrame, ProtocolError> {
        Ok(match self {
            Frame::Meta(meta) => {
                WireFrame::Text(format!("{META_PREFIX}{}", serde_json::to_string(meta)?))
            }
            Frame::Chunk(data) => WireFrame::Binary(data.clone()),
            Frame::Eof => WireFrame::Text(EOF_LITERAL.to_string()),
            Frame::Msg(payload) => {
                WireFrame::Text(format!("{MSG_PREFIX}{}", serde_json::to_string(payload)?))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatKind;
    use uuid::Uuid;

    #[test]
    fn decode_meta() {
        let id = Uuid::new_v4();
        let text = format!("META:{{\"id\":\"{id}\",\"name\":\"photo.jpg\",\"size\":12345}}");
        let frame = Frame::decode(WireFrame::Text(text)).unwrap();
        match frame {
            Frame::Meta(meta) => {
                assert_eq!(meta.id, id);
                assert_eq!(meta.name, "photo.jpg");
                assert_eq!(meta.size, 12345);
            }
            other => panic!("expected Meta, got {other:?}"),
        }
    }

    #[test]
    fn decode_meta_without_id_gets_fresh_one() {
        // Senders that predate transfer ids omit the field.
        let frame =
            Frame::decode(WireFrame::Text("META:{\"name\":\"a.bin\",\"size\":1}".into())).unwrap();
        assert!(matches!(frame, Frame::Meta(_)));
    }

    #[test]
    fn decode_msg() {
        let frame =
            Frame::decode(WireFrame::Text("MSG:{\"kind\":\"text\",\"text\":\"hi\"}".into()))
                .unwrap();
        assert_eq!(
            frame,
            Frame::Msg(ChatPayload {
                kind: ChatKind::Text,
                text: "hi".into(),
            })
        );
    }

    #[test]
    fn decode_eof_exact_literal_only() {
        assert_eq!(
            Frame::decode(WireFrame::Text("EOF".into())).unwrap(),
            Frame::Eof
        );
        // Anything else, including trailing whitespace, is not EOF.
        assert!(matches!(
            Frame::decode(WireFrame::Text("EOF ".into())),
            Err(ProtocolError::UnknownFrame)
        ));
        assert!(matches!(
            Frame::decode(WireFrame::Text("eof".into())),
            Err(ProtocolError::UnknownFrame)
        ));
    }

    #[test]
    fn decode_binary_is_chunk() {
        let frame = Frame::decode(WireFrame::Binary(vec![1, 2, 3])).unwrap();
        assert_eq!(frame, Frame::Chunk(vec![1, 2, 3]));
    }

    #[test]
    fn binary_never_content_sniffed() {
        // Binary bytes that happen to spell a control frame stay a chunk.
        let frame = Frame::decode(WireFrame::Binary(b"EOF".to_vec())).unwrap();
        assert_eq!(frame, Frame::Chunk(b"EOF".to_vec()));
    }

    #[test]
    fn malformed_meta_json() {
        let err = Frame::decode(WireFrame::Text("META:{not json".into())).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::MalformedFrame { kind: "META", .. }
        ));
    }

    #[test]
    fn malformed_msg_json() {
        let err = Frame::decode(WireFrame::Text("MSG:garbage".into())).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::MalformedFrame { kind: "MSG", .. }
        ));
    }

    #[test]
    fn unknown_text_frame() {
        let err = Frame::decode(WireFrame::Text("PING:{}".into())).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownFrame));
    }

    #[test]
    fn meta_roundtrip() {
        let meta = TransferMeta {
            id: Uuid::new_v4(),
            name: "report.pdf".into(),
            size: 9000,
        };
        let wire = Frame::Meta(meta.clone()).encode().unwrap();
        match &wire {
            WireFrame::Text(t) => assert!(t.starts_with(META_PREFIX)),
            WireFrame::Binary(_) => panic!("META must be a text frame"),
        }
        assert_eq!(Frame::decode(wire).unwrap(), Frame::Meta(meta));
    }

    #[test]
    fn msg_roundtrip() {
        let payload = ChatPayload {
            kind: ChatKind::Url,
            text: "https://example.com".into(),
        };
        let wire = Frame::Msg(payload.clone()).encode().unwrap();
        assert_eq!(Frame::decode(wire).unwrap(), Frame::Msg(payload));
    }

    #[test]
    fn wire_frame_byte_len() {
        assert_eq!(WireFrame::Text("abc".into()).byte_len(), 3);
        assert_eq!(WireFrame::Binary(vec![0; 16]).byte_len(), 16);
    }
}
