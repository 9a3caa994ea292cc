//! Wire vocabulary for the XDrop peer channel.
//!
//! Once the transport is open, everything the two peers say to each other
//! is one of four frame kinds (see [`frame`]): file metadata, raw file
//! chunks, an end-of-file marker, and discrete chat messages. Text frames
//! are distinguished from binary purely by the transport's frame type,
//! never by content sniffing.

pub mod chat;
pub mod frame;
pub mod types;

pub use chat::{ChatKind, ChatPayload, Direction, classify, effective_kind, normalize_url};
pub use frame::{EOF_LITERAL, Frame, META_PREFIX, MSG_PREFIX, WireFrame};
pub use types::{TransferMeta, sanitize_filename};

/// Errors produced while encoding or decoding channel frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A `META:` or `MSG:` frame carried unparsable JSON. Callers drop the
    /// frame and keep the channel alive.
    #[error("malformed {kind} frame: {source}")]
    MalformedFrame {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A text frame matched none of the known prefixes.
    #[error("unrecognized text frame")]
    UnknownFrame,

    #[error("frame encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}
