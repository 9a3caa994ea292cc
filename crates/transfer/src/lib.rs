//! Chunked file transfer over one shared peer channel.
//!
//! The send path emits one `META` frame, `ceil(size / chunk)` binary frames
//! and an `EOF`, suspending whenever the transport's outstanding byte count
//! exceeds the high-water mark. The receive path reassembles chunk streams
//! into complete artifacts. Exactly one transfer is active per direction
//! per channel at a time.

mod assembler;
mod sender;
mod types;

pub use assembler::{Assembler, CompletedInbound, MetaOutcome};
pub use sender::{FileSender, SendOptions};
pub use types::{TransferEvent, TransferItem, TransferProgress, TransferStatus};

use xdrop_channel::TransportError;
use xdrop_protocol::ProtocolError;

/// Default chunk size: 16 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Errors produced by the transfer engine.
///
/// Transfer failures abort only the in-flight transfer; the channel stays
/// open and the caller must reinitiate deliberately.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("a transfer is already in progress on this channel")]
    Busy,

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("frame error: {0}")]
    Frame(#[from] ProtocolError),

    #[error("cancelled")]
    Cancelled,

    #[error("transfer protocol error: {0}")]
    Protocol(String),
}
