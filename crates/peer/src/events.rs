//! Events published to the session consumer.

use chrono::{DateTime, Utc};

use xdrop_protocol::{ChatKind, Direction};
use xdrop_transfer::{TransferEvent, TransferItem};

use crate::session::SessionState;

/// One entry in the channel's chat log.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub direction: Direction,
    pub kind: ChatKind,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub(crate) fn new(direction: Direction, kind: ChatKind, text: impl Into<String>) -> Self {
        Self {
            direction,
            kind,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Everything a UI needs to render the session.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// The lifecycle moved to a new state.
    State(SessionState),
    /// A token was issued for this session; show it to the user so the
    /// responder can join while the handshake keeps polling.
    SessionCreated { token: String },
    /// A chat message was sent or received on the channel.
    Message(ChatMessage),
    /// A transfer state change, either direction.
    Transfer(TransferEvent),
    /// An inbound file finished reassembling.
    FileReceived { item: TransferItem, bytes: Vec<u8> },
    /// The channel's frame stream ended.
    ChannelClosed,
}
