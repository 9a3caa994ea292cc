//! Peer-side runtime: rendezvous client, handshake coordination and the
//! live channel.
//!
//! A connection is built in two phases. First the handshake: the initiator
//! publishes its connection description under a fresh token and polls for
//! the responder's reply, while the responder polls for the description and
//! replies under the same token. Then the channel: once the endpoint
//! reports the link open, a [`PeerChannel`] takes over the frame stream and
//! drives chat and file transfer until either side closes.
//!
//! [`PeerSession`] ties both phases to an explicit lifecycle state.

pub mod channel;
pub mod client;
pub mod endpoint;
pub mod events;
pub mod handshake;
pub mod loopback;
pub mod session;

pub use channel::{ChannelError, PeerChannel};
pub use client::{PollConfig, RendezvousClient, RendezvousError};
pub use endpoint::{EndpointError, EndpointFuture, TransportEndpoint};
pub use events::{ChatMessage, PeerEvent};
pub use handshake::{HandshakeError, run_initiator, run_responder};
pub use session::{PeerSession, SessionError, SessionState};

// Everything a consumer needs to drive a transfer without naming the
// lower crates.
pub use xdrop_transfer::{SendOptions, TransferEvent, TransferItem, TransferProgress};
