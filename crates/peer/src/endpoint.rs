//! Seam between the handshake and the actual point-to-point transport.
//!
//! The negotiation artifacts are opaque strings here; the endpoint alone
//! knows how to mint and interpret them. The handshake only sequences the
//! exchange and hands the resulting [`Transport`] to the channel layer.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use xdrop_channel::Transport;

/// A boxed future returned by endpoint methods.
pub type EndpointFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Failure reported by the underlying transport implementation.
#[derive(Debug, thiserror::Error)]
#[error("endpoint failure: {0}")]
pub struct EndpointError(pub String);

/// One side of a negotiable point-to-point link.
pub trait TransportEndpoint: Send + Sync {
    /// Mints this side's connection description (initiator role).
    fn create_offer(&self) -> EndpointFuture<'_, Result<String, EndpointError>>;

    /// Applies the remote side's description.
    fn apply_remote(&self, description: String) -> EndpointFuture<'_, Result<(), EndpointError>>;

    /// Mints this side's description in reply to an applied offer
    /// (responder role).
    fn create_answer(&self) -> EndpointFuture<'_, Result<String, EndpointError>>;

    /// Resolves with the live channel once the link is established.
    fn opened(&self) -> EndpointFuture<'_, Result<Arc<dyn Transport>, EndpointError>>;

    /// Tears the link down.
    fn close(&self);
}
