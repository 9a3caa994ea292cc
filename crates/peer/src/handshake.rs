//! Offer/answer sequencing through the rendezvous store.
//!
//! Initiator: publish the offer under the token, poll for the answer,
//! apply it. Responder: poll for the offer, apply it, publish the answer.
//! Both then wait for the endpoint to report the link open.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use xdrop_channel::Transport;

use crate::client::{PollConfig, RendezvousClient, RendezvousError};
use crate::endpoint::{EndpointError, TransportEndpoint};

/// Errors produced while coordinating a handshake.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error(transparent)]
    Rendezvous(#[from] RendezvousError),

    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

/// Runs the initiator side under an already-created token.
pub async fn run_initiator(
    client: &RendezvousClient,
    token: &str,
    endpoint: &dyn TransportEndpoint,
    poll: &PollConfig,
    cancel: &CancellationToken,
) -> Result<Arc<dyn Transport>, HandshakeError> {
    let offer = endpoint.create_offer().await?;
    client.put_offer(token, &offer).await?;
    debug!(token, "offer published, waiting for answer");

    let answer = client.wait_answer(token, poll, cancel).await?;
    endpoint.apply_remote(answer).await?;

    let transport = endpoint.opened().await?;
    info!(token, "link established (initiator)");
    Ok(transport)
}

/// Runs the responder side against a token received out of band.
pub async fn run_responder(
    client: &RendezvousClient,
    token: &str,
    endpoint: &dyn TransportEndpoint,
    poll: &PollConfig,
    cancel: &CancellationToken,
) -> Result<Arc<dyn Transport>, HandshakeError> {
    debug!(token, "waiting for offer");
    let offer = client.wait_offer(token, poll, cancel).await?;
    endpoint.apply_remote(offer).await?;

    let answer = endpoint.create_answer().await?;
    client.put_answer(token, &answer).await?;

    let transport = endpoint.opened().await?;
    info!(token, "link established (responder)");
    Ok(transport)
}
