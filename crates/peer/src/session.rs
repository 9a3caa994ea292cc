//! Session lifecycle.
//!
//! One [`PeerSession`] owns at most one handshake-or-channel at a time and
//! exposes where it stands as an explicit state. Consumers watch the event
//! stream; every state move is published there.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::channel::{ChannelError, PeerChannel};
use crate::client::{PollConfig, RendezvousClient};
use crate::endpoint::TransportEndpoint;
use crate::events::PeerEvent;
use crate::handshake::{self, HandshakeError};

/// Where a session stands.
///
/// ```text
/// Idle ──connect──▶ Handshaking ──▶ Open ──close──▶ Closed
///                        │                            │
///                        └─────────▶ Failed ◀─────────┘ (reconnectable)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Handshaking,
    Open,
    Closed,
    Failed,
}

impl SessionState {
    /// States from which a new connection attempt may start.
    pub fn can_connect(self) -> bool {
        matches!(
            self,
            SessionState::Idle | SessionState::Closed | SessionState::Failed
        )
    }
}

/// Errors produced by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a handshake or channel is already active")]
    AlreadyActive,

    #[error("no open channel")]
    NotConnected,

    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// One peer's connection lifecycle, from token to closed channel.
pub struct PeerSession {
    client: RendezvousClient,
    poll: PollConfig,
    state: Mutex<SessionState>,
    channel: Mutex<Option<Arc<PeerChannel>>>,
    events: mpsc::Sender<PeerEvent>,
    cancel: Mutex<CancellationToken>,
}

impl PeerSession {
    /// Builds a session against the given rendezvous base URL, returning
    /// the event stream consumers should watch.
    pub fn new(
        base_url: impl Into<String>,
        poll: PollConfig,
    ) -> (Arc<Self>, mpsc::Receiver<PeerEvent>) {
        let (tx, rx) = mpsc::channel(256);
        let session = Arc::new(Self {
            client: RendezvousClient::new(base_url),
            poll,
            state: Mutex::new(SessionState::Idle),
            channel: Mutex::new(None),
            events: tx,
            cancel: Mutex::new(CancellationToken::new()),
        });
        (session, rx)
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    /// Creates a session token, publishes the offer and waits for the
    /// responder. The token is published as
    /// [`PeerEvent::SessionCreated`] as soon as it exists, well before
    /// this method returns.
    pub async fn connect_as_initiator(
        &self,
        endpoint: &dyn TransportEndpoint,
    ) -> Result<String, SessionError> {
        let cancel = self.begin()?;

        let token = match self.client.create_session().await {
            Ok(token) => token,
            Err(e) => {
                self.set_state(SessionState::Failed);
                return Err(HandshakeError::from(e).into());
            }
        };
        let _ = self
            .events
            .try_send(PeerEvent::SessionCreated {
                token: token.clone(),
            });

        let transport =
            match handshake::run_initiator(&self.client, &token, endpoint, &self.poll, &cancel)
                .await
            {
                Ok(t) => t,
                Err(e) => {
                    self.set_state(SessionState::Failed);
                    return Err(e.into());
                }
            };

        self.attach(transport, cancel)?;
        info!(token, "session open (initiator)");
        Ok(token)
    }

    /// Joins an existing session under a token received out of band.
    pub async fn connect_as_responder(
        &self,
        token: &str,
        endpoint: &dyn TransportEndpoint,
    ) -> Result<(), SessionError> {
        let cancel = self.begin()?;

        let transport =
            match handshake::run_responder(&self.client, token, endpoint, &self.poll, &cancel)
                .await
            {
                Ok(t) => t,
                Err(e) => {
                    self.set_state(SessionState::Failed);
                    return Err(e.into());
                }
            };

        self.attach(transport, cancel)?;
        info!(token, "session open (responder)");
        Ok(())
    }

    /// The open channel, if any.
    pub fn channel(&self) -> Result<Arc<PeerChannel>, SessionError> {
        self.channel
            .lock()
            .unwrap()
            .clone()
            .ok_or(SessionError::NotConnected)
    }

    /// Cancels any in-flight handshake and tears the channel down.
    pub fn close(&self) {
        self.cancel.lock().unwrap().cancel();
        if let Some(channel) = self.channel.lock().unwrap().take() {
            channel.close();
        }
        if self.state() != SessionState::Idle {
            self.set_state(SessionState::Closed);
        }
    }

    // ---

    /// Claims the session for one connection attempt and arms a fresh
    /// cancellation token for it.
    fn begin(&self) -> Result<CancellationToken, SessionError> {
        {
            let mut state = self.state.lock().unwrap();
            if !state.can_connect() {
                return Err(SessionError::AlreadyActive);
            }
            *state = SessionState::Handshaking;
        }
        let _ = self.events.try_send(PeerEvent::State(SessionState::Handshaking));

        let fresh = CancellationToken::new();
        *self.cancel.lock().unwrap() = fresh.clone();
        Ok(fresh)
    }

    fn attach(
        &self,
        transport: Arc<dyn xdrop_channel::Transport>,
        cancel: CancellationToken,
    ) -> Result<(), SessionError> {
        let channel = match PeerChannel::spawn(transport, self.events.clone(), cancel) {
            Ok(channel) => channel,
            Err(e) => {
                self.set_state(SessionState::Failed);
                return Err(e.into());
            }
        };
        *self.channel.lock().unwrap() = Some(channel);
        self.set_state(SessionState::Open);
        Ok(())
    }

    fn set_state(&self, next: SessionState) {
        *self.state.lock().unwrap() = next;
        let _ = self.events.try_send(PeerEvent::State(next));
    }
}
