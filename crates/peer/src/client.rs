//! HTTP client for the rendezvous store.
//!
//! The store has no push channel, so the waiting side polls. [`PollConfig`]
//! bounds that loop: every poll cycle checks the deadline and the
//! cancellation token, and the two outcomes are distinct errors so callers
//! can tell "the other side never showed up" from "we gave up on purpose".

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How often the waiting side re-queries the store.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(750);

/// How long a handshake waits for the remote side before giving up.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors produced by rendezvous requests and polls.
#[derive(Debug, thiserror::Error)]
pub enum RendezvousError {
    #[error("rendezvous request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The token names no live slot (unknown, expired, or malformed).
    #[error("no session")]
    NotFound,

    /// The slot is consumed; a new session is needed.
    #[error("already used")]
    Conflict,

    /// The poll deadline passed without the remote side appearing.
    #[error("timed out waiting for the remote peer")]
    Timeout,

    /// The poll was cancelled locally.
    #[error("cancelled")]
    Cancelled,

    #[error("unexpected rendezvous response: {0}")]
    Protocol(String),
}

/// Polling policy for [`RendezvousClient::wait_offer`] and
/// [`RendezvousClient::wait_answer`].
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    /// `None` polls until cancelled.
    pub timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: Some(DEFAULT_HANDSHAKE_TIMEOUT),
        }
    }
}

#[derive(Deserialize)]
struct TokenBody {
    token: String,
}

#[derive(Deserialize)]
struct SdpBody {
    sdp: String,
}

#[derive(Clone, Copy)]
enum Side {
    Offer,
    Answer,
}

impl Side {
    fn path(self) -> &'static str {
        match self {
            Side::Offer => "/api/offer",
            Side::Answer => "/api/answer",
        }
    }
}

/// Thin typed wrapper over the store's HTTP API.
pub struct RendezvousClient {
    http: reqwest::Client,
    base_url: String,
}

impl RendezvousClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Asks the store for a fresh token.
    pub async fn create_session(&self) -> Result<String, RendezvousError> {
        let res = self
            .http
            .post(self.url("/api/session"))
            .send()
            .await?;
        let body: TokenBody = check(res)?.json().await?;
        debug!(token = %body.token, "session created");
        Ok(body.token)
    }

    pub async fn put_offer(&self, token: &str, sdp: &str) -> Result<(), RendezvousError> {
        self.put(Side::Offer, token, sdp).await
    }

    /// The initiator's description; `Ok(None)` while still pending.
    pub async fn get_offer(&self, token: &str) -> Result<Option<String>, RendezvousError> {
        self.get(Side::Offer, token).await
    }

    pub async fn put_answer(&self, token: &str, sdp: &str) -> Result<(), RendezvousError> {
        self.put(Side::Answer, token, sdp).await
    }

    /// The responder's description; `Ok(None)` while still pending.
    pub async fn get_answer(&self, token: &str) -> Result<Option<String>, RendezvousError> {
        self.get(Side::Answer, token).await
    }

    /// Polls until the offer appears, the deadline passes, or `cancel`
    /// fires.
    pub async fn wait_offer(
        &self,
        token: &str,
        cfg: &PollConfig,
        cancel: &CancellationToken,
    ) -> Result<String, RendezvousError> {
        self.wait(Side::Offer, token, cfg, cancel).await
    }

    /// Polls until the answer appears, the deadline passes, or `cancel`
    /// fires.
    pub async fn wait_answer(
        &self,
        token: &str,
        cfg: &PollConfig,
        cancel: &CancellationToken,
    ) -> Result<String, RendezvousError> {
        self.wait(Side::Answer, token, cfg, cancel).await
    }

    // ---

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn put(&self, side: Side, token: &str, sdp: &str) -> Result<(), RendezvousError> {
        let res = self
            .http
            .post(self.url(side.path()))
            .json(&serde_json::json!({ "token": token, "sdp": sdp }))
            .send()
            .await?;
        check(res)?;
        Ok(())
    }

    async fn get(&self, side: Side, token: &str) -> Result<Option<String>, RendezvousError> {
        let res = self
            .http
            .get(self.url(side.path()))
            .query(&[("token", token)])
            .send()
            .await?;
        if res.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body: SdpBody = check(res)?.json().await?;
        Ok(Some(body.sdp))
    }

    async fn wait(
        &self,
        side: Side,
        token: &str,
        cfg: &PollConfig,
        cancel: &CancellationToken,
    ) -> Result<String, RendezvousError> {
        let deadline = cfg.timeout.map(|t| tokio::time::Instant::now() + t);
        loop {
            if let Some(sdp) = self.get(side, token).await? {
                return Ok(sdp);
            }

            let mut sleep = cfg.interval;
            if let Some(deadline) = deadline {
                let left = deadline.saturating_duration_since(tokio::time::Instant::now());
                if left.is_zero() {
                    return Err(RendezvousError::Timeout);
                }
                sleep = sleep.min(left);
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RendezvousError::Cancelled),
                _ = tokio::time::sleep(sleep) => {}
            }
        }
    }
}

fn check(res: reqwest::Response) -> Result<reqwest::Response, RendezvousError> {
    match res.status() {
        s if s.is_success() => Ok(res),
        StatusCode::NOT_FOUND => Err(RendezvousError::NotFound),
        StatusCode::CONFLICT => Err(RendezvousError::Conflict),
        s => Err(RendezvousError::Protocol(format!("unexpected status {s}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slashes_trimmed() {
        let client = RendezvousClient::new("http://localhost:9001///");
        assert_eq!(client.base_url(), "http://localhost:9001");
    }

    #[test]
    fn default_poll_config() {
        let cfg = PollConfig::default();
        assert_eq!(cfg.interval, Duration::from_millis(750));
        assert_eq!(cfg.timeout, Some(Duration::from_secs(120)));
    }
}
