//! In-memory slot storage with expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::token;

/// Errors reported by slot operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No live slot for the token (unknown, expired, or malformed).
    #[error("no session")]
    NotFound,

    /// Both sides already populated: the slot is consumed and rejects
    /// further initiator writes.
    #[error("already used")]
    Conflict,
}

struct Slot {
    offer: Option<String>,
    answer: Option<String>,
    last_activity: Instant,
    updated_at: DateTime<Utc>,
}

impl Slot {
    fn new() -> Self {
        Self {
            offer: None,
            answer: None,
            last_activity: Instant::now(),
            updated_at: Utc::now(),
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
        self.updated_at = Utc::now();
    }
}

/// Introspection snapshot of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotDebug {
    pub has_offer: bool,
    pub has_answer: bool,
    pub updated_at: DateTime<Utc>,
}

/// Keyed storage of handshake slots. Owns the token lifecycle.
///
/// Each field is updated atomically as a unit under one lock, which is all
/// the coordination two concurrently polling peers need.
#[derive(Default)]
pub struct SlotStore {
    slots: Mutex<HashMap<String, Slot>>,
}

impl SlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh token unique among live slots and stores an empty
    /// slot under it.
    pub fn create_slot(&self) -> String {
        let mut slots = self.slots.lock().unwrap();
        loop {
            let t = token::generate();
            if !slots.contains_key(&t) {
                debug!(token = %t, "slot created");
                slots.insert(t.clone(), Slot::new());
                return t;
            }
        }
    }

    /// Stores the initiator's description. Rejected once the slot is
    /// consumed (both sides populated).
    pub fn put_offer(&self, token: &str, sdp: String) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().unwrap();
        let slot = slots.get_mut(token).ok_or(StoreError::NotFound)?;
        if slot.offer.is_some() && slot.answer.is_some() {
            return Err(StoreError::Conflict);
        }
        slot.offer = Some(sdp);
        slot.touch();
        Ok(())
    }

    /// The initiator's description; `Ok(None)` while still pending.
    pub fn get_offer(&self, token: &str) -> Result<Option<String>, StoreError> {
        let slots = self.slots.lock().unwrap();
        let slot = slots.get(token).ok_or(StoreError::NotFound)?;
        Ok(slot.offer.clone())
    }

    /// Stores the responder's description. Last writer wins; only slot
    /// existence is required.
    pub fn put_answer(&self, token: &str, sdp: String) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().unwrap();
        let slot = slots.get_mut(token).ok_or(StoreError::NotFound)?;
        slot.answer = Some(sdp);
        slot.touch();
        Ok(())
    }

    /// The responder's description; `Ok(None)` while still pending.
    pub fn get_answer(&self, token: &str) -> Result<Option<String>, StoreError> {
        let slots = self.slots.lock().unwrap();
        let slot = slots.get(token).ok_or(StoreError::NotFound)?;
        Ok(slot.answer.clone())
    }

    /// Snapshot for the debug endpoint.
    pub fn debug_slot(&self, token: &str) -> Result<SlotDebug, StoreError> {
        let slots = self.slots.lock().unwrap();
        let slot = slots.get(token).ok_or(StoreError::NotFound)?;
        Ok(SlotDebug {
            has_offer: slot.offer.is_some(),
            has_answer: slot.answer.is_some(),
            updated_at: slot.updated_at,
        })
    }

    /// Removes slots idle longer than `ttl`; returns how many went.
    ///
    /// Advisory cleanup, not a correctness mechanism: queries against a
    /// swept token simply report `NotFound`.
    pub fn sweep(&self, ttl: Duration) -> usize {
        let mut slots = self.slots.lock().unwrap();
        let before = slots.len();
        slots.retain(|_, slot| slot.last_activity.elapsed() <= ttl);
        let removed = before - slots.len();
        if removed > 0 {
            debug!(removed, "swept expired slots");
        }
        removed
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs the expiry sweep on a fixed interval until cancelled.
pub fn spawn_sweeper(
    store: Arc<SlotStore>,
    interval: Duration,
    ttl: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    store.sweep(ttl);
                }
            }
        }
    })
}
