//! Rendezvous store for the XDrop handshake.
//!
//! Two otherwise-unconnected peers discover each other's connection
//! parameters through a short-lived, single-use slot keyed by a 6-digit
//! numeric token. Slots live in memory only (a process restart forgets
//! everything) and a background sweep expires idle ones. The store never
//! inspects the descriptions it relays.

pub mod http;
pub mod store;
pub mod token;

pub use http::{router, serve};
pub use store::{SlotDebug, SlotStore, StoreError, spawn_sweeper};

use std::time::Duration;

/// Idle time after which a slot is swept (reference policy).
pub const SLOT_TTL: Duration = Duration::from_secs(10 * 60);

/// How often the sweeper runs.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
