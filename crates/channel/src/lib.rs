//! Transport contract for the peer channel.
//!
//! The negotiated point-to-point session itself is external to this
//! workspace; [`Transport`] is the capability contract it must satisfy:
//! ordered, reliable delivery of text/binary frames within one channel
//! lifetime, an outstanding-unacknowledged-byte count, and a drain signal
//! for flow control. [`memory`] provides an in-process implementation used
//! by tests and demos.

pub mod memory;

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;
use tokio::sync::mpsc;

use xdrop_protocol::WireFrame;

/// Default high-water mark on outstanding unacknowledged bytes (1 MiB).
///
/// Senders suspend above it and resume once the transport has drained back
/// below its low-water mark.
pub const DEFAULT_HIGH_WATER: usize = 1024 * 1024;

/// Errors produced by a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("channel not open")]
    NotReady,

    #[error("channel closed")]
    Closed,
}

/// Outbound byte accounting shared between a transport and its senders.
///
/// The transport adds on send and subtracts when the peer side has taken
/// delivery; senders poll [`buffered`](Self::buffered) against their
/// high-water mark and park on [`drained`](Self::drained).
pub struct FlowMeter {
    buffered: AtomicUsize,
    drained: Notify,
    low_water: usize,
}

impl FlowMeter {
    pub fn new(low_water: usize) -> Self {
        Self {
            buffered: AtomicUsize::new(0),
            drained: Notify::new(),
            low_water,
        }
    }

    /// Bytes queued but not yet acknowledged by the transport.
    pub fn buffered(&self) -> usize {
        self.buffered.load(Ordering::Acquire)
    }

    /// Resolves after the outstanding count next drops to the low-water
    /// mark or below. A permit is stored if nobody is waiting, so callers
    /// must re-check [`buffered`](Self::buffered) in a loop.
    pub async fn drained(&self) {
        self.drained.notified().await;
    }

    /// Records `n` bytes handed to the transport.
    pub fn add(&self, n: usize) {
        self.buffered.fetch_add(n, Ordering::AcqRel);
    }

    /// Records `n` bytes acknowledged/delivered.
    pub fn sub(&self, n: usize) {
        let prev = self.buffered.fetch_sub(n, Ordering::AcqRel);
        if prev.saturating_sub(n) <= self.low_water {
            self.drained.notify_one();
        }
    }
}

/// The ordered incoming frame stream of a transport.
///
/// Receiving a frame acknowledges it to the remote sender's [`FlowMeter`],
/// which is what makes back-pressure observable end to end.
pub struct IncomingFrames {
    rx: mpsc::UnboundedReceiver<WireFrame>,
    remote_flow: std::sync::Arc<FlowMeter>,
}

impl IncomingFrames {
    pub fn new(
        rx: mpsc::UnboundedReceiver<WireFrame>,
        remote_flow: std::sync::Arc<FlowMeter>,
    ) -> Self {
        Self { rx, remote_flow }
    }

    /// Next frame in arrival order; `None` once the channel is closed.
    pub async fn recv(&mut self) -> Option<WireFrame> {
        let frame = self.rx.recv().await?;
        self.remote_flow.sub(frame.byte_len());
        Some(frame)
    }
}

/// Contract the underlying point-to-point transport must satisfy.
///
/// Frames sent on one channel are delivered to the peer in the exact order
/// they were sent; the channel neither re-orders nor deduplicates.
pub trait Transport: Send + Sync + 'static {
    /// Queues one frame for in-order delivery to the peer.
    fn send(&self, frame: WireFrame) -> Result<(), TransportError>;

    /// Outbound flow accounting for this side of the channel.
    fn flow(&self) -> &FlowMeter;

    /// Takes the incoming frame stream. Yields `Some` exactly once.
    fn take_incoming(&self) -> Option<IncomingFrames>;

    /// Tears the channel down; subsequent sends fail with
    /// [`TransportError::Closed`] and the peer's stream ends.
    fn close(&self);

    /// `true` while the channel is open for sending.
    fn is_open(&self) -> bool;
}
