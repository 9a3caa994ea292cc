//! In-process transport pair.
//!
//! Two [`MemoryTransport`]s joined back to back, with real buffered-amount
//! accounting: bytes count as outstanding from `send` until the peer side
//! actually receives the frame, so flow control behaves the way it does on
//! a real channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use xdrop_protocol::WireFrame;

use crate::{DEFAULT_HIGH_WATER, FlowMeter, IncomingFrames, Transport, TransportError};

/// One side of an in-process channel. Create with [`pair`].
pub struct MemoryTransport {
    tx: Mutex<Option<mpsc::UnboundedSender<WireFrame>>>,
    flow: Arc<FlowMeter>,
    incoming: Mutex<Option<IncomingFrames>>,
    open: Arc<AtomicBool>,
}

/// Creates a connected transport pair with the default low-water mark.
pub fn pair() -> (Arc<MemoryTransport>, Arc<MemoryTransport>) {
    pair_with_low_water(DEFAULT_HIGH_WATER)
}

/// Creates a connected transport pair draining at the given low-water mark.
pub fn pair_with_low_water(low_water: usize) -> (Arc<MemoryTransport>, Arc<MemoryTransport>) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();

    let a_flow = Arc::new(FlowMeter::new(low_water));
    let b_flow = Arc::new(FlowMeter::new(low_water));

    // Both ends share one open flag: closing either side closes the channel.
    let open = Arc::new(AtomicBool::new(true));

    let a = Arc::new(MemoryTransport {
        tx: Mutex::new(Some(a_tx)),
        flow: Arc::clone(&a_flow),
        incoming: Mutex::new(Some(IncomingFrames::new(b_rx, b_flow.clone()))),
        open: Arc::clone(&open),
    });
    let b = Arc::new(MemoryTransport {
        tx: Mutex::new(Some(b_tx)),
        flow: b_flow,
        incoming: Mutex::new(Some(IncomingFrames::new(a_rx, a_flow))),
        open,
    });
    (a, b)
}

impl Transport for MemoryTransport {
    fn send(&self, frame: WireFrame) -> Result<(), TransportError> {
        if !self.open.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let guard = self.tx.lock().unwrap();
        let tx = guard.as_ref().ok_or(TransportError::Closed)?;
        self.flow.add(frame.byte_len());
        tx.send(frame).map_err(|_| TransportError::Closed)
    }

    fn flow(&self) -> &FlowMeter {
        &self.flow
    }

    fn take_incoming(&self) -> Option<IncomingFrames> {
        self.incoming.lock().unwrap().take()
    }

    fn close(&self) {
        self.open.store(false, Ordering::Release);
        // Dropping the sender ends the peer's incoming stream.
        self.tx.lock().unwrap().take();
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}
