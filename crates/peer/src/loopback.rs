//! In-process endpoint pair.
//!
//! Backs the full handshake-plus-channel path with a memory transport, so
//! the whole stack can be exercised without a real network link. The
//! "descriptions" are just the shared link id; applying one verifies both
//! sides are talking about the same link.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use uuid::Uuid;

use xdrop_channel::Transport;
use xdrop_channel::memory::{self, MemoryTransport};

use crate::endpoint::{EndpointError, EndpointFuture, TransportEndpoint};

#[derive(Clone, Copy)]
enum Role {
    Initiator = 0,
    Responder = 1,
}

struct Shared {
    applied: Mutex<[bool; 2]>,
    ready: watch::Sender<bool>,
}

/// One side of an in-process link.
pub struct LoopbackEndpoint {
    link: Uuid,
    role: Role,
    transport: Arc<MemoryTransport>,
    shared: Arc<Shared>,
}

/// Builds a cross-linked endpoint pair (initiator, responder).
pub fn pair() -> (LoopbackEndpoint, LoopbackEndpoint) {
    let (a, b) = memory::pair();
    let link = Uuid::new_v4();
    let (ready, _) = watch::channel(false);
    let shared = Arc::new(Shared {
        applied: Mutex::new([false; 2]),
        ready,
    });
    (
        LoopbackEndpoint {
            link,
            role: Role::Initiator,
            transport: a,
            shared: Arc::clone(&shared),
        },
        LoopbackEndpoint {
            link,
            role: Role::Responder,
            transport: b,
            shared,
        },
    )
}

impl LoopbackEndpoint {
    fn description(&self) -> String {
        format!("loopback:{}", self.link)
    }

    fn mark_applied(&self) {
        let mut applied = self.shared.applied.lock().unwrap();
        applied[self.role as usize] = true;
        if applied.iter().all(|a| *a) {
            let _ = self.shared.ready.send(true);
        }
    }
}

impl TransportEndpoint for LoopbackEndpoint {
    fn create_offer(&self) -> EndpointFuture<'_, Result<String, EndpointError>> {
        let description = self.description();
        Box::pin(async move { Ok(description) })
    }

    fn apply_remote(&self, description: String) -> EndpointFuture<'_, Result<(), EndpointError>> {
        Box::pin(async move {
            if description != self.description() {
                return Err(EndpointError(format!(
                    "description names a different link: {description}"
                )));
            }
            self.mark_applied();
            Ok(())
        })
    }

    fn create_answer(&self) -> EndpointFuture<'_, Result<String, EndpointError>> {
        let description = self.description();
        Box::pin(async move { Ok(description) })
    }

    fn opened(&self) -> EndpointFuture<'_, Result<Arc<dyn Transport>, EndpointError>> {
        let mut ready = self.shared.ready.subscribe();
        let transport = Arc::clone(&self.transport) as Arc<dyn Transport>;
        Box::pin(async move {
            ready
                .wait_for(|open| *open)
                .await
                .map_err(|_| EndpointError("link abandoned before opening".into()))?;
            Ok(transport)
        })
    }

    fn close(&self) {
        self.transport.close();
    }
}
