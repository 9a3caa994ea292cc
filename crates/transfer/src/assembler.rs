//! Inbound transfer path.
//!
//! Accumulation state is keyed by the transfer id carried in `META`. A
//! `META` for a different transfer while one is still in flight is
//! rejected outright: the in-flight transfer is preserved and the new one
//! dropped. A duplicate `META` with the same id restarts that transfer
//! (a deliberate sender retry).

use tracing::{debug, warn};
use uuid::Uuid;

use xdrop_protocol::{TransferMeta, sanitize_filename};

use crate::types::{TransferItem, TransferProgress, TransferStatus};

/// Outcome of an inbound `META` frame.
#[derive(Debug, Clone)]
pub enum MetaOutcome {
    /// Accumulation (re)started for this transfer.
    Started(TransferItem),
    /// Dropped: another inbound transfer is still in flight.
    Rejected { id: Uuid, name: String },
}

/// A fully reassembled inbound file.
///
/// `bytes.len()` is authoritative even when it disagrees with the declared
/// size.
#[derive(Debug, Clone)]
pub struct CompletedInbound {
    pub item: TransferItem,
    pub bytes: Vec<u8>,
}

struct Inbound {
    item: TransferItem,
    chunks: Vec<Vec<u8>>,
    received: u64,
}

/// Reassembles one inbound chunk stream at a time.
#[derive(Default)]
pub struct Assembler {
    active: Option<Inbound>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles a `META` frame: starts accumulation, or rejects the new
    /// transfer if a different one is still in flight.
    pub fn on_meta(&mut self, meta: TransferMeta) -> MetaOutcome {
        if let Some(active) = &self.active
            && active.item.id != meta.id
        {
            warn!(
                active = %active.item.name,
                rejected = %meta.name,
                "META while a transfer is in flight; rejecting the new one"
            );
            return MetaOutcome::Rejected {
                id: meta.id,
                name: sanitize_filename(&meta.name),
            };
        }

        let mut item = TransferItem::new(meta.id, sanitize_filename(&meta.name), meta.size);
        item.status = TransferStatus::Active;
        debug!(name = %item.name, size = meta.size, "inbound transfer started");
        self.active = Some(Inbound {
            item: item.clone(),
            chunks: Vec::new(),
            received: 0,
        });
        MetaOutcome::Started(item)
    }

    /// Appends one binary chunk. Chunks with no transfer in flight are
    /// dropped.
    pub fn on_chunk(&mut self, data: Vec<u8>) -> Option<TransferProgress> {
        let Some(active) = &mut self.active else {
            warn!(len = data.len(), "binary chunk with no transfer in flight; dropped");
            return None;
        };
        active.received += data.len() as u64;
        active.item.transferred = active.received;
        active.chunks.push(data);
        Some(TransferProgress::new(
            active.item.id,
            active.received,
            active.item.declared_size,
        ))
    }

    /// Handles `EOF`: concatenates the accumulated chunks into the final
    /// artifact and clears accumulation state. `EOF` with no transfer in
    /// flight is ignored.
    pub fn on_eof(&mut self) -> Option<CompletedInbound> {
        let mut inbound = self.active.take()?;
        inbound.item.transferred = inbound.received;
        inbound.item.status = TransferStatus::Done;

        let mut bytes = Vec::with_capacity(inbound.received as usize);
        for chunk in inbound.chunks {
            bytes.extend_from_slice(&chunk);
        }
        debug!(name = %inbound.item.name, bytes = bytes.len(), "inbound transfer complete");
        Some(CompletedInbound {
            item: inbound.item,
            bytes,
        })
    }

    /// Drops any partial accumulation (the reset path), returning the
    /// abandoned item marked as errored.
    pub fn abort(&mut self) -> Option<TransferItem> {
        let mut inbound = self.active.take()?;
        inbound.item.status = TransferStatus::Error;
        Some(inbound.item)
    }

    /// The transfer currently being received, if any.
    pub fn active(&self) -> Option<&TransferItem> {
        self.active.as_ref().map(|i| &i.item)
    }
}
