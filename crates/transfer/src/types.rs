//! Transfer bookkeeping types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of one transfer. Terminal states are immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Queued,
    Active,
    Done,
    Error,
}

impl TransferStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TransferStatus::Done | TransferStatus::Error)
    }
}

/// One file transfer, owned by the engine of its direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferItem {
    pub id: Uuid,
    /// Sanitized filename.
    pub name: String,
    /// Size declared in the `META` frame. The reassembled artifact's
    /// length is authoritative when the two disagree.
    pub declared_size: u64,
    /// Bytes moved so far; monotonically non-decreasing within a transfer.
    pub transferred: u64,
    pub status: TransferStatus,
    pub started_at: DateTime<Utc>,
}

impl TransferItem {
    pub fn new(id: Uuid, name: impl Into<String>, declared_size: u64) -> Self {
        Self {
            id,
            name: name.into(),
            declared_size,
            transferred: 0,
            status: TransferStatus::Queued,
            started_at: Utc::now(),
        }
    }
}

/// A `(value, max)` progress pair; `0 <= value <= max` always holds, with
/// `max` raised when a sender overruns its declared size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferProgress {
    pub id: Uuid,
    pub value: u64,
    pub max: u64,
}

impl TransferProgress {
    pub fn new(id: Uuid, value: u64, declared: u64) -> Self {
        Self {
            id,
            value,
            max: declared.max(value),
        }
    }
}

/// Events published by the transfer engine after every state change.
#[derive(Debug, Clone)]
pub enum TransferEvent {
    Started(TransferItem),
    Progress(TransferProgress),
    Completed(TransferItem),
    Failed(TransferItem),
    /// An inbound `META` arrived while another inbound transfer was still
    /// in flight; the new transfer was dropped, not the old one.
    Rejected { id: Uuid, name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(TransferStatus::Done.is_terminal());
        assert!(TransferStatus::Error.is_terminal());
        assert!(!TransferStatus::Queued.is_terminal());
        assert!(!TransferStatus::Active.is_terminal());
    }

    #[test]
    fn progress_bounded_by_declared() {
        let id = Uuid::new_v4();
        let p = TransferProgress::new(id, 500, 1000);
        assert_eq!((p.value, p.max), (500, 1000));
    }

    #[test]
    fn progress_max_raised_on_overrun() {
        let p = TransferProgress::new(Uuid::new_v4(), 1500, 1000);
        assert_eq!(p.max, 1500);
        assert!(p.value <= p.max);
    }

    #[test]
    fn new_item_is_queued() {
        let item = TransferItem::new(Uuid::new_v4(), "x.bin", 42);
        assert_eq!(item.status, TransferStatus::Queued);
        assert_eq!(item.transferred, 0);
        assert_eq!(item.declared_size, 42);
    }
}
