//! Outbound transfer path.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use xdrop_channel::{DEFAULT_HIGH_WATER, Transport};
use xdrop_protocol::{Frame, TransferMeta, sanitize_filename};

use crate::types::{TransferEvent, TransferItem, TransferProgress, TransferStatus};
use crate::{DEFAULT_CHUNK_SIZE, TransferError};

/// Tuning knobs for the send path.
#[derive(Debug, Clone)]
pub struct SendOptions {
    /// Bytes per binary frame.
    pub chunk_size: usize,
    /// Outstanding-byte threshold above which the sender suspends.
    pub high_water: usize,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            high_water: DEFAULT_HIGH_WATER,
        }
    }
}

/// Sends files over one channel, one at a time.
///
/// Starting a send while another is in progress is a caller error and
/// returns [`TransferError::Busy`]. A failed send is not retried
/// automatically.
pub struct FileSender {
    transport: Arc<dyn Transport>,
    events: mpsc::Sender<TransferEvent>,
    cancel: CancellationToken,
    busy: AtomicBool,
}

impl FileSender {
    pub fn new(
        transport: Arc<dyn Transport>,
        events: mpsc::Sender<TransferEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            events,
            cancel,
            busy: AtomicBool::new(false),
        }
    }

    /// Sends an in-memory payload under the given name.
    pub async fn send_bytes(
        &self,
        name: &str,
        data: &[u8],
        opts: &SendOptions,
    ) -> Result<TransferItem, TransferError> {
        self.send_reader(name, data.len() as u64, data, opts).await
    }

    /// Sends a file from disk; the declared size is taken from metadata.
    pub async fn send_path(
        &self,
        path: &Path,
        opts: &SendOptions,
    ) -> Result<TransferItem, TransferError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let size = tokio::fs::metadata(path).await?.len();
        let file = tokio::fs::File::open(path).await?;
        self.send_reader(&name, size, file, opts).await
    }

    /// Core send loop: `META`, `ceil(size / chunk)` binary frames, `EOF`.
    pub async fn send_reader<R: AsyncRead + Unpin>(
        &self,
        name: &str,
        size: u64,
        mut reader: R,
        opts: &SendOptions,
    ) -> Result<TransferItem, TransferError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TransferError::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        let name = sanitize_filename(name);
        let mut item = TransferItem::new(Uuid::new_v4(), name.clone(), size);

        let meta = TransferMeta {
            id: item.id,
            name,
            size,
        };
        self.transport.send(Frame::Meta(meta).encode()?)?;
        item.status = TransferStatus::Active;
        self.emit(TransferEvent::Started(item.clone()));

        let mut buf = vec![0u8; opts.chunk_size.max(1)];
        let mut sent: u64 = 0;

        while sent < size {
            // Sole flow-control mechanism: wait out the transport's
            // outstanding bytes before queueing another chunk.
            while self.transport.flow().buffered() > opts.high_water {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        return Err(self.fail(&mut item));
                    }
                    _ = self.transport.flow().drained() => {}
                }
            }
            if self.cancel.is_cancelled() {
                return Err(self.fail(&mut item));
            }

            let want = ((size - sent) as usize).min(buf.len());
            let n = reader.read(&mut buf[..want]).await?;
            if n == 0 {
                self.fail(&mut item);
                return Err(TransferError::Protocol(
                    "source ended before declared size".into(),
                ));
            }

            if let Err(e) = self.transport.send(Frame::Chunk(buf[..n].to_vec()).encode()?) {
                self.fail(&mut item);
                return Err(e.into());
            }
            sent += n as u64;
            item.transferred = sent;
            self.emit(TransferEvent::Progress(TransferProgress::new(
                item.id, sent, size,
            )));
        }

        self.transport.send(Frame::Eof.encode()?)?;
        item.status = TransferStatus::Done;
        info!(name = %item.name, bytes = sent, "file sent");
        self.emit(TransferEvent::Completed(item.clone()));
        Ok(item)
    }

    /// `true` while a send is in flight on this channel.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn fail(&self, item: &mut TransferItem) -> TransferError {
        item.status = TransferStatus::Error;
        debug!(name = %item.name, "outbound transfer cancelled");
        self.emit(TransferEvent::Failed(item.clone()));
        TransferError::Cancelled
    }

    fn emit(&self, event: TransferEvent) {
        // Non-blocking: a saturated consumer drops progress, never data.
        let _ = self.events.try_send(event);
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
