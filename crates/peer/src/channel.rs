//! The live peer channel.
//!
//! Owns the frame stream of an open transport: inbound frames are decoded
//! and routed to the chat log or the transfer assembler, outbound traffic
//! goes through [`PeerChannel::send_message`] and the file send methods.
//! Undecodable frames are logged and skipped; the channel stays alive.

use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use xdrop_channel::{IncomingFrames, Transport, TransportError};
use xdrop_protocol::{ChatPayload, Direction, Frame, ProtocolError, chat};
use xdrop_transfer::{
    Assembler, FileSender, MetaOutcome, SendOptions, TransferError, TransferEvent, TransferItem,
};

use crate::events::{ChatMessage, PeerEvent};

/// Errors produced by channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Empty and whitespace-only messages are never sent.
    #[error("message is empty")]
    EmptyMessage,

    /// The transport's frame stream was already taken by another consumer.
    #[error("incoming frame stream already taken")]
    StreamTaken,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Frame(#[from] ProtocolError),
}

/// One end of an open channel: chat log, inbound reassembly, outbound
/// transfers.
pub struct PeerChannel {
    transport: Arc<dyn Transport>,
    sender: FileSender,
    messages: Mutex<Vec<ChatMessage>>,
    events: mpsc::Sender<PeerEvent>,
    cancel: CancellationToken,
}

impl PeerChannel {
    /// Attaches to an open transport and starts the read loop.
    pub fn spawn(
        transport: Arc<dyn Transport>,
        events: mpsc::Sender<PeerEvent>,
        cancel: CancellationToken,
    ) -> Result<Arc<Self>, ChannelError> {
        let incoming = transport.take_incoming().ok_or(ChannelError::StreamTaken)?;

        let (transfer_tx, transfer_rx) = mpsc::channel(256);
        let sender = FileSender::new(Arc::clone(&transport), transfer_tx, cancel.clone());

        let channel = Arc::new(Self {
            transport,
            sender,
            messages: Mutex::new(Vec::new()),
            events: events.clone(),
            cancel,
        });

        tokio::spawn(forward_transfer_events(transfer_rx, events));
        tokio::spawn({
            let channel = Arc::clone(&channel);
            async move { channel.read_loop(incoming).await }
        });

        Ok(channel)
    }

    /// Sends one chat message, classifying it as text or URL.
    pub async fn send_message(&self, text: &str) -> Result<ChatMessage, ChannelError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChannelError::EmptyMessage);
        }

        let kind = chat::classify(text);
        let payload = ChatPayload {
            kind,
            text: text.to_string(),
        };
        self.transport.send(Frame::Msg(payload).encode()?)?;

        let msg = ChatMessage::new(Direction::Out, kind, text);
        self.messages.lock().unwrap().push(msg.clone());
        let _ = self.events.send(PeerEvent::Message(msg.clone())).await;
        Ok(msg)
    }

    /// Sends a file from disk.
    pub async fn send_file(
        &self,
        path: &Path,
        opts: &SendOptions,
    ) -> Result<TransferItem, ChannelError> {
        Ok(self.sender.send_path(path, opts).await?)
    }

    /// Sends an in-memory payload under the given name.
    pub async fn send_bytes(
        &self,
        name: &str,
        data: &[u8],
        opts: &SendOptions,
    ) -> Result<TransferItem, ChannelError> {
        Ok(self.sender.send_bytes(name, data, opts).await?)
    }

    /// Snapshot of the chat log, oldest first.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Stops the read loop and tears the transport down.
    pub fn close(&self) {
        self.cancel.cancel();
        self.transport.close();
    }

    async fn read_loop(self: Arc<Self>, mut incoming: IncomingFrames) {
        let mut assembler = Assembler::new();
        loop {
            let wire = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                frame = incoming.recv() => match frame {
                    Some(f) => f,
                    None => break,
                },
            };
            let frame = match Frame::decode(wire) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "undecodable frame; skipped");
                    continue;
                }
            };

            match frame {
                Frame::Meta(meta) => match assembler.on_meta(meta) {
                    MetaOutcome::Started(item) => {
                        self.emit(PeerEvent::Transfer(TransferEvent::Started(item))).await;
                    }
                    MetaOutcome::Rejected { id, name } => {
                        self.emit(PeerEvent::Transfer(TransferEvent::Rejected { id, name }))
                            .await;
                    }
                },
                Frame::Chunk(data) => {
                    if let Some(progress) = assembler.on_chunk(data) {
                        self.emit(PeerEvent::Transfer(TransferEvent::Progress(progress)))
                            .await;
                    }
                }
                Frame::Eof => {
                    if let Some(done) = assembler.on_eof() {
                        self.emit(PeerEvent::Transfer(TransferEvent::Completed(
                            done.item.clone(),
                        )))
                        .await;
                        self.emit(PeerEvent::FileReceived {
                            item: done.item,
                            bytes: done.bytes,
                        })
                        .await;
                    }
                }
                Frame::Msg(payload) => {
                    // A "url" tag is trusted; "text" is re-checked so a
                    // conservative sender still gets link rendering.
                    let kind = chat::effective_kind(payload.kind, &payload.text);
                    let msg = ChatMessage::new(Direction::In, kind, payload.text);
                    self.messages.lock().unwrap().push(msg.clone());
                    self.emit(PeerEvent::Message(msg)).await;
                }
            }
        }

        if let Some(item) = assembler.abort() {
            debug!(name = %item.name, "partial inbound transfer abandoned at close");
            self.emit(PeerEvent::Transfer(TransferEvent::Failed(item))).await;
        }
        self.emit(PeerEvent::ChannelClosed).await;
    }

    async fn emit(&self, event: PeerEvent) {
        let _ = self.events.send(event).await;
    }
}

async fn forward_transfer_events(
    mut rx: mpsc::Receiver<TransferEvent>,
    events: mpsc::Sender<PeerEvent>,
) {
    while let Some(event) = rx.recv().await {
        if events.send(PeerEvent::Transfer(event)).await.is_err() {
            break;
        }
    }
}
