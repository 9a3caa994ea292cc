//! Standalone rendezvous daemon.
//!
//! Binds `0.0.0.0:$PORT` (default 9001) and serves the signaling API until
//! interrupted.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use xdrop_rendezvous::{SLOT_TTL, SWEEP_INTERVAL, SlotStore, serve, spawn_sweeper};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port: u16 = match std::env::var("PORT") {
        Ok(raw) => match raw.parse() {
            Ok(p) => p,
            Err(_) => {
                error!(%raw, "invalid PORT");
                std::process::exit(1);
            }
        },
        Err(_) => 9001,
    };

    let store = Arc::new(SlotStore::new());
    let cancel = CancellationToken::new();
    let sweeper = spawn_sweeper(Arc::clone(&store), SWEEP_INTERVAL, SLOT_TTL, cancel.clone());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            shutdown.cancel();
        }
    });

    serve(store, listener, cancel).await?;
    let _ = sweeper.await;
    Ok(())
}
