//! Purchase Verifier service.
//!
//! # Architecture Overview
//!
//! ```text
//!   Checkout UI                                         Payment webhook
//!       │ payment authorized                                  │ (external writer)
//!       ▼                                                     ▼
//!  ┌──────────┐   ┌───────────┐   ┌────────────┐   ┌──────────────────┐
//!  │   http   │──▶│ verifier  │──▶│ poll_until │──▶│  document store  │
//!  │ handlers │   │ (2 kinds) │   │ (bounded)  │   │ memory|firestore │
//!  └──────────┘   └───────────┘   └────────────┘   └──────────────────┘
//!       ▲                               │
//!       └──── confirmed / pending / cancelled
//!
//!  Cross-cutting: config (+ hot reload), logging, metrics, shutdown
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use purchase_verifier::config::watcher::ConfigWatcher;
use purchase_verifier::config::{load_config, StoreKind, VerifierConfig};
use purchase_verifier::lifecycle::{signals, Shutdown};
use purchase_verifier::observability::{logging, metrics};
use purchase_verifier::store::{DocumentStore, FirestoreStore, InMemoryStore};
use purchase_verifier::HttpServer;

#[derive(Parser)]
#[command(name = "purchase-verifier")]
#[command(about = "Confirms payment webhook writes before checkout reports success", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the configuration file when it changes.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => VerifierConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("purchase-verifier v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        store = ?config.store.kind,
        max_attempts = config.polling.max_attempts,
        interval_ms = config.polling.interval_ms,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store: Arc<dyn DocumentStore> = match config.store.kind {
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory document store; nothing is persisted");
            Arc::new(InMemoryStore::new())
        }
        StoreKind::Firestore => Arc::new(FirestoreStore::new(&config.store)?),
    };

    let shutdown = Arc::new(Shutdown::new());
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::trigger_on_signal(&signal_shutdown).await;
    });

    // The watcher must stay alive for the lifetime of the server.
    let (_watcher, config_updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path, &config);
            (Some(watcher.run()?), updates)
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, store, shutdown.cancel_handle());
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
