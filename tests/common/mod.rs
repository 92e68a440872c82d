//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use purchase_verifier::config::VerifierConfig;
use purchase_verifier::store::InMemoryStore;
use purchase_verifier::{HttpServer, Shutdown};

pub const ITEMS: &str = "artworks";
pub const PURCHASES: &str = "purchases";

/// A verifier running on an ephemeral port, backed by an in-memory store.
pub struct TestVerifier {
    pub addr: SocketAddr,
    pub store: InMemoryStore,
    pub shutdown: Arc<Shutdown>,
    /// Configuration the server started with.
    pub config: VerifierConfig,
    /// Feeds the server's reload task, as the file watcher does.
    pub config_updates: mpsc::UnboundedSender<VerifierConfig>,
}

impl TestVerifier {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Write an item document the way the payment webhook does.
    pub fn mark_sold(&self, item_id: &str, payment_intent_id: &str) {
        self.store.put_json(
            ITEMS,
            item_id,
            json!({ "sold": true, "paymentIntentId": payment_intent_id }),
        );
    }

    pub fn record_purchase(&self, id: &str, product_id: &str, payment_intent_id: &str, buyer_id: &str) {
        self.store.put_json(
            PURCHASES,
            id,
            json!({
                "productId": product_id,
                "paymentIntentId": payment_intent_id,
                "buyerId": buyer_id,
            }),
        );
    }
}

/// Start a verifier polling every `interval_ms` for at most `max_attempts`.
pub async fn start_verifier(interval_ms: u64, max_attempts: u32) -> TestVerifier {
    let mut config = VerifierConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.polling.interval_ms = interval_ms;
    config.polling.max_interval_ms = interval_ms;
    config.polling.max_attempts = max_attempts;
    config.polling.attempt_timeout_ms = 1000;
    config.timeouts.request_secs = 30;

    let store = InMemoryStore::new();
    let shutdown = Arc::new(Shutdown::new());
    let (update_tx, config_updates) = mpsc::unbounded_channel();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config.clone(), Arc::new(store.clone()), shutdown.cancel_handle());
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    TestVerifier {
        addr,
        store,
        shutdown,
        config,
        config_updates: update_tx,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
