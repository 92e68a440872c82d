//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the verification endpoints
//! - Wire up middleware (request ID, tracing, request timeout)
//! - Serve plain HTTP or TLS on the given listener (certificates reload with the config)
//! - Swap the verifier when a reloaded configuration arrives
//! - Stop on the shutdown signal

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    http::Request,
    routing::{get, post},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::VerifierConfig;
use crate::http::handlers::{health, item_status, purchase_status, verify_item, verify_purchase};
use crate::http::request::{request_id, MakeRequestUuid};
use crate::http::tls::{load_tls, reload_tls};
use crate::resilience::{CancelHandle, Cancellation};
use crate::store::DocumentStore;
use crate::verification::PurchaseVerifier;

/// Grace period for open connections once shutdown starts.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// A reloaded configuration the running server cannot apply.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("worst-case verification time {budget:?} does not fit the live request timeout {limit:?}; restart to apply")]
    ExceedsRequestTimeout { budget: Duration, limit: Duration },
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Current verifier; replaced wholesale on config reload.
    pub inner: Arc<ArcSwap<PurchaseVerifier>>,
    /// Fires on shutdown, ending in-flight verifications.
    pub cancel: CancelHandle,
    /// Request timeout the router was built with. Fixed until restart.
    request_timeout: Duration,
}

impl AppState {
    pub fn new(verifier: PurchaseVerifier, cancel: CancelHandle, request_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(verifier)),
            cancel,
            request_timeout,
        }
    }

    pub fn verifier(&self) -> Arc<PurchaseVerifier> {
        self.inner.load_full()
    }

    pub fn cancellation(&self) -> Cancellation {
        self.cancel.token()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Rebuild the verifier from a reloaded configuration.
    ///
    /// The store client and the request timeout are kept; their settings only
    /// take effect on restart. A polling policy that could outlast the live
    /// request timeout is rejected and the current verifier stays in place.
    pub fn apply_config(&self, config: &VerifierConfig) -> Result<(), ReloadError> {
        let current = self.inner.load_full();
        let next = PurchaseVerifier::from_config(current.store(), config);

        let budget = next.policy().worst_case_duration();
        if budget >= self.request_timeout {
            return Err(ReloadError::ExceedsRequestTimeout {
                budget,
                limit: self.request_timeout,
            });
        }
        if Duration::from_secs(config.timeouts.request_secs) != self.request_timeout {
            tracing::warn!(
                live_secs = self.request_timeout.as_secs(),
                requested_secs = config.timeouts.request_secs,
                "Request timeout changes require a restart"
            );
        }

        tracing::info!(
            max_attempts = next.policy().max_attempts,
            backoff = ?next.policy().backoff,
            items = %next.collections().items,
            purchases = %next.collections().purchases,
            "Verifier configuration reloaded"
        );
        self.inner.store(Arc::new(next));
        Ok(())
    }
}

/// HTTP server exposing the verifier.
pub struct HttpServer {
    router: Router,
    config: VerifierConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server. `cancel` should come from the shutdown
    /// coordinator so shutdown ends in-flight verifications.
    pub fn new(config: VerifierConfig, store: Arc<dyn DocumentStore>, cancel: CancelHandle) -> Self {
        let verifier = PurchaseVerifier::from_config(store, &config);
        let request_timeout = Duration::from_secs(config.timeouts.request_secs);
        let state = AppState::new(verifier, cancel, request_timeout);
        let router = Self::build_router(state.clone());
        Self { router, config, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request.headers()),
                )
            }))
            .layer(TimeoutLayer::new(state.request_timeout()));

        Router::new()
            .route("/health", get(health))
            .route("/api/v1/verify/item", post(verify_item))
            .route("/api/v1/verify/purchase", post(verify_purchase))
            .route("/api/v1/status/item/{item_id}", get(item_status))
            .route("/api/v1/status/purchase", get(purchase_status))
            .with_state(state)
            .layer(middleware)
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<VerifierConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            tls = self.config.listener.tls.is_some(),
            "HTTP server starting"
        );

        let rustls = match &self.config.listener.tls {
            Some(tls) => Some(load_tls(tls).await?),
            None => None,
        };

        let reload_state = self.state.clone();
        let reload_tls_config = rustls.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                if let Err(e) = reload_state.apply_config(&config) {
                    tracing::error!(error = %e, "Rejected config reload, keeping current verifier");
                }
                if let (Some(live), Some(tls)) = (&reload_tls_config, &config.listener.tls) {
                    if let Err(e) = reload_tls(live, tls).await {
                        tracing::error!(error = %e, "TLS reload failed, keeping current certificate");
                    }
                }
            }
        });

        match rustls {
            Some(rustls) => {
                let handle = axum_server::Handle::new();
                let shutdown_handle = handle.clone();
                tokio::spawn(async move {
                    // A closed channel also means shutdown.
                    let _ = shutdown.recv().await;
                    shutdown_handle.graceful_shutdown(Some(DRAIN_TIMEOUT));
                });

                axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                    .handle(handle)
                    .serve(self.router.into_make_service())
                    .await?;
            }
            None => {
                axum::serve(listener, self.router)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                        tracing::info!("HTTP server draining connections");
                    })
                    .await?;
            }
        }

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Shared handler state.
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn state(config: &VerifierConfig) -> AppState {
        let verifier = PurchaseVerifier::from_config(Arc::new(InMemoryStore::new()), config);
        AppState::new(
            verifier,
            CancelHandle::new(),
            Duration::from_secs(config.timeouts.request_secs),
        )
    }

    #[test]
    fn test_reload_swaps_policy_and_collections() {
        let config = VerifierConfig::default();
        let state = state(&config);
        let before = state.verifier();

        let mut reloaded = config.clone();
        reloaded.polling.max_attempts = 3;
        reloaded.collections.items = "listings".to_string();
        state.apply_config(&reloaded).unwrap();

        let after = state.verifier();
        assert_eq!(after.policy().max_attempts, 3);
        assert_eq!(after.collections().items, "listings");
        // Calls already holding the old verifier keep its policy.
        assert_eq!(before.policy().max_attempts, 10);
        assert_eq!(before.collections().items, "artworks");
    }

    #[test]
    fn test_reload_beyond_live_request_timeout_is_rejected() {
        let config = VerifierConfig::default();
        let state = state(&config);

        // Valid on its own, but the router still enforces the 90s timeout.
        let mut reloaded = config.clone();
        reloaded.polling.max_attempts = 60;
        reloaded.timeouts.request_secs = 500;
        assert!(crate::config::validation::validate_config(&reloaded).is_ok());

        let err = state.apply_config(&reloaded).unwrap_err();
        assert!(matches!(err, ReloadError::ExceedsRequestTimeout { .. }));
        assert_eq!(state.verifier().policy().max_attempts, 10);
        assert_eq!(state.request_timeout(), Duration::from_secs(90));
    }
}
