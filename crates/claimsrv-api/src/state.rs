//! # Application State
//!
//! Shared state passed to every handler via the `State` extractor. The
//! registry owns the versioned root; handlers never cache roots themselves.

use std::sync::Arc;

use claimsrv_registry::ClaimRegistry;
use tokio::sync::watch;

use crate::config::AppConfig;
use crate::middleware::metrics::ApiMetrics;

/// State shared by the service and admin routers.
#[derive(Clone)]
pub struct AppState {
    /// Claim store, accumulator, and root signer.
    pub registry: Arc<ClaimRegistry>,
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
    /// Prometheus metrics; `None` when disabled.
    pub metrics: Option<ApiMetrics>,
    /// Whether the root signing key was generated at startup.
    pub key_ephemeral: bool,
    /// Set to `true` to stop both listeners.
    pub shutdown: Arc<watch::Sender<bool>>,
}

impl AppState {
    /// Assemble state around an opened registry.
    pub fn new(
        registry: Arc<ClaimRegistry>,
        config: AppConfig,
        metrics: Option<ApiMetrics>,
        key_ephemeral: bool,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            registry,
            config: Arc::new(config),
            metrics,
            key_ephemeral,
            shutdown: Arc::new(shutdown),
        }
    }

    /// Ask both listeners to shut down gracefully.
    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Resolves once [`request_shutdown`](Self::request_shutdown) is called.
    pub async fn shutdown_requested(&self) {
        let mut rx = self.shutdown.subscribe();
        // The sender lives in `self`, so `wait_for` only errors if it is dropped.
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("metrics_enabled", &self.metrics.is_some())
            .field("key_ephemeral", &self.key_ephemeral)
            .finish()
    }
}
