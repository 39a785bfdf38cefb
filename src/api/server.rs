//! API server using Axum

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::config::Config;
use crate::crypto::Vault;
use crate::error::{GateError, Result};
use crate::proxy::Forwarder;
use crate::repository::{AccountStore, WebhookStore};
use crate::webhook::RateLimiter;

use super::middleware::{cors_layer, SessionAuth};
use super::routes;

/// Shared state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: SessionAuth,
    pub forwarder: Forwarder,
    pub webhooks: Arc<dyn WebhookStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub rate_limiter: RateLimiter,
    pub vault: Vault,
    pub started_at: Instant,
}

impl AppState {
    /// Wire up sessions, forwarder, limiter and vault from configuration
    pub fn new(
        config: Config,
        webhooks: Arc<dyn WebhookStore>,
        accounts: Arc<dyn AccountStore>,
    ) -> Self {
        let sessions = SessionAuth::new(&config.session);
        let forwarder = Forwarder::new(config.backend.clone(), Arc::new(sessions.clone()));
        let rate_limiter = RateLimiter::new(
            config.webhook.rate_limit_max,
            config.webhook.rate_limit_window_ms,
        );
        let vault = Vault::new(&config.vault.encryption_key);

        Self {
            config,
            sessions,
            forwarder,
            webhooks,
            accounts,
            rate_limiter,
            vault,
            started_at: Instant::now(),
        }
    }

    /// Replace the credential vault
    pub fn with_vault(mut self, vault: Vault) -> Self {
        self.vault = vault;
        self
    }
}

/// API server
pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router
    pub fn router(&self) -> Router {
        let cors = cors_layer(&self.state.config.api.cors_origins);

        routes::create_router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr: SocketAddr = self.state.config.api_addr().parse().map_err(|_| {
            GateError::InvalidConfig(format!(
                "Invalid API server address: {}",
                self.state.config.api_addr()
            ))
        })?;

        let router = self.router();

        info!("API server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await
            .map_err(|e| GateError::Internal(e.to_string()))?;

        info!("API server shut down");
        Ok(())
    }
}
