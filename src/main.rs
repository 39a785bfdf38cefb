//! Tradegate - Entry Point
//!
//! Starts the API server and the rate limit sweeper with graceful
//! shutdown support.

use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tradegate::api::{ApiServer, AppState};
use tradegate::config::LogConfig;
use tradegate::repository::{AccountRepository, WebhookRepository};
use tradegate::services::{RateLimitSweeper, RateLimitSweeperHandle};
use tradegate::{Config, Database};

#[tokio::main]
async fn main() -> tradegate::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    init_tracing(&config.log);

    info!("Starting Tradegate");
    info!(backend = %config.backend.base_url, "Configuration loaded");

    // Connect to database
    let db = Database::new(&config).await?;

    // Run migrations
    db.run_migrations().await?;

    let webhooks = Arc::new(WebhookRepository::new(db.pool().clone()));
    let accounts = Arc::new(AccountRepository::new(db.pool().clone()));
    let state = AppState::new(config.clone(), webhooks, accounts);

    // Start rate limit sweeper
    let (sweeper_handle, sweeper_shutdown) = RateLimitSweeperHandle::new();
    let sweeper = RateLimitSweeper::new(
        state.rate_limiter.clone(),
        config.webhook.sweep_interval_secs,
    );
    let sweeper_task = tokio::spawn(async move {
        sweeper.run(sweeper_shutdown).await;
    });

    // Start API server
    let (shutdown_tx, api_shutdown) = watch::channel(false);
    let api_server = ApiServer::new(state);
    let api_task = tokio::spawn(async move {
        if let Err(e) = api_server.run(api_shutdown).await {
            error!("API server error: {}", e);
        }
    });

    info!("Server started - API: {}", config.api_addr());

    // Wait for shutdown signal
    shutdown_signal().await;
    info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    sweeper_handle.shutdown();

    let _ = tokio::join!(api_task, sweeper_task);

    db.close().await;

    info!("Tradegate stopped");
    Ok(())
}

/// Install the global subscriber; `RUST_LOG` overrides `LOG_LEVEL`
fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("tradegate={},tower_http=debug", log.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if log.format.eq_ignore_ascii_case("pretty") {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
