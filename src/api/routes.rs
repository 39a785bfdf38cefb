//! API route definitions

use axum::routing::{any, delete, get, post};
use axum::Router;

use super::handlers;
use super::server::AppState;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (no auth required)
        .route("/health", get(handlers::health::health_check))
        .route("/api/status", get(handlers::health::status))
        // Auth routes
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/logout", post(handlers::auth::logout))
        // Signal receipt, authenticated by webhook signature
        .route("/webhooks/:id", post(handlers::webhooks::receive_signal))
        // Backend pass-through, authorization resolved by the forwarder
        .route("/api/backend/*path", any(handlers::proxy::forward))
        // Session-protected routes
        .nest("/api", protected_routes())
        .with_state(state)
}

/// Routes that require a session
fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/session", get(handlers::auth::session))
        // Webhook management
        .route(
            "/webhooks",
            get(handlers::webhooks::list_webhooks).post(handlers::webhooks::create_webhook),
        )
        .route(
            "/webhooks/:id",
            get(handlers::webhooks::get_webhook).delete(handlers::webhooks::delete_webhook),
        )
        .route("/webhooks/:id/toggle", post(handlers::webhooks::toggle_webhook))
        .route("/webhooks/:id/test", post(handlers::webhooks::test_webhook))
        // Exchange accounts
        .route(
            "/accounts",
            get(handlers::accounts::list_accounts).post(handlers::accounts::create_account),
        )
        .route("/accounts/:id", delete(handlers::accounts::delete_account))
}
