//! CORS for the browser dashboard
//!
//! The dashboard sends the session cookie, so origins are an explicit
//! whitelist rather than a wildcard.

use axum::http::header::{self, HeaderName};
use axum::http::{HeaderValue, Method};
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};

/// Origins allowed when none are configured
const DEFAULT_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];

/// Create a CORS layer for the configured origins
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = resolve_origins(allowed_origins);
    debug!(origins = ?origins, "CORS origins");

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-webhook-signature"),
        ])
        .expose_headers([
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderName::from_static("x-ratelimit-remaining"),
            HeaderName::from_static("x-ratelimit-reset"),
        ])
        .allow_credentials(true)
}

/// Parse configured origins, dropping trailing slashes and invalid entries.
///
/// Falls back to the localhost dashboard when nothing usable is configured.
fn resolve_origins(configured: &[String]) -> Vec<HeaderValue> {
    let origins: Vec<HeaderValue> = configured
        .iter()
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return DEFAULT_ORIGINS
            .iter()
            .map(|&origin| HeaderValue::from_static(origin))
            .collect();
    }

    origins
}
