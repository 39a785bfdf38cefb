//! Pass-through to the trading backend

use axum::extract::{Request, State};

use crate::api::server::AppState;
use crate::proxy::{ForwardOptions, ProxyResponse};

/// Local prefix stripped before forwarding
pub const PROXY_PREFIX: &str = "/api/backend";

/// Forward `/api/backend/<path>?<query>` to `<backend>/api/v1/<path>?<query>`
pub async fn forward(State(state): State<AppState>, req: Request) -> ProxyResponse {
    let backend_path = backend_path(req.uri().path(), req.uri().query());

    state
        .forwarder
        .forward(req, &backend_path, ForwardOptions::default())
        .await
}

fn backend_path(path: &str, query: Option<&str>) -> String {
    let rest = path.strip_prefix(PROXY_PREFIX).unwrap_or(path);
    let rest = if rest.starts_with('/') {
        rest.to_string()
    } else {
        format!("/{}", rest)
    };

    match query {
        Some(query) if !query.is_empty() => format!("{}?{}", rest, query),
        _ => rest,
    }
}
