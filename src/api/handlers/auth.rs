//! Authentication handlers
//!
//! Credentials are checked by the trading backend. On success the
//! backend's access token moves into the HttpOnly session cookie and is
//! removed from the relayed login body, so page scripts never see it.

use axum::extract::{Request, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::api::middleware::AuthenticatedUser;
use crate::api::server::AppState;
use crate::error::{GateError, Result};
use crate::proxy::{ForwardOptions, ProxyBody, ProxyResponse};

/// Login response fields holding the backend token
const TOKEN_FIELDS: [&str; 2] = ["access_token", "token"];

/// Handle login request
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Value>,
) -> Result<Response> {
    let mut proxied = state
        .forwarder
        .dispatch(
            Method::POST,
            "/auth/login",
            HeaderMap::new(),
            Some(credentials.clone()),
        )
        .await;

    if !proxied.is_success() {
        warn!(status = %proxied.status, "Backend rejected login");
        return Ok(proxied.into_response());
    }

    let Some((user_id, access_token)) = session_identity(&proxied, &credentials) else {
        warn!("Backend login response carries no usable token or user");
        return Ok(proxied.into_response());
    };

    let token = state.sessions.issue(&user_id, Some(access_token))?;
    let cookie = HeaderValue::from_str(&state.sessions.set_cookie(&token))
        .map_err(|_| GateError::Internal("session cookie is not a valid header".to_string()))?;

    if let ProxyBody::Json(Value::Object(body)) = &mut proxied.body {
        for field in TOKEN_FIELDS {
            body.remove(field);
        }
    }

    info!(user_id = %user_id, "User logged in");

    let mut response = proxied.into_response();
    response.headers_mut().insert(SET_COOKIE, cookie);
    Ok(response)
}

/// Forward a registration to the backend
pub async fn register(State(state): State<AppState>, req: Request) -> ProxyResponse {
    state
        .forwarder
        .forward(req, "/auth/register", ForwardOptions::default())
        .await
}

/// End the session
pub async fn logout(State(state): State<AppState>) -> Result<Response> {
    let cookie = HeaderValue::from_str(&state.sessions.clear_cookie())
        .map_err(|_| GateError::Internal("session cookie is not a valid header".to_string()))?;

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(json!({ "success": true })),
    )
        .into_response())
}

/// Current session
pub async fn session(user: AuthenticatedUser) -> impl IntoResponse {
    Json(json!({
        "user_id": user.user_id,
        "expires_at": user.claims.exp,
        "backend_token": user.claims.access_token.is_some(),
    }))
}

/// Backend token and user id from a successful login response.
///
/// The user id is taken from `user.id`, `user_id` or `user.email` in the
/// response, then from the submitted `email` or `username`.
fn session_identity(proxied: &ProxyResponse, credentials: &Value) -> Option<(String, String)> {
    let body = proxied.json()?;

    let access_token = body
        .get("access_token")
        .or_else(|| body.get("token"))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())?;

    let user_id = [
        body.pointer("/user/id"),
        body.get("user_id"),
        body.pointer("/user/email"),
        credentials.get("email"),
        credentials.get("username"),
    ]
    .into_iter()
    .flatten()
    .find_map(id_string)?;

    Some((user_id, access_token.to_string()))
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
