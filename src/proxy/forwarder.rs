//! Backend request forwarder
//!
//! Re-issues local API calls against the trading backend under
//! `/api/v1`, resolving the caller's bearer token on the way, and relays
//! the backend's status and body. One call is one request: no retries,
//! no caching, no timeout. If the caller goes away, axum drops the
//! handler future and the in-flight backend request with it.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE};
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use http_body_util::LengthLimitError;
use serde_json::{json, Value};
use tracing::{debug, error, instrument, warn};

use crate::config::BackendConfig;
use crate::error::Result;

/// Largest inbound body re-serialized towards the backend
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Resolves a backend token from the request's session
pub trait SessionLookup: Send + Sync {
    /// Backend access token for the session attached to these headers
    fn access_token(&self, headers: &HeaderMap) -> Option<String>;
}

/// Per-call overrides
#[derive(Debug, Clone, Default)]
pub struct ForwardOptions {
    /// Method to use instead of the inbound one
    pub method: Option<Method>,
    /// Extra outgoing headers, applied after the JSON content type
    pub headers: HeaderMap,
    /// Body to send instead of the inbound one
    pub body: Option<Value>,
}

impl ForwardOptions {
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Relayed backend body
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyBody {
    Json(Value),
    Text(String),
}

/// Relayed backend response
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub body: ProxyBody,
}

impl ProxyResponse {
    /// Local answer for a request that never reached the backend
    pub fn proxy_error(details: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ProxyBody::Json(json!({
                "error": "Proxy error",
                "details": details.into(),
            })),
        }
    }

    /// Local answer for a request rejected before forwarding
    pub fn local(status: StatusCode, error: &str) -> Self {
        Self {
            status,
            body: ProxyBody::Json(json!({ "error": error })),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// JSON body, if the backend answered with JSON
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            ProxyBody::Json(value) => Some(value),
            ProxyBody::Text(_) => None,
        }
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        match self.body {
            ProxyBody::Json(value) => (self.status, Json(value)).into_response(),
            ProxyBody::Text(text) => (
                self.status,
                [(CONTENT_TYPE, "text/plain; charset=utf-8")],
                text,
            )
                .into_response(),
        }
    }
}

/// Forwards requests to the trading backend
#[derive(Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    backend: BackendConfig,
    sessions: Arc<dyn SessionLookup>,
}

impl Forwarder {
    pub fn new(backend: BackendConfig, sessions: Arc<dyn SessionLookup>) -> Self {
        Self {
            client: reqwest::Client::new(),
            backend,
            sessions,
        }
    }

    pub fn backend(&self) -> &BackendConfig {
        &self.backend
    }

    /// Authorization for the outgoing request.
    ///
    /// An inbound Authorization header is passed through untouched and the
    /// session is not consulted.
    pub fn resolve_authorization(&self, inbound: &HeaderMap) -> Option<HeaderValue> {
        if let Some(value) = inbound.get(AUTHORIZATION) {
            return Some(value.clone());
        }

        let token = self.sessions.access_token(inbound)?;
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Session access token is not a valid header value");
                None
            }
        }
    }

    /// Forward an inbound request to `backend_path`
    #[instrument(skip(self, req, options), fields(method = %req.method(), backend_path = %backend_path))]
    pub async fn forward(
        &self,
        req: Request<Body>,
        backend_path: &str,
        options: ForwardOptions,
    ) -> ProxyResponse {
        let (parts, body) = req.into_parts();
        let method = options.method.clone().unwrap_or_else(|| parts.method.clone());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.extend(options.headers);

        if let Some(authorization) = self.resolve_authorization(&parts.headers) {
            headers.insert(AUTHORIZATION, authorization);
        } else {
            debug!("Forwarding without authorization");
        }

        if let Some(cookie) = joined_cookies(&parts.headers) {
            headers.insert(COOKIE, cookie);
        }

        let payload = match options.body {
            Some(value) => Some(value),
            None if has_body(&parts.method) => match read_json_body(body).await {
                Ok(payload) => payload,
                Err(rejection) => return rejection,
            },
            None => None,
        };

        self.relay(method, backend_path, headers, payload).await
    }

    /// Send a server-originated request to `backend_path`
    pub async fn dispatch(
        &self,
        method: Method,
        backend_path: &str,
        extra_headers: HeaderMap,
        body: Option<Value>,
    ) -> ProxyResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.extend(extra_headers);

        self.relay(method, backend_path, headers, body).await
    }

    async fn relay(
        &self,
        method: Method,
        backend_path: &str,
        headers: HeaderMap,
        payload: Option<Value>,
    ) -> ProxyResponse {
        match self.send(method, backend_path, headers, payload).await {
            Ok(response) => response,
            Err(e) => {
                error!(backend_path = %backend_path, error = %e, "Backend request failed");
                ProxyResponse::proxy_error(e.to_string())
            }
        }
    }

    async fn send(
        &self,
        method: Method,
        backend_path: &str,
        headers: HeaderMap,
        payload: Option<Value>,
    ) -> Result<ProxyResponse> {
        let url = self.backend.endpoint(backend_path);
        debug!(url = %url, method = %method, "Forwarding to backend");

        let mut request = self.client.request(method, &url).headers(headers);
        if let Some(value) = payload {
            request = request.body(value.to_string());
        }

        let response = request.send().await?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(is_json_content_type)
            .unwrap_or(false);

        let text = response.text().await?;
        let body = if is_json {
            match serde_json::from_str(&text) {
                Ok(value) => ProxyBody::Json(value),
                Err(e) => {
                    warn!(error = %e, "Backend sent malformed JSON, relaying as text");
                    ProxyBody::Text(text)
                }
            }
        } else {
            ProxyBody::Text(text)
        };

        debug!(status = %status, "Backend responded");
        Ok(ProxyResponse { status, body })
    }
}

fn has_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// Inbound cookies as a single header value
fn joined_cookies(headers: &HeaderMap) -> Option<HeaderValue> {
    let values: Vec<&str> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    match values.as_slice() {
        [] => None,
        [single] => HeaderValue::from_str(single).ok(),
        many => HeaderValue::from_str(&many.join("; ")).ok(),
    }
}

/// Re-read an inbound JSON body.
///
/// Empty or non-JSON bodies become "no body". A body that cannot be read
/// at all is answered locally.
async fn read_json_body(body: Body) -> std::result::Result<Option<Value>, ProxyResponse> {
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let inner = e.into_inner();
            if inner.is::<LengthLimitError>() {
                warn!(limit = MAX_BODY_BYTES, "Inbound body too large");
                return Err(ProxyResponse::local(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "Request body too large",
                ));
            }
            warn!(error = %inner, "Failed to read inbound body");
            return Err(ProxyResponse::local(
                StatusCode::BAD_REQUEST,
                "Failed to read request body",
            ));
        }
    };

    if bytes.is_empty() {
        return Ok(None);
    }

    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(error = %e, "Inbound body is not JSON, forwarding without body");
            Ok(None)
        }
    }
}
