//! Webhook management and signal receipt

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::api::middleware::AuthenticatedUser;
use crate::api::server::AppState;
use crate::error::{GateError, Result};
use crate::models::{CreateWebhookRequest, NewWebhook, SignalDispatch, Webhook, WebhookCreated};
use crate::webhook::{
    generate_id, generate_secret, parse_signal, sign, verify_signal, RateLimitDecision, Signal,
    SignalAction, SIGNATURE_HEADER,
};

/// Backend path receiving accepted signals
const SIGNAL_PATH: &str = "/signals/webhook";

const MAX_NAME_LEN: usize = 255;

static RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
static RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
static RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// List the caller's webhooks
pub async fn list_webhooks(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse> {
    let webhooks = state.webhooks.list_for_user(&user.user_id).await?;
    Ok(Json(webhooks))
}

/// Create a webhook; the response is the only place its secret appears
pub async fn create_webhook(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    req: Option<Json<CreateWebhookRequest>>,
) -> Result<impl IntoResponse> {
    let req = req.map(|Json(req)| req).unwrap_or_default();
    let id = generate_id();

    let name = match req.name.as_deref().map(str::trim) {
        Some(name) if name.len() > MAX_NAME_LEN => {
            return Err(GateError::InvalidRequest(format!(
                "Name must be at most {} characters",
                MAX_NAME_LEN
            )));
        }
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("Webhook {}", &id[..8]),
    };

    let webhook = state
        .webhooks
        .create(&NewWebhook {
            id,
            user_id: user.user_id.clone(),
            name,
            secret: generate_secret(),
        })
        .await?;

    info!(id = %webhook.id, user_id = %user.user_id, "Created webhook");

    Ok((StatusCode::CREATED, Json(WebhookCreated::from(webhook))))
}

/// Get one of the caller's webhooks
pub async fn get_webhook(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let webhook = owned_webhook(&state, &user, &id).await?;
    Ok(Json(webhook))
}

/// Delete one of the caller's webhooks
pub async fn delete_webhook(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    if !state.webhooks.delete(&id, &user.user_id).await? {
        return Err(GateError::WebhookNotFound { id });
    }

    info!(id = %id, user_id = %user.user_id, "Deleted webhook");
    Ok(StatusCode::NO_CONTENT)
}

/// Flip a webhook between active and inactive
pub async fn toggle_webhook(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let current = owned_webhook(&state, &user, &id).await?;

    let webhook = state
        .webhooks
        .set_active(&id, &user.user_id, !current.is_active)
        .await?
        .ok_or_else(|| GateError::WebhookNotFound { id: id.clone() })?;

    info!(id = %webhook.id, is_active = webhook.is_active, "Toggled webhook");
    Ok(Json(webhook))
}

/// Signed sample payload for wiring up an alerting tool
pub async fn test_webhook(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let webhook = owned_webhook(&state, &user, &id).await?;

    let sample = Signal {
        action: SignalAction::Buy,
        symbol: "BTC/USDT".to_string(),
        price: Some(50_000.0),
        timestamp: Utc::now().timestamp(),
        signature: None,
    };
    let payload = serde_json::to_string(&sample)
        .map_err(|e| GateError::Internal(format!("failed to encode sample signal: {}", e)))?;
    let signature = sign(&payload, &webhook.secret);

    Ok(Json(json!({
        "payload": payload,
        "signature": signature,
        "header": "X-Webhook-Signature",
    })))
}

/// Receive a signal from an alerting tool
#[instrument(skip(state, headers, body), fields(webhook_id = %id))]
pub async fn receive_signal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let webhook = state
        .webhooks
        .get(&id)
        .await?
        .ok_or_else(|| GateError::WebhookNotFound { id: id.clone() })?;

    if !webhook.is_active {
        debug!("Signal for inactive webhook");
        return Err(GateError::WebhookInactive { id });
    }

    let decision = state.rate_limiter.check(&webhook.id);
    let limit = state.rate_limiter.max_requests();
    if !decision.allowed {
        warn!(reset_at = decision.reset_at, "Webhook rate limit exceeded");
        let mut response = GateError::RateLimitExceeded {
            webhook_id: webhook.id,
        }
        .into_response();
        insert_rate_limit_headers(response.headers_mut(), limit, &decision);
        return Ok(response);
    }

    let raw = std::str::from_utf8(&body).map_err(|_| GateError::InvalidSignal)?;
    let signal = parse_signal(raw).ok_or(GateError::InvalidSignal)?;

    let header_signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    verify_signal(
        raw,
        header_signature,
        &signal,
        &webhook.secret,
        state.config.webhook.require_signature,
    )
    .inspect_err(|e| warn!(error = %e, "Signal rejected"))?;

    state
        .webhooks
        .record_trigger(&webhook.id)
        .await?
        .ok_or_else(|| GateError::WebhookNotFound {
            id: webhook.id.clone(),
        })?;

    info!(
        action = %signal.action,
        symbol = %signal.symbol,
        "Signal accepted"
    );

    let dispatch = SignalDispatch {
        webhook_id: webhook.id,
        user_id: webhook.user_id,
        signal: Signal {
            signature: None,
            ..signal
        },
    };
    let payload = serde_json::to_value(&dispatch)
        .map_err(|e| GateError::Internal(format!("failed to encode signal: {}", e)))?;

    let proxied = state
        .forwarder
        .dispatch(Method::POST, SIGNAL_PATH, HeaderMap::new(), Some(payload))
        .await;

    let mut response = proxied.into_response();
    insert_rate_limit_headers(response.headers_mut(), limit, &decision);
    Ok(response)
}

async fn owned_webhook(state: &AppState, user: &AuthenticatedUser, id: &str) -> Result<Webhook> {
    state
        .webhooks
        .get(id)
        .await?
        .filter(|webhook| webhook.is_owned_by(&user.user_id))
        .ok_or_else(|| GateError::WebhookNotFound { id: id.to_string() })
}

fn insert_rate_limit_headers(headers: &mut HeaderMap, limit: u32, decision: &RateLimitDecision) {
    headers.insert(RATE_LIMIT_LIMIT.clone(), HeaderValue::from(limit));
    headers.insert(RATE_LIMIT_REMAINING.clone(), HeaderValue::from(decision.remaining));
    headers.insert(RATE_LIMIT_RESET.clone(), HeaderValue::from(decision.reset_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::Value;
    use tower::ServiceExt;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use std::sync::Arc;

    use crate::api::test_support::{
        body_json as read_json, test_app, test_app_with, test_config, TestApp,
    };
    use crate::api::ApiServer;
    use crate::repository::memory::{MemoryAccountStore, MemoryWebhookStore};
    use crate::repository::WebhookStore;

    fn stored_webhook(app: &TestApp, id: &str, active: bool) -> Webhook {
        let webhook = Webhook {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            name: "TradingView".to_string(),
            secret: "s3cret".to_string(),
            is_active: active,
            trigger_count: 0,
            last_triggered_at: None,
            created_at: Utc::now(),
        };
        app.webhooks.insert(webhook.clone());
        webhook
    }

    fn signal_request(id: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/webhooks/{}", id))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn accepting_backend() -> MockServer {
        let backend = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/signals/webhook"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"queued": true})))
            .mount(&backend)
            .await;
        backend
    }

    const SIGNAL: &str = r#"{"action":"BUY","symbol":"BTC/USDT","price":50000,"timestamp":1700000000}"#;

    #[tokio::test]
    async fn test_unknown_webhook_is_404() {
        let app = test_app("http://127.0.0.1:9");

        let response = app.router().oneshot(signal_request("missing", SIGNAL)).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_inactive_webhook_is_403() {
        let app = test_app("http://127.0.0.1:9");
        stored_webhook(&app, "wh-1", false);

        let response = app.router().oneshot(signal_request("wh-1", SIGNAL)).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_invalid_signal_is_400() {
        let app = test_app("http://127.0.0.1:9");
        stored_webhook(&app, "wh-1", true);

        for body in ["not json", r#"{"action":"HOLD","symbol":"BTC"}"#, r#"{"symbol":"BTC"}"#] {
            let response = app.router().oneshot(signal_request("wh-1", body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        }
        assert_eq!(app.webhooks.snapshot("wh-1").unwrap().trigger_count, 0);
    }

    #[tokio::test]
    async fn test_accepted_signal_is_forwarded_and_counted() {
        let backend = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/signals/webhook"))
            .and(body_json(json!({
                "webhook_id": "wh-1",
                "user_id": "user-1",
                "action": "BUY",
                "symbol": "BTC/USDT",
                "price": 50000.0,
                "timestamp": 1700000000
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({"queued": true})))
            .expect(1)
            .mount(&backend)
            .await;

        let app = test_app(&backend.uri());
        stored_webhook(&app, "wh-1", true);

        let response = app.router().oneshot(signal_request("wh-1", SIGNAL)).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()["x-ratelimit-limit"], "60");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "59");
        assert_eq!(read_json(response).await["queued"], true);

        let stored = app.webhooks.snapshot("wh-1").unwrap();
        assert_eq!(stored.trigger_count, 1);
        assert!(stored.last_triggered_at.is_some());
    }

    #[tokio::test]
    async fn test_header_signature_is_checked() {
        let backend = accepting_backend().await;
        let app = test_app(&backend.uri());
        stored_webhook(&app, "wh-1", true);

        let good = sign(SIGNAL, "s3cret");
        let mut request = signal_request("wh-1", SIGNAL);
        request
            .headers_mut()
            .insert(SIGNATURE_HEADER, HeaderValue::from_str(&good).unwrap());
        let response = app.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bad = sign(SIGNAL, "other-secret");
        let mut request = signal_request("wh-1", SIGNAL);
        request
            .headers_mut()
            .insert(SIGNATURE_HEADER, HeaderValue::from_str(&bad).unwrap());
        let response = app.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        assert_eq!(app.webhooks.snapshot("wh-1").unwrap().trigger_count, 1);
    }

    #[tokio::test]
    async fn test_embedded_signature_is_checked() {
        let backend = accepting_backend().await;
        let app = test_app(&backend.uri());
        stored_webhook(&app, "wh-1", true);

        let canonical = crate::webhook::canonical_payload(SIGNAL).unwrap();
        let mut payload: Value = serde_json::from_str(SIGNAL).unwrap();
        payload["signature"] = json!(sign(&canonical, "s3cret"));
        let response = app
            .router()
            .oneshot(signal_request("wh-1", &payload.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        payload["signature"] = json!("00".repeat(32));
        let response = app
            .router()
            .oneshot(signal_request("wh-1", &payload.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unsigned_signal_rejected_when_signature_required() {
        let mut config = test_config("http://127.0.0.1:9");
        config.webhook.require_signature = true;
        let app = test_app_with(config);
        stored_webhook(&app, "wh-1", true);

        let response = app.router().oneshot(signal_request("wh-1", SIGNAL)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rate_limit_returns_429_with_headers() {
        let backend = accepting_backend().await;
        let mut config = test_config(&backend.uri());
        config.webhook.rate_limit_max = 2;
        let app = test_app_with(config);
        stored_webhook(&app, "wh-1", true);

        for _ in 0..2 {
            let response = app.router().oneshot(signal_request("wh-1", SIGNAL)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.router().oneshot(signal_request("wh-1", SIGNAL)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["x-ratelimit-limit"], "2");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
        assert!(response.headers().contains_key("x-ratelimit-reset"));
        assert_eq!(app.webhooks.snapshot("wh-1").unwrap().trigger_count, 2);
    }

    #[tokio::test]
    async fn test_backend_down_still_counts_trigger() {
        let app = test_app("http://127.0.0.1:9");
        stored_webhook(&app, "wh-1", true);

        let response = app.router().oneshot(signal_request("wh-1", SIGNAL)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(read_json(response).await["error"], "Proxy error");
        assert_eq!(app.webhooks.snapshot("wh-1").unwrap().trigger_count, 1);
    }

    #[tokio::test]
    async fn test_create_and_list_webhooks() {
        let app = test_app("http://127.0.0.1:9");

        let response = app
            .router()
            .oneshot(app.authed(
                "POST",
                "/api/webhooks",
                "user-1",
                Body::from(r#"{"name":"  TradingView  "}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = read_json(response).await;
        assert_eq!(created["name"], "TradingView");
        assert_eq!(created["secret"].as_str().unwrap().len(), 64);
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["url"], format!("/webhooks/{}", id));

        let response = app
            .router()
            .oneshot(app.authed("GET", "/api/webhooks", "user-1", Body::empty()))
            .await
            .unwrap();
        let listed = read_json(response).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert!(listed[0].get("secret").is_none());

        let response = app
            .router()
            .oneshot(app.authed("GET", "/api/webhooks", "user-2", Body::empty()))
            .await
            .unwrap();
        assert!(read_json(response).await.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_without_body_uses_default_name() {
        let app = test_app("http://127.0.0.1:9");

        let response = app
            .router()
            .oneshot(app.authed("POST", "/api/webhooks", "user-1", Body::empty()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(read_json(response)
            .await["name"]
            .as_str()
            .unwrap()
            .starts_with("Webhook "));
    }

    #[tokio::test]
    async fn test_management_requires_session() {
        let app = test_app("http://127.0.0.1:9");

        let response = app
            .router()
            .oneshot(
                Request::builder()
                    .uri("/api/webhooks")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_other_users_webhook_is_hidden() {
        let app = test_app("http://127.0.0.1:9");
        stored_webhook(&app, "wh-1", true);

        for (method, uri) in [
            ("GET", "/api/webhooks/wh-1"),
            ("DELETE", "/api/webhooks/wh-1"),
            ("POST", "/api/webhooks/wh-1/toggle"),
            ("POST", "/api/webhooks/wh-1/test"),
        ] {
            let response = app
                .router()
                .oneshot(app.authed(method, uri, "user-2", Body::empty()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{} {}", method, uri);
        }
        assert!(app.webhooks.snapshot("wh-1").is_some());
    }

    #[tokio::test]
    async fn test_toggle_and_delete() {
        let app = test_app("http://127.0.0.1:9");
        stored_webhook(&app, "wh-1", true);

        let response = app
            .router()
            .oneshot(app.authed("POST", "/api/webhooks/wh-1/toggle", "user-1", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["is_active"], false);

        let response = app
            .router()
            .oneshot(app.authed("DELETE", "/api/webhooks/wh-1", "user-1", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(app.webhooks.snapshot("wh-1").is_none());
    }

    #[tokio::test]
    async fn test_sample_payload_verifies() {
        let app = test_app("http://127.0.0.1:9");
        stored_webhook(&app, "wh-1", true);

        let response = app
            .router()
            .oneshot(app.authed("POST", "/api/webhooks/wh-1/test", "user-1", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = read_json(response).await;
        let payload = body["payload"].as_str().unwrap();
        let signature = body["signature"].as_str().unwrap();

        assert!(crate::webhook::verify(payload, signature, "s3cret"));
        assert!(parse_signal(payload).is_some());
        assert_eq!(body["header"], "X-Webhook-Signature");
    }

    /// Store whose webhook disappears between lookup and trigger count
    struct VanishingStore(MemoryWebhookStore);

    #[async_trait::async_trait]
    impl WebhookStore for VanishingStore {
        async fn create(&self, new: &NewWebhook) -> Result<Webhook> {
            self.0.create(new).await
        }

        async fn get(&self, id: &str) -> Result<Option<Webhook>> {
            self.0.get(id).await
        }

        async fn list_for_user(&self, user_id: &str) -> Result<Vec<Webhook>> {
            self.0.list_for_user(user_id).await
        }

        async fn set_active(
            &self,
            id: &str,
            user_id: &str,
            active: bool,
        ) -> Result<Option<Webhook>> {
            self.0.set_active(id, user_id, active).await
        }

        async fn record_trigger(&self, _id: &str) -> Result<Option<Webhook>> {
            Ok(None)
        }

        async fn delete(&self, id: &str, user_id: &str) -> Result<bool> {
            self.0.delete(id, user_id).await
        }
    }

    #[tokio::test]
    async fn test_webhook_deleted_mid_receipt_is_404() {
        let backend = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/signals/webhook"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&backend)
            .await;

        let inner = MemoryWebhookStore::default();
        inner.insert(Webhook {
            id: "wh-1".to_string(),
            user_id: "user-1".to_string(),
            name: "TradingView".to_string(),
            secret: "s3cret".to_string(),
            is_active: true,
            trigger_count: 0,
            last_triggered_at: None,
            created_at: Utc::now(),
        });
        let state = AppState::new(
            test_config(&backend.uri()),
            Arc::new(VanishingStore(inner)),
            Arc::new(MemoryAccountStore::default()),
        );

        let response = ApiServer::new(state)
            .router()
            .oneshot(signal_request("wh-1", SIGNAL))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(read_json(response).await["error"], "Webhook not found: wh-1");
    }
}
