//! Fixtures shared by handler tests

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;

use crate::config::{
    ApiServerConfig, BackendConfig, Config, DatabaseConfig, LogConfig, SessionConfig,
    VaultConfig, WebhookConfig,
};
use crate::crypto::Vault;
use crate::repository::memory::{MemoryAccountStore, MemoryWebhookStore};

use super::server::{ApiServer, AppState};

pub struct TestApp {
    pub state: AppState,
    pub webhooks: Arc<MemoryWebhookStore>,
    pub accounts: Arc<MemoryAccountStore>,
}

impl TestApp {
    pub fn router(&self) -> Router {
        ApiServer::new(self.state.clone()).router()
    }

    /// Cookie header value for a session of `user_id`
    pub fn session_cookie(&self, user_id: &str, access_token: Option<&str>) -> String {
        let token = self
            .state
            .sessions
            .issue(user_id, access_token.map(String::from))
            .unwrap();
        format!("tg_session={}", token)
    }

    /// Request carrying a session cookie
    pub fn authed(&self, method: &str, uri: &str, user_id: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, self.session_cookie(user_id, None))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .unwrap()
    }
}

pub fn test_config(backend_url: &str) -> Config {
    Config {
        api: ApiServerConfig {
            port: 3001,
            host: "127.0.0.1".to_string(),
            cors_origins: Vec::new(),
        },
        backend: BackendConfig {
            base_url: backend_url.trim_end_matches('/').to_string(),
        },
        session: SessionConfig {
            jwt_secret: "test-secret".to_string(),
            cookie_name: "tg_session".to_string(),
            ttl_hours: 24,
        },
        webhook: WebhookConfig {
            rate_limit_max: 60,
            rate_limit_window_ms: 60_000,
            require_signature: false,
            sweep_interval_secs: 300,
        },
        vault: VaultConfig {
            encryption_key: "test-master-key".to_string(),
        },
        database: DatabaseConfig {
            host: "localhost".to_string(),
            port: 5432,
            user: "tradegate".to_string(),
            password: "tradegate_password".to_string(),
            name: "tradegate".to_string(),
            ssl_mode: "disable".to_string(),
            max_connections: 20,
            min_connections: 2,
        },
        log: LogConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

pub fn test_app_with(config: Config) -> TestApp {
    let webhooks = Arc::new(MemoryWebhookStore::default());
    let accounts = Arc::new(MemoryAccountStore::default());
    let state = AppState::new(config, webhooks.clone(), accounts.clone())
        .with_vault(Vault::with_iterations("test-master-key", 1_000));

    TestApp {
        state,
        webhooks,
        accounts,
    }
}

/// App whose backend is `backend_url`; unroutable by default
pub fn test_app(backend_url: &str) -> TestApp {
    test_app_with(test_config(backend_url))
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
