use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Webhook entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Webhook {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// Never serialized; only returned once through [`WebhookCreated`]
    #[serde(skip_serializing)]
    pub secret: String,
    pub is_active: bool,
    pub trigger_count: i64,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Webhook {
    /// Relative URL alerting tools post signals to
    pub fn receive_path(&self) -> String {
        format!("/webhooks/{}", self.id)
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Fields for a new webhook row
#[derive(Debug, Clone)]
pub struct NewWebhook {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub secret: String,
}

/// Request to create a webhook
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateWebhookRequest {
    pub name: Option<String>,
}

/// Response to webhook creation, the only place the secret is shown
#[derive(Debug, Clone, Serialize)]
pub struct WebhookCreated {
    #[serde(flatten)]
    pub webhook: Webhook,
    pub secret: String,
    pub url: String,
}

impl From<Webhook> for WebhookCreated {
    fn from(webhook: Webhook) -> Self {
        let secret = webhook.secret.clone();
        let url = webhook.receive_path();
        WebhookCreated {
            webhook,
            secret,
            url,
        }
    }
}

/// Signal as forwarded to the trading backend
#[derive(Debug, Clone, Serialize)]
pub struct SignalDispatch {
    pub webhook_id: String,
    pub user_id: String,
    #[serde(flatten)]
    pub signal: crate::webhook::Signal,
}
