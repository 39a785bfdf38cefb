use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::error::Result;
use crate::models::{NewWebhook, Webhook};

/// Persistence for webhooks
#[async_trait]
pub trait WebhookStore: Send + Sync {
    /// Insert a new webhook
    async fn create(&self, new: &NewWebhook) -> Result<Webhook>;

    /// Get a webhook by ID regardless of owner
    async fn get(&self, id: &str) -> Result<Option<Webhook>>;

    /// All webhooks of a user, newest first
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Webhook>>;

    /// Enable or disable a user's webhook
    async fn set_active(&self, id: &str, user_id: &str, active: bool) -> Result<Option<Webhook>>;

    /// Count an accepted signal
    async fn record_trigger(&self, id: &str) -> Result<Option<Webhook>>;

    /// Delete a user's webhook
    async fn delete(&self, id: &str, user_id: &str) -> Result<bool>;
}

/// PostgreSQL webhook repository
#[derive(Clone)]
pub struct WebhookRepository {
    pool: PgPool,
}

impl WebhookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookStore for WebhookRepository {
    async fn create(&self, new: &NewWebhook) -> Result<Webhook> {
        let webhook = sqlx::query_as::<_, Webhook>(
            r#"
            INSERT INTO webhooks (id, user_id, name, secret)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, name, secret, is_active, trigger_count,
                      last_triggered_at, created_at
            "#,
        )
        .bind(&new.id)
        .bind(&new.user_id)
        .bind(&new.name)
        .bind(&new.secret)
        .fetch_one(&self.pool)
        .await?;

        debug!(id = %webhook.id, "Inserted webhook row");
        Ok(webhook)
    }

    async fn get(&self, id: &str) -> Result<Option<Webhook>> {
        let webhook = sqlx::query_as::<_, Webhook>(
            r#"
            SELECT id, user_id, name, secret, is_active, trigger_count,
                   last_triggered_at, created_at
            FROM webhooks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(webhook)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Webhook>> {
        let webhooks = sqlx::query_as::<_, Webhook>(
            r#"
            SELECT id, user_id, name, secret, is_active, trigger_count,
                   last_triggered_at, created_at
            FROM webhooks
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(webhooks)
    }

    async fn set_active(&self, id: &str, user_id: &str, active: bool) -> Result<Option<Webhook>> {
        let webhook = sqlx::query_as::<_, Webhook>(
            r#"
            UPDATE webhooks
            SET is_active = $3
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, name, secret, is_active, trigger_count,
                      last_triggered_at, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(webhook)
    }

    async fn record_trigger(&self, id: &str) -> Result<Option<Webhook>> {
        let webhook = sqlx::query_as::<_, Webhook>(
            r#"
            UPDATE webhooks
            SET trigger_count = trigger_count + 1,
                last_triggered_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, name, secret, is_active, trigger_count,
                      last_triggered_at, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(webhook)
    }

    async fn delete(&self, id: &str, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM webhooks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
