use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{ExchangeAccount, NewExchangeAccount};

/// Persistence for exchange accounts
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create(&self, new: &NewExchangeAccount) -> Result<ExchangeAccount>;

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ExchangeAccount>>;

    async fn delete(&self, id: Uuid, user_id: &str) -> Result<bool>;
}

/// PostgreSQL exchange account repository
#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn create(&self, new: &NewExchangeAccount) -> Result<ExchangeAccount> {
        let account = sqlx::query_as::<_, ExchangeAccount>(
            r#"
            INSERT INTO exchange_accounts (id, user_id, exchange, label, api_key, api_secret, is_testnet)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, exchange, label, api_key, api_secret, is_testnet, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.user_id)
        .bind(&new.exchange)
        .bind(&new.label)
        .bind(&new.api_key)
        .bind(&new.api_secret)
        .bind(new.is_testnet)
        .fetch_one(&self.pool)
        .await?;

        debug!(id = %account.id, "Inserted exchange account row");
        Ok(account)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ExchangeAccount>> {
        let accounts = sqlx::query_as::<_, ExchangeAccount>(
            r#"
            SELECT id, user_id, exchange, label, api_key, api_secret, is_testnet, created_at
            FROM exchange_accounts
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    async fn delete(&self, id: Uuid, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM exchange_accounts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
