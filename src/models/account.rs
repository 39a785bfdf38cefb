use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::crypto::{mask, Vault};

/// Exchange account with vault-encrypted credentials
#[derive(Debug, Clone, FromRow)]
pub struct ExchangeAccount {
    pub id: Uuid,
    pub user_id: String,
    pub exchange: String,
    pub label: String,
    /// Vault format, never plaintext
    pub api_key: String,
    /// Vault format, never plaintext
    pub api_secret: String,
    pub is_testnet: bool,
    pub created_at: DateTime<Utc>,
}

impl ExchangeAccount {
    /// Public view with the API key masked.
    ///
    /// A key that no longer decrypts (rotated master key) is shown as such
    /// instead of failing the whole listing.
    pub fn view(&self, vault: &Vault) -> AccountView {
        let api_key_masked = vault
            .decrypt(&self.api_key)
            .map(|key| mask(&key))
            .unwrap_or_else(|_| "<unreadable>".to_string());

        AccountView {
            id: self.id,
            exchange: self.exchange.clone(),
            label: self.label.clone(),
            api_key_masked,
            is_testnet: self.is_testnet,
            created_at: self.created_at,
        }
    }
}

/// Fields for a new account row, credentials already encrypted
#[derive(Debug, Clone)]
pub struct NewExchangeAccount {
    pub user_id: String,
    pub exchange: String,
    pub label: String,
    pub api_key: String,
    pub api_secret: String,
    pub is_testnet: bool,
}

/// Request to register an exchange account
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccountRequest {
    pub exchange: String,
    pub label: Option<String>,
    pub api_key: String,
    pub api_secret: String,
    #[serde(default)]
    pub is_testnet: bool,
}

/// Account as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: Uuid,
    pub exchange: String,
    pub label: String,
    pub api_key_masked: String,
    pub is_testnet: bool,
    pub created_at: DateTime<Utc>,
}
