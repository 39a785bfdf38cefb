//! In-memory stores for handler tests

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{ExchangeAccount, NewExchangeAccount, NewWebhook, Webhook};

use super::{AccountStore, WebhookStore};

#[derive(Default)]
pub struct MemoryWebhookStore {
    webhooks: Mutex<Vec<Webhook>>,
}

impl MemoryWebhookStore {
    pub fn insert(&self, webhook: Webhook) {
        self.webhooks.lock().unwrap().push(webhook);
    }

    pub fn snapshot(&self, id: &str) -> Option<Webhook> {
        self.webhooks.lock().unwrap().iter().find(|w| w.id == id).cloned()
    }
}

#[async_trait]
impl WebhookStore for MemoryWebhookStore {
    async fn create(&self, new: &NewWebhook) -> Result<Webhook> {
        let webhook = Webhook {
            id: new.id.clone(),
            user_id: new.user_id.clone(),
            name: new.name.clone(),
            secret: new.secret.clone(),
            is_active: true,
            trigger_count: 0,
            last_triggered_at: None,
            created_at: Utc::now(),
        };
        self.insert(webhook.clone());
        Ok(webhook)
    }

    async fn get(&self, id: &str) -> Result<Option<Webhook>> {
        Ok(self.snapshot(id))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Webhook>> {
        Ok(self
            .webhooks
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn set_active(&self, id: &str, user_id: &str, active: bool) -> Result<Option<Webhook>> {
        let mut webhooks = self.webhooks.lock().unwrap();
        Ok(webhooks
            .iter_mut()
            .find(|w| w.id == id && w.user_id == user_id)
            .map(|w| {
                w.is_active = active;
                w.clone()
            }))
    }

    async fn record_trigger(&self, id: &str) -> Result<Option<Webhook>> {
        let mut webhooks = self.webhooks.lock().unwrap();
        Ok(webhooks.iter_mut().find(|w| w.id == id).map(|w| {
            w.trigger_count += 1;
            w.last_triggered_at = Some(Utc::now());
            w.clone()
        }))
    }

    async fn delete(&self, id: &str, user_id: &str) -> Result<bool> {
        let mut webhooks = self.webhooks.lock().unwrap();
        let before = webhooks.len();
        webhooks.retain(|w| !(w.id == id && w.user_id == user_id));
        Ok(webhooks.len() < before)
    }
}

#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<Vec<ExchangeAccount>>,
}

impl MemoryAccountStore {
    pub fn all(&self) -> Vec<ExchangeAccount> {
        self.accounts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn create(&self, new: &NewExchangeAccount) -> Result<ExchangeAccount> {
        let account = ExchangeAccount {
            id: Uuid::new_v4(),
            user_id: new.user_id.clone(),
            exchange: new.exchange.clone(),
            label: new.label.clone(),
            api_key: new.api_key.clone(),
            api_secret: new.api_secret.clone(),
            is_testnet: new.is_testnet,
            created_at: Utc::now(),
        };
        self.accounts.lock().unwrap().push(account.clone());
        Ok(account)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ExchangeAccount>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: Uuid, user_id: &str) -> Result<bool> {
        let mut accounts = self.accounts.lock().unwrap();
        let before = accounts.len();
        accounts.retain(|a| !(a.id == id && a.user_id == user_id));
        Ok(accounts.len() < before)
    }
}
