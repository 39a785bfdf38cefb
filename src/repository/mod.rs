pub mod account;
pub mod webhook;

#[cfg(test)]
pub mod memory;

pub use account::{AccountRepository, AccountStore};
pub use webhook::{WebhookRepository, WebhookStore};
