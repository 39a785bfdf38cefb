//! API request handlers

pub mod accounts;
pub mod auth;
pub mod health;
pub mod proxy;
pub mod webhooks;
