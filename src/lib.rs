//! Tradegate - dashboard gateway for a crypto trading backend
//!
//! Sits between the browser dashboard, external alerting tools and the
//! trading backend.
//!
//! ## Features
//!
//! - Signed inbound webhooks with per-webhook rate limiting
//! - Transparent forwarding of dashboard calls to the backend API
//! - Cookie sessions wrapping the backend access token
//! - Encrypted storage of exchange API credentials
//! - PostgreSQL persistence with embedded migrations

pub mod api;
pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod models;
pub mod proxy;
pub mod repository;
pub mod services;
pub mod webhook;

pub use config::Config;
pub use database::Database;
pub use error::{GateError, Result};
