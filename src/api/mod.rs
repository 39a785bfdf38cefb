//! HTTP API
//!
//! Session endpoints, webhook management and receipt, exchange accounts
//! and the pass-through to the trading backend.

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
pub(crate) mod test_support;

pub use server::{ApiServer, AppState};
