//! Trading backend proxy
//!
//! This module provides the forwarding layer between dashboard API calls
//! and the external trading backend:
//! - Bearer token resolution from the Authorization header or the session
//! - Path rewriting under the backend's version prefix
//! - Transparent relay of status codes and JSON/text bodies

pub mod forwarder;

pub use forwarder::{ForwardOptions, Forwarder, ProxyBody, ProxyResponse, SessionLookup};
