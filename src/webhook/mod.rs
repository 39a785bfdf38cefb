//! Webhook signing, verification, throttling and signal parsing
//!
//! This module provides:
//! - Webhook id and secret generation
//! - HMAC-SHA256 signing with constant-time verification
//! - A per-webhook fixed-window rate limiter
//! - Validation of inbound trading signals

pub mod rate_limit;
pub mod signal;
pub mod signer;

pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use signal::{parse_signal, Signal, SignalAction};
pub use signer::{
    canonical_payload, generate_id, generate_secret, sign, verify, verify_signal, SIGNATURE_HEADER,
};
