//! Per-webhook fixed-window rate limiting
//!
//! Windows live in process memory only. Two instances behind a load
//! balancer each keep their own counts.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, warn};

/// Default number of signals allowed per window
pub const DEFAULT_MAX_REQUESTS: u32 = 60;

/// Default window length in milliseconds
pub const DEFAULT_WINDOW_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    reset_at: u64,
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Epoch milliseconds at which the current window ends
    pub reset_at: u64,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Rate limiter for inbound webhook signals
///
/// Cheap to clone; clones share the same window table.
pub struct RateLimiter {
    windows: Arc<DashMap<String, WindowEntry>>,
    max_requests: u32,
    window_ms: u64,
}

impl RateLimiter {
    /// Create a limiter with the given defaults
    pub fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            windows: Arc::new(DashMap::new()),
            max_requests,
            window_ms: window_ms.max(1),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Check a webhook against the configured defaults
    pub fn check(&self, webhook_id: &str) -> RateLimitDecision {
        self.check_with(webhook_id, self.max_requests, self.window_ms)
    }

    /// Check a webhook against explicit limits
    pub fn check_with(&self, webhook_id: &str, max_requests: u32, window_ms: u64) -> RateLimitDecision {
        self.check_at(webhook_id, max_requests, window_ms, now_ms())
    }

    /// Check a webhook at a given instant (epoch milliseconds)
    pub fn check_at(
        &self,
        webhook_id: &str,
        max_requests: u32,
        window_ms: u64,
        now: u64,
    ) -> RateLimitDecision {
        let mut entry = self
            .windows
            .entry(webhook_id.to_string())
            .or_insert(WindowEntry {
                count: 0,
                reset_at: 0,
            });

        if entry.count == 0 || now >= entry.reset_at {
            *entry = WindowEntry {
                count: 1,
                reset_at: now.saturating_add(window_ms),
            };
            debug!(webhook_id = %webhook_id, "Rate limit window opened");
            return RateLimitDecision {
                allowed: max_requests > 0,
                remaining: max_requests.saturating_sub(1),
                reset_at: entry.reset_at,
            };
        }

        if entry.count > max_requests {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at: entry.reset_at,
            };
        }

        entry.count += 1;

        if entry.count > max_requests {
            warn!(webhook_id = %webhook_id, limit = max_requests, "Webhook rate limit exceeded");
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at: entry.reset_at,
            }
        } else {
            RateLimitDecision {
                allowed: true,
                remaining: max_requests - entry.count,
                reset_at: entry.reset_at,
            }
        }
    }

    /// Drop windows that have already expired
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(now_ms())
    }

    fn cleanup_at(&self, now: u64) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, entry| entry.reset_at > now);
        before.saturating_sub(self.windows.len())
    }

    /// Forget all windows
    pub fn reset(&self) {
        self.windows.clear();
    }

    /// Number of webhooks with a tracked window
    pub fn tracked_count(&self) -> usize {
        self.windows.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_MS)
    }
}

impl Clone for RateLimiter {
    fn clone(&self) -> Self {
        Self {
            windows: Arc::clone(&self.windows),
            max_requests: self.max_requests,
            window_ms: self.window_ms,
        }
    }
}
