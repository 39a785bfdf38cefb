//! Rate limit sweeper
//!
//! Periodically drops expired webhook rate limit windows so the table
//! only holds webhooks that were hit recently.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info, instrument};

use crate::webhook::RateLimiter;

/// Default sweep interval in seconds
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Periodic cleanup of the shared [`RateLimiter`]
pub struct RateLimitSweeper {
    limiter: RateLimiter,
    interval: Duration,
}

impl RateLimitSweeper {
    pub fn new(limiter: RateLimiter, interval_secs: u64) -> Self {
        Self {
            limiter,
            interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    /// Run until the shutdown channel flips to `true`
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting rate limit sweeper"
        );

        let mut sweep_interval = interval(self.interval);
        sweep_interval.tick().await; // Skip immediate tick

        loop {
            tokio::select! {
                _ = sweep_interval.tick() => {
                    self.sweep();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Rate limit sweeper shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Remove expired windows once
    pub fn sweep(&self) -> usize {
        let removed = self.limiter.cleanup();
        if removed > 0 {
            debug!(
                removed,
                remaining = self.limiter.tracked_count(),
                "Swept expired rate limit windows"
            );
        }
        removed
    }
}

/// Handle for stopping the sweeper
pub struct RateLimitSweeperHandle {
    shutdown_tx: watch::Sender<bool>,
}

impl RateLimitSweeperHandle {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { shutdown_tx: tx }, rx)
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
