//! Process-wide rate limiting for outbound resolve requests.
//!
//! This module provides the [`RateLimiter`] struct which enforces a minimum
//! spacing between any two rate-limited requests made by any worker. Unlike
//! the byte streams, which run unthrottled, every request that talks to the
//! resolving service passes through [`RateLimiter::acquire`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use seriesdl_core::download::RateLimiter;
//!
//! # async fn example() {
//! let limiter = Arc::new(RateLimiter::new(Duration::from_secs(1)));
//!
//! // First request proceeds immediately
//! limiter.acquire().await;
//!
//! // Second request waits until a second has passed since the first
//! limiter.acquire().await;
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::constants::CUMULATIVE_DELAY_WARNING_THRESHOLD;

/// Default minimum spacing between rate-limited requests (1 second).
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_secs(1);

/// Shared gate spacing rate-limited requests across all workers.
///
/// Wrap in `Arc` and hand a clone to every worker. The gate state is a single
/// "last acquisition" timestamp behind a `tokio::sync::Mutex`; a caller holds
/// the lock only to check the clock and either record a new timestamp or
/// learn how long to wait. The lock is never held while sleeping, so other
/// callers keep checking the clock in lock (FIFO) order.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum time between two successful acquisitions.
    interval: Duration,

    /// Whether rate limiting is disabled (for `--rate-limit 0`).
    disabled: bool,

    /// Time of the last successful acquisition.
    /// `None` until the first caller passes the gate (first request is immediate).
    last_acquired: Mutex<Option<Instant>>,

    /// Cumulative time callers have spent waiting (in milliseconds).
    cumulative_delay_ms: AtomicU64,
}

impl RateLimiter {
    /// Creates a new rate limiter with the given minimum spacing.
    ///
    /// A zero interval yields a disabled limiter.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use seriesdl_core::download::RateLimiter;
    ///
    /// let limiter = RateLimiter::new(Duration::from_millis(1000));
    /// assert!(!limiter.is_disabled());
    /// ```
    #[must_use]
    #[instrument(skip_all, fields(interval_ms = interval.as_millis()))]
    pub fn new(interval: Duration) -> Self {
        if interval.is_zero() {
            return Self::disabled();
        }
        debug!("creating rate limiter");
        Self {
            interval,
            disabled: false,
            last_acquired: Mutex::new(None),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    /// Creates a disabled rate limiter that applies no delays.
    #[must_use]
    #[instrument]
    pub fn disabled() -> Self {
        debug!("creating disabled rate limiter");
        Self {
            interval: Duration::ZERO,
            disabled: true,
            last_acquired: Mutex::new(None),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    /// Returns whether rate limiting is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the minimum spacing between acquisitions.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the total time callers have waited at this gate so far.
    #[must_use]
    pub fn cumulative_delay(&self) -> Duration {
        Duration::from_millis(self.cumulative_delay_ms.load(Ordering::SeqCst))
    }

    /// Waits until the gate is open, records the acquisition and returns its timestamp.
    ///
    /// The gate is open once at least [`interval`](Self::interval) has
    /// elapsed since any caller's last acquisition. The check and the update
    /// happen under one lock, so no two callers pass within the same window.
    #[instrument(skip(self))]
    pub async fn acquire(&self) -> Instant {
        if self.disabled {
            return Instant::now();
        }

        loop {
            let wait = {
                let mut last_acquired = self.last_acquired.lock().await;
                let now = Instant::now();
                match *last_acquired {
                    Some(last) if now.duration_since(last) < self.interval => {
                        self.interval - now.duration_since(last)
                    }
                    _ => {
                        *last_acquired = Some(now);
                        return now;
                    }
                }
            };

            let cumulative = self.add_cumulative_delay(wait);
            debug!(
                delay_ms = wait.as_millis(),
                cumulative_ms = cumulative.as_millis(),
                "rate limit gate closed, waiting"
            );
            if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD
                && cumulative.saturating_sub(wait) < CUMULATIVE_DELAY_WARNING_THRESHOLD
            {
                warn!(
                    cumulative_delay_secs = cumulative.as_secs(),
                    "excessive rate limiting - consider a shorter interval or fewer items"
                );
            }

            tokio::time::sleep(wait).await;
        }
    }

    /// Adds to the cumulative delay and returns the new total.
    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let new_total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(new_total)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_LIMIT)
    }
}
