//! Bounded retry decisions for failed download attempts.
//!
//! This module provides the [`RetryPolicy`] and [`FailureType`] types for
//! deciding whether a failed attempt is run again.
//!
//! # Overview
//!
//! Retries are immediate; the only spacing between attempts is the shared
//! [`RateLimiter`](super::RateLimiter) gate every attempt passes through.
//! With the default [`RetryScope::All`] every error is retried identically
//! until the attempt cap is reached, a 404 included. [`RetryScope::TransientOnly`]
//! opts into classification via [`classify_error`] and gives up on
//! [`FailureType::Permanent`] errors straight away.
//!
//! # Example
//!
//! ```
//! use seriesdl_core::download::{DownloadError, RetryDecision, RetryPolicy, classify_error};
//!
//! let policy = RetryPolicy::default();
//! let error = DownloadError::http_status("https://example.com/ep1.mp4", 503);
//!
//! match policy.decide(classify_error(&error), 1) {
//!     RetryDecision::Retry { attempt } => println!("running attempt {attempt}"),
//!     RetryDecision::DoNotRetry { reason } => println!("giving up: {reason}"),
//! }
//! ```

use tracing::{debug, instrument};

use super::DownloadError;
use crate::resolver::ResolveError;

/// Default maximum attempts per task (including the first attempt).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Classification of download failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: network timeout, 5xx server errors, truncated streams.
    Transient,

    /// Failure that won't succeed regardless of retries.
    ///
    /// Examples: 404 Not Found, invalid URL, malformed resolver response.
    Permanent,
}

/// Which failures a [`RetryPolicy`] retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryScope {
    /// Retry every failure identically until the attempt cap.
    #[default]
    All,
    /// Retry only [`FailureType::Transient`] failures.
    TransientOnly,
}

/// Decision on whether to run another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Run another attempt right away.
    Retry {
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Stop and mark the task failed.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Attempt cap and scope for per-task retries.
///
/// # Default Values
///
/// - `max_attempts`: 5
/// - `scope`: [`RetryScope::All`]
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Which failures are retried.
    scope: RetryScope,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            scope: RetryScope::All,
        }
    }
}

impl RetryPolicy {
    /// Creates a retry policy. `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, scope: RetryScope) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            scope,
        }
    }

    /// Creates a policy with a custom `max_attempts` that retries every failure.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self::new(max_attempts, RetryScope::All)
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the configured retry scope.
    #[must_use]
    pub fn scope(&self) -> RetryScope {
        self.scope
    }

    /// Returns true iff another attempt is allowed after `attempts_used` attempts.
    #[must_use]
    pub fn should_retry(&self, attempts_used: u32) -> bool {
        attempts_used < self.max_attempts
    }

    /// Decides whether to retry after attempt number `attempts_used` failed.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn decide(&self, failure_type: FailureType, attempts_used: u32) -> RetryDecision {
        if self.scope == RetryScope::TransientOnly && failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if !self.should_retry(attempts_used) {
            debug!(attempts_used, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        RetryDecision::Retry {
            attempt: attempts_used + 1,
        }
    }
}

/// Classifies a download error for [`RetryScope::TransientOnly`] decisions.
///
/// | Error | Type |
/// |-------|------|
/// | HTTP 400, 404, 410, 451 | Permanent |
/// | other HTTP statuses | Transient |
/// | Timeout, Network | Transient |
/// | Truncated/overlong stream, missing length | Transient |
/// | IO (local file system) | Permanent |
/// | Invalid URL, malformed resolver response, no sources | Permanent |
#[must_use]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::HttpStatus { status, .. } => classify_http_status(*status),
        DownloadError::Timeout { .. }
        | DownloadError::Network { .. }
        | DownloadError::MissingContentLength { .. }
        | DownloadError::LengthMismatch { .. } => FailureType::Transient,
        DownloadError::Io { .. } | DownloadError::InvalidUrl { .. } => FailureType::Permanent,
        DownloadError::Resolve(resolve) => classify_resolve_error(resolve),
    }
}

fn classify_resolve_error(error: &ResolveError) -> FailureType {
    match error {
        ResolveError::Http { source, .. } => classify_error(source),
        ResolveError::Malformed { .. }
        | ResolveError::NoServers { .. }
        | ResolveError::NoSources { .. } => FailureType::Permanent,
    }
}

fn classify_http_status(status: u16) -> FailureType {
    match status {
        400 | 404 | 410 | 451 => FailureType::Permanent,
        _ => FailureType::Transient,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_allows_five_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.scope(), RetryScope::All);
    }

    #[test]
    fn test_should_retry_below_cap_only() {
        let policy = RetryPolicy::with_max_attempts(3);
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert!(!policy.should_retry(4));
    }

    #[test]
    fn test_with_max_attempts_clamps_zero_to_one() {
        let policy = RetryPolicy::with_max_attempts(0);
        assert_eq!(policy.max_attempts(), 1);
        assert!(!policy.should_retry(1));
    }

    #[test]
    fn test_decide_retries_permanent_errors_by_default() {
        let policy = RetryPolicy::default();
        let error = DownloadError::http_status("https://example.com/gone", 404);
        assert_eq!(
            policy.decide(classify_error(&error), 1),
            RetryDecision::Retry { attempt: 2 }
        );
    }

    #[test]
    fn test_decide_stops_at_cap() {
        let policy = RetryPolicy::default();
        let decision = policy.decide(FailureType::Transient, 5);
        assert!(matches!(
            decision,
            RetryDecision::DoNotRetry { ref reason } if reason.contains("max attempts (5)")
        ));
    }

    #[test]
    fn test_decide_transient_only_gives_up_on_permanent() {
        let policy = RetryPolicy::new(5, RetryScope::TransientOnly);
        assert!(matches!(
            policy.decide(FailureType::Permanent, 1),
            RetryDecision::DoNotRetry { .. }
        ));
        assert_eq!(
            policy.decide(FailureType::Transient, 1),
            RetryDecision::Retry { attempt: 2 }
        );
    }

    #[test]
    fn test_classify_http_statuses() {
        for status in [400, 404, 410, 451] {
            let error = DownloadError::http_status("https://x", status);
            assert_eq!(classify_error(&error), FailureType::Permanent, "{status}");
        }
        for status in [403, 429, 500, 502, 503] {
            let error = DownloadError::http_status("https://x", status);
            assert_eq!(classify_error(&error), FailureType::Transient, "{status}");
        }
    }

    #[test]
    fn test_classify_stream_and_local_errors() {
        assert_eq!(
            classify_error(&DownloadError::length_mismatch("https://x", 10, 4)),
            FailureType::Transient
        );
        assert_eq!(
            classify_error(&DownloadError::timeout("https://x")),
            FailureType::Transient
        );
        assert_eq!(
            classify_error(&DownloadError::invalid_url("nope")),
            FailureType::Permanent
        );
        let io = DownloadError::io("/x", std::io::Error::other("disk"));
        assert_eq!(classify_error(&io), FailureType::Permanent);
    }

    #[test]
    fn test_classify_resolve_errors() {
        let malformed: DownloadError = ResolveError::malformed("https://x", "missing data").into();
        assert_eq!(classify_error(&malformed), FailureType::Permanent);

        let http: DownloadError =
            ResolveError::http(DownloadError::http_status("https://x", 503)).into();
        assert_eq!(classify_error(&http), FailureType::Transient);
    }
}
