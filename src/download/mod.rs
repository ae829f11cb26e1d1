//! Concurrent batch download engine.
//!
//! This module turns a list of [`Item`](crate::series::Item)s into files on
//! disk: every item gets a [`TaskState`], a bounded pool of workers resolves
//! each item to a download link under a process-wide [`RateLimiter`], streams
//! the payload in fixed-size chunks and retries failed attempts per
//! [`RetryPolicy`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use seriesdl_core::download::{DownloadEngine, HttpClient};
//! use seriesdl_core::resolver::ManifestResolver;
//! use seriesdl_core::{BatchConfig, SeriesResolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BatchConfig::default();
//! let client = HttpClient::new();
//! let resolver = Arc::new(ManifestResolver::new(client.clone(), config.server.clone()));
//!
//! let series = resolver.resolve_series("https://example.com/series.json").await?;
//! let engine = DownloadEngine::from_config(&config)?;
//! let summary = engine
//!     .start(series.items, |item| config.destination_for(item), resolver, Arc::new(client))
//!     .wait()
//!     .await;
//! println!("finished: {}, failed: {}", summary.finished, summary.failed);
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod engine;
mod error;
pub mod rate_limiter;
mod retry;
mod stream;
mod task;
mod worker;

pub use client::HttpClient;
pub use constants::CHUNK_SIZE;
pub use engine::{
    BatchHandle, BatchMonitor, BatchSummary, DEFAULT_CONCURRENCY, DownloadEngine, DownloadStats,
    EngineError, MAX_ATTEMPTS_LIMIT,
};
pub use error::DownloadError;
pub use rate_limiter::{DEFAULT_RATE_LIMIT, RateLimiter};
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryPolicy, RetryScope, classify_error,
};
pub use stream::{ByteSource, ByteStream};
pub use task::{TaskState, TaskStatus, TaskView};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
