//! Series Downloader Core Library
//!
//! This library provides the core functionality for the series downloader:
//! it turns a series listing into a batch of concurrent, rate-limited,
//! retried downloads with live per-task progress.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`series`] - Items, series metadata and item filtering
//! - [`config`] - Batch configuration and destination naming
//! - [`download`] - Scheduler, workers, rate limiting, retry and task state
//! - [`resolver`] - Series and download-link resolution collaborators
//! - [`batch`] - Orchestration from a series locator to a running batch

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod config;
pub mod download;
pub mod resolver;
pub mod series;

// Re-export commonly used types
pub use batch::{SeriesRun, start_series};
pub use config::BatchConfig;
pub use download::{
    BatchHandle, BatchMonitor, BatchSummary, ByteSource, ByteStream, DEFAULT_CONCURRENCY,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_RATE_LIMIT, DownloadEngine, DownloadError, DownloadStats,
    EngineError, FailureType, HttpClient, MAX_ATTEMPTS_LIMIT, RateLimiter, RetryDecision,
    RetryPolicy, RetryScope, TaskState, TaskStatus, TaskView, classify_error,
};
pub use resolver::{
    DownloadDescriptor, LinkResolver, ManifestResolver, ResolveError, SeriesResolver,
    SourceFile, select_quality,
};
pub use series::{Item, SeriesInfo, filter_items};
