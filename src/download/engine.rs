//! Download engine for concurrent batch downloads with retry support.
//!
//! This module provides the `DownloadEngine` which schedules one task per
//! item onto a fixed number of worker slots using a semaphore, and the
//! [`BatchHandle`] / [`BatchMonitor`] pair through which callers wait for
//! completion, read live task snapshots and cancel the batch.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use seriesdl_core::download::{DownloadEngine, HttpClient, RateLimiter, RetryPolicy};
//! use seriesdl_core::resolver::ManifestResolver;
//! use seriesdl_core::{Item, SeriesResolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let resolver = Arc::new(ManifestResolver::new(client.clone(), None));
//! let series = resolver.resolve_series("https://example.com/show.json").await?;
//!
//! let rate_limiter = Arc::new(RateLimiter::new(Duration::from_secs(1)));
//! let engine = DownloadEngine::new(6, RetryPolicy::default(), rate_limiter)?;
//! let handle = engine.start(
//!     series.items,
//!     |item: &Item| PathBuf::from(format!("{}.mp4", item.name)),
//!     resolver,
//!     Arc::new(client),
//! );
//!
//! let monitor = handle.monitor();
//! while !monitor.is_done() {
//!     for view in monitor.snapshot() {
//!         println!("{} {} {}/{}", view.status, view.item.name, view.bytes_downloaded, view.bytes_total);
//!     }
//!     tokio::time::sleep(Duration::from_millis(200)).await;
//! }
//! let summary = handle.wait().await;
//! println!("finished: {}, failed: {}", summary.finished, summary.failed);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::rate_limiter::RateLimiter;
use super::retry::RetryPolicy;
use super::stream::ByteSource;
use super::task::{TaskState, TaskStatus, TaskView};
use super::worker::{WorkerContext, run_task};
use crate::config::BatchConfig;
use crate::resolver::{LinkResolver, ResolveError};
use crate::series::Item;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Default concurrency if not specified.
pub const DEFAULT_CONCURRENCY: usize = 6;

/// Largest accepted attempt cap.
pub const MAX_ATTEMPTS_LIMIT: u32 = 20;

/// Error type for download engine operations.
///
/// These are setup errors; they abort a run before any task starts.
/// Individual task failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Invalid attempt cap provided.
    #[error("invalid attempt cap {value}: must be between 1 and {MAX_ATTEMPTS_LIMIT}")]
    InvalidAttempts {
        /// The invalid value that was provided.
        value: u32,
    },

    /// The output directory could not be created.
    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The series listing could not be resolved.
    #[error("failed to resolve series: {0}")]
    Series(#[from] ResolveError),
}

/// Statistics from a batch run.
///
/// Uses atomic counters for thread-safe updates from concurrent download tasks.
#[derive(Debug, Default)]
pub struct DownloadStats {
    completed: AtomicUsize,
    failed: AtomicUsize,
    retried: AtomicUsize,
}

impl DownloadStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of successfully completed downloads.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Returns the number of failed downloads.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Returns the number of retry attempts made.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    pub(crate) fn increment_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_retried(&self) {
        self.retried.fetch_add(1, Ordering::SeqCst);
    }
}

/// Outcome of a batch once its dispatcher has stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    /// Number of tasks in the batch.
    pub total: usize,
    /// Tasks that ended `Finished`.
    pub finished: usize,
    /// Tasks that ended `Failed`.
    pub failed: usize,
    /// Tasks left non-terminal by cancellation.
    pub abandoned: usize,
    /// Retry attempts made across all tasks.
    pub retried: usize,
    /// Whether the batch was cancelled.
    pub cancelled: bool,
}

impl BatchSummary {
    /// Returns true when every task finished.
    #[must_use]
    pub fn all_finished(&self) -> bool {
        self.finished == self.total
    }
}

/// Cloneable read side of a running batch, for presentation layers.
#[derive(Debug, Clone)]
pub struct BatchMonitor {
    tasks: Arc<[Arc<TaskState>]>,
    done: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl BatchMonitor {
    /// Returns a consistent view of every task, in item order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TaskView> {
        self.tasks.iter().map(|task| task.view()).collect()
    }

    /// Returns the live task records, in item order.
    #[must_use]
    pub fn tasks(&self) -> &[Arc<TaskState>] {
        &self.tasks
    }

    /// Number of tasks in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true for an empty batch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Returns true once the dispatcher has stopped.
    ///
    /// Without cancellation this means every task is terminal.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// Requests cancellation: no new task is started and in-flight tasks
    /// are abandoned. Partial files are left on disk.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Owner handle of a running batch.
#[derive(Debug)]
pub struct BatchHandle {
    monitor: BatchMonitor,
    dispatcher: JoinHandle<BatchSummary>,
    stats: Arc<DownloadStats>,
}

impl BatchHandle {
    /// Returns a cloneable monitor for snapshots and cancellation.
    #[must_use]
    pub fn monitor(&self) -> BatchMonitor {
        self.monitor.clone()
    }

    /// Shorthand for `monitor().snapshot()`.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TaskView> {
        self.monitor.snapshot()
    }

    /// Requests cancellation; see [`BatchMonitor::cancel`].
    pub fn cancel(&self) {
        self.monitor.cancel();
    }

    /// Waits until the dispatcher stops and returns the outcome.
    pub async fn wait(self) -> BatchSummary {
        match self.dispatcher.await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "batch dispatcher stopped unexpectedly");
                self.monitor.done.store(true, Ordering::SeqCst);
                summarize(&self.monitor, &self.stats)
            }
        }
    }
}

/// Scheduler for concurrent batch downloads with retry support.
///
/// # Concurrency Model
///
/// - Each item runs in its own Tokio task
/// - A semaphore permit is acquired before a task is spawned and held until
///   it is terminal, so at most `concurrency` tasks resolve or download at once
/// - Tasks are dispatched in item order
///
/// # Retry Behavior
///
/// - A failed attempt is rerun immediately by the same task, up to the
///   policy's attempt cap
/// - Each attempt passes the shared rate limiter before resolving
#[derive(Debug)]
pub struct DownloadEngine {
    /// Configured concurrency limit.
    concurrency: usize,
    /// Retry policy for failed attempts.
    retry_policy: RetryPolicy,
    /// Process-wide rate limiter for resolve requests.
    rate_limiter: Arc<RateLimiter>,
    /// Quality label preferred over the highest available.
    preferred_quality: Option<String>,
}

impl DownloadEngine {
    /// Creates a new download engine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if `concurrency` is
    /// outside 1-100.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use seriesdl_core::download::{DownloadEngine, RateLimiter, RetryPolicy};
    ///
    /// let rate_limiter = Arc::new(RateLimiter::default());
    /// let engine = DownloadEngine::new(6, RetryPolicy::default(), rate_limiter).unwrap();
    /// assert_eq!(engine.concurrency(), 6);
    /// ```
    #[instrument(level = "debug", skip(retry_policy, rate_limiter))]
    pub fn new(
        concurrency: usize,
        retry_policy: RetryPolicy,
        rate_limiter: Arc<RateLimiter>,
    ) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }

        debug!(
            concurrency,
            max_attempts = retry_policy.max_attempts(),
            rate_limit_ms = rate_limiter.interval().as_millis(),
            rate_limit_disabled = rate_limiter.is_disabled(),
            "creating download engine"
        );

        Ok(Self {
            concurrency,
            retry_policy,
            rate_limiter,
            preferred_quality: None,
        })
    }

    /// Creates an engine from batch configuration, with a fresh rate limiter.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] for out-of-range concurrency
    /// and [`EngineError::InvalidAttempts`] for an out-of-range attempt cap.
    pub fn from_config(config: &BatchConfig) -> Result<Self, EngineError> {
        if !(1..=MAX_ATTEMPTS_LIMIT).contains(&config.max_attempts) {
            return Err(EngineError::InvalidAttempts {
                value: config.max_attempts,
            });
        }
        let retry_policy = RetryPolicy::new(config.max_attempts, config.retry_scope);
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit));
        Ok(Self::new(config.concurrency, retry_policy, rate_limiter)?
            .with_preferred_quality(config.quality.clone()))
    }

    /// Sets the quality label preferred over the highest available one.
    #[must_use]
    pub fn with_preferred_quality(mut self, quality: Option<String>) -> Self {
        self.preferred_quality = quality.filter(|label| !label.is_empty());
        self
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns the shared rate limiter.
    #[must_use]
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Creates one task per item and starts dispatching them in the background.
    ///
    /// `destination` maps each item to the file it is written to. Must be
    /// called from within a Tokio runtime.
    #[instrument(skip_all, fields(items = items.len(), concurrency = self.concurrency))]
    pub fn start<F>(
        &self,
        items: Vec<Arc<Item>>,
        destination: F,
        resolver: Arc<dyn LinkResolver>,
        source: Arc<dyn ByteSource>,
    ) -> BatchHandle
    where
        F: Fn(&Item) -> PathBuf,
    {
        let tasks: Arc<[Arc<TaskState>]> = items
            .into_iter()
            .map(|item| {
                let path = destination(&item);
                Arc::new(TaskState::new(item, path))
            })
            .collect();

        let stats = Arc::new(DownloadStats::new());
        let monitor = BatchMonitor {
            tasks,
            done: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
        };
        let ctx = WorkerContext {
            resolver,
            source,
            rate_limiter: Arc::clone(&self.rate_limiter),
            retry_policy: self.retry_policy.clone(),
            preferred_quality: self.preferred_quality.clone(),
            stats: Arc::clone(&stats),
        };

        let dispatcher = tokio::spawn(dispatch(
            monitor.clone(),
            ctx,
            Arc::new(Semaphore::new(self.concurrency)),
        ));

        BatchHandle {
            monitor,
            dispatcher,
            stats,
        }
    }

    /// Runs a batch to completion; see [`start`](Self::start).
    pub async fn run<F>(
        &self,
        items: Vec<Arc<Item>>,
        destination: F,
        resolver: Arc<dyn LinkResolver>,
        source: Arc<dyn ByteSource>,
    ) -> BatchSummary
    where
        F: Fn(&Item) -> PathBuf,
    {
        self.start(items, destination, resolver, source).wait().await
    }
}

async fn dispatch(
    monitor: BatchMonitor,
    ctx: WorkerContext,
    semaphore: Arc<Semaphore>,
) -> BatchSummary {
    let mut running = JoinSet::new();
    let mut spawned = HashMap::new();

    info!(tasks = monitor.len(), "starting batch");

    for task in monitor.tasks.iter() {
        let permit = tokio::select! {
            biased;
            () = monitor.cancel.cancelled() => break,
            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("semaphore closed unexpectedly, stopping dispatch");
                    break;
                }
            },
        };

        let ctx = ctx.clone();
        let owned = Arc::clone(task);
        let handle = running.spawn(async move {
            // Permit is dropped when this block exits (RAII)
            let _permit = permit;
            run_task(&ctx, &owned).await;
        });
        spawned.insert(handle.id(), Arc::clone(task));
    }

    debug!(task_count = running.len(), "waiting for tasks to complete");

    loop {
        let joined = tokio::select! {
            biased;
            () = monitor.cancel.cancelled() => {
                info!(in_flight = running.len(), "batch cancelled, abandoning in-flight tasks");
                running.abort_all();
                while running.join_next().await.is_some() {}
                break;
            }
            joined = running.join_next() => joined,
        };

        match joined {
            None => break,
            Some(Ok(())) => {}
            Some(Err(e)) => handle_task_join_error(&spawned, &e, &ctx.stats),
        }
    }

    monitor.done.store(true, Ordering::SeqCst);
    let summary = summarize(&monitor, &ctx.stats);
    info!(
        finished = summary.finished,
        failed = summary.failed,
        abandoned = summary.abandoned,
        retried = summary.retried,
        total = summary.total,
        "batch complete"
    );
    summary
}

fn handle_task_join_error(
    spawned: &HashMap<tokio::task::Id, Arc<TaskState>>,
    join_error: &JoinError,
    stats: &DownloadStats,
) {
    let Some(task) = spawned.get(&join_error.id()) else {
        warn!(error = %join_error, "unknown task stopped unexpectedly");
        return;
    };
    warn!(
        item = %task.item().name,
        error = %join_error,
        "download task panicked"
    );
    if !task.status().is_terminal() {
        task.fail();
        stats.increment_failed();
    }
}

fn summarize(monitor: &BatchMonitor, stats: &DownloadStats) -> BatchSummary {
    let snapshot = monitor.snapshot();
    let count = |status: TaskStatus| snapshot.iter().filter(|view| view.status == status).count();
    let finished = count(TaskStatus::Finished);
    let failed = count(TaskStatus::Failed);

    BatchSummary {
        total: snapshot.len(),
        finished,
        failed,
        abandoned: snapshot.len() - finished - failed,
        retried: stats.retried(),
        cancelled: monitor.is_cancelled(),
    }
}
