//! Per-task body: resolve, stream to disk, retry.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use super::constants::CHUNK_SIZE;
use super::engine::DownloadStats;
use super::error::DownloadError;
use super::rate_limiter::RateLimiter;
use super::retry::{RetryDecision, RetryPolicy, classify_error};
use super::stream::ByteSource;
use super::task::TaskState;
use crate::resolver::{LinkResolver, ResolveError, select_quality};

/// Everything a worker needs besides its own task.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub(crate) resolver: Arc<dyn LinkResolver>,
    pub(crate) source: Arc<dyn ByteSource>,
    pub(crate) rate_limiter: Arc<RateLimiter>,
    pub(crate) retry_policy: RetryPolicy,
    pub(crate) preferred_quality: Option<String>,
    pub(crate) stats: Arc<DownloadStats>,
}

/// Runs attempts for `task` until one succeeds or the retry policy gives up.
///
/// Every attempt starts from scratch: the state is reset, the link is
/// resolved again and the destination file is truncated. Errors never leave
/// this function; they end as `TaskStatus::Failed`.
#[instrument(skip_all, fields(item = %task.item().name))]
pub(crate) async fn run_task(ctx: &WorkerContext, task: &TaskState) {
    let mut attempts_used = 0u32;

    loop {
        attempts_used += 1;
        task.begin_attempt(attempts_used);
        debug!(attempt = attempts_used, "starting attempt");

        let error = match attempt(ctx, task).await {
            Ok(bytes) => {
                task.finish();
                ctx.stats.increment_completed();
                info!(
                    bytes,
                    attempts = attempts_used,
                    path = %task.destination().display(),
                    "download finished"
                );
                return;
            }
            Err(error) => error,
        };

        match ctx.retry_policy.decide(classify_error(&error), attempts_used) {
            RetryDecision::Retry { attempt } => {
                info!(
                    attempt,
                    max_attempts = ctx.retry_policy.max_attempts(),
                    error = %error,
                    "retrying download"
                );
                ctx.stats.increment_retried();
            }
            RetryDecision::DoNotRetry { reason } => {
                warn!(
                    attempts = attempts_used,
                    error = %error,
                    %reason,
                    "download failed"
                );
                task.fail();
                ctx.stats.increment_failed();
                return;
            }
        }
    }
}

/// One resolve-and-stream attempt. Returns the number of bytes written.
async fn attempt(ctx: &WorkerContext, task: &TaskState) -> Result<u64, DownloadError> {
    let item = task.item();

    ctx.rate_limiter.acquire().await;
    let files = ctx.resolver.resolve_sources(item, &ctx.rate_limiter).await?;
    let descriptor = select_quality(&files, ctx.preferred_quality.as_deref())
        .ok_or_else(|| ResolveError::no_sources(item.id.as_str()))?;
    debug!(quality = %descriptor.quality, url = %descriptor.url, "selected source");
    task.set_resolved(&descriptor);

    let path = task.destination();
    let mut file = File::create(path)
        .await
        .map_err(|e| DownloadError::io(path, e))?;

    let mut stream = ctx.source.open(&descriptor.url).await?;
    let total = stream
        .total_length
        .ok_or_else(|| DownloadError::missing_content_length(descriptor.url.as_str()))?;
    task.begin_download(total);

    let mut written: u64 = 0;
    while let Some(chunk) = stream.chunks.next().await {
        let chunk = chunk?;
        for piece in chunk.chunks(CHUNK_SIZE) {
            let len = piece.len() as u64;
            if written + len > total {
                return Err(DownloadError::length_mismatch(
                    descriptor.url.as_str(),
                    total,
                    written + len,
                ));
            }
            file.write_all(piece)
                .await
                .map_err(|e| DownloadError::io(path, e))?;
            // tokio completes writes in the background; wait for this piece
            // to land before it is counted.
            file.flush().await.map_err(|e| DownloadError::io(path, e))?;
            written += len;
            task.add_progress(len);
        }
    }

    if written != total {
        return Err(DownloadError::length_mismatch(
            descriptor.url.as_str(),
            total,
            written,
        ));
    }
    Ok(written)
}
