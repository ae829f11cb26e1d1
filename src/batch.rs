//! Orchestrator boundary: from a series locator to a running batch.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::config::BatchConfig;
use crate::download::{BatchHandle, ByteSource, DownloadEngine, EngineError};
use crate::resolver::{LinkResolver, SeriesResolver};
use crate::series::{SeriesInfo, filter_items};

/// A started batch together with the series it was built from.
#[derive(Debug)]
pub struct SeriesRun {
    /// Series metadata as resolved, before item filtering.
    pub series: SeriesInfo,
    /// Handle of the running batch (only the filtered items).
    pub handle: BatchHandle,
}

/// Resolves `page_url`, prepares the output directory and starts downloading.
///
/// Configuration is validated before any request is made. Every error
/// returned here is fatal for the run; failures of individual items are
/// reported through the returned handle instead.
///
/// # Errors
///
/// Returns [`EngineError`] when the configuration is out of range, the
/// series cannot be resolved or the output directory cannot be created.
#[instrument(skip(config, resolver, source))]
pub async fn start_series<R>(
    config: &BatchConfig,
    page_url: &str,
    resolver: Arc<R>,
    source: Arc<dyn ByteSource>,
) -> Result<SeriesRun, EngineError>
where
    R: SeriesResolver + LinkResolver + 'static,
{
    let engine = DownloadEngine::from_config(config)?;

    let series = resolver.resolve_series(page_url).await?;
    let items = filter_items(series.items.clone(), &config.episodes);
    debug!(
        listed = series.items.len(),
        selected = items.len(),
        "filtered series items"
    );

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|source| EngineError::OutputDir {
            path: config.output_dir.clone(),
            source,
        })?;

    info!(
        title = %series.title,
        server = %series.server,
        items = items.len(),
        destination = %config.output_dir.display(),
        "starting downloads"
    );

    let naming = config.clone();
    let handle = engine.start(
        items,
        move |item| naming.destination_for(item),
        resolver,
        source,
    );

    Ok(SeriesRun { series, handle })
}
