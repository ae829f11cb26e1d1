//! Resolution collaborators: series listing and per-item download links.
//!
//! The engine depends only on the [`SeriesResolver`] and [`LinkResolver`]
//! traits; site-specific scraping lives behind them.
//!
//! # Architecture
//!
//! - [`SeriesResolver`] - Turns a series locator into [`SeriesInfo`] (fatal on error)
//! - [`LinkResolver`] - Turns an [`Item`] into quality-labelled [`SourceFile`]s (retryable)
//! - [`select_quality`] - Picks one [`DownloadDescriptor`] from the offered files
//! - [`ManifestResolver`] - JSON-over-HTTP implementation of both traits

mod error;
mod manifest;

pub use error::ResolveError;
pub use manifest::ManifestResolver;

use async_trait::async_trait;
use serde::Deserialize;

use crate::download::RateLimiter;
use crate::series::{Item, SeriesInfo};

/// Resolves a series locator into its title, server and ordered items.
#[async_trait]
pub trait SeriesResolver: Send + Sync {
    /// Fetches series metadata. Errors here abort the whole run.
    async fn resolve_series(&self, page_url: &str) -> Result<SeriesInfo, ResolveError>;
}

/// Resolves one item into the source files it is offered in.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    /// Returns every quality variant offered for `item`.
    ///
    /// The caller has already passed `rate_limiter` once for this call;
    /// implementations acquire it again before every additional request.
    async fn resolve_sources(
        &self,
        item: &Item,
        rate_limiter: &RateLimiter,
    ) -> Result<Vec<SourceFile>, ResolveError>;
}

/// One downloadable variant of an item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceFile {
    /// Source URL.
    pub file: String,
    /// Quality label such as `"1080p"`.
    pub label: String,
}

impl SourceFile {
    /// Creates a source file entry.
    #[must_use]
    pub fn new(file: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            label: label.into(),
        }
    }
}

/// The source chosen for a download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadDescriptor {
    /// Source URL to stream.
    pub url: String,
    /// Quality label of the chosen source.
    pub quality: String,
}

/// Picks the source to download.
///
/// The `preferred` label wins when offered. Otherwise the numerically highest
/// label wins, comparing the leading integer (`"1080p"` beats `"720p"`);
/// labels without a leading integer rank last. Among equal labels the first
/// offered is kept. Returns `None` when `files` is empty.
///
/// # Examples
///
/// ```
/// use seriesdl_core::resolver::{SourceFile, select_quality};
///
/// let files = vec![
///     SourceFile::new("https://cdn/480.mp4", "480p"),
///     SourceFile::new("https://cdn/1080.mp4", "1080p"),
///     SourceFile::new("https://cdn/720.mp4", "720p"),
/// ];
/// assert_eq!(select_quality(&files, None).unwrap().quality, "1080p");
/// assert_eq!(select_quality(&files, Some("720p")).unwrap().quality, "720p");
/// ```
#[must_use]
pub fn select_quality(files: &[SourceFile], preferred: Option<&str>) -> Option<DownloadDescriptor> {
    let preferred_match = preferred.and_then(|label| files.iter().find(|file| file.label == label));

    let chosen = preferred_match.or_else(|| {
        files.iter().fold(None, |best: Option<&SourceFile>, file| match best {
            Some(current) if label_rank(&file.label) <= label_rank(&current.label) => Some(current),
            _ => Some(file),
        })
    })?;

    Some(DownloadDescriptor {
        url: chosen.file.clone(),
        quality: chosen.label.clone(),
    })
}

/// Leading integer of a quality label; `None` sorts below every number.
fn label_rank(label: &str) -> Option<u64> {
    let digits: String = label
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
