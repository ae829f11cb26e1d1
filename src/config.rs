//! Batch configuration accepted at the orchestrator boundary.

use std::path::PathBuf;
use std::time::Duration;

use crate::download::{DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, DEFAULT_RATE_LIMIT, RetryScope};
use crate::series::Item;

/// File extension appended to every destination file.
const DESTINATION_EXTENSION: &str = "mp4";

/// Options for one batch run.
///
/// `server` is only consumed by the series resolver; the engine itself never
/// looks at it.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Directory downloaded files are written to (created if absent).
    pub output_dir: PathBuf,
    /// Prefix prepended to every filename.
    pub prefix: String,
    /// Item names to process; empty means all.
    pub episodes: Vec<String>,
    /// Forced quality label; `None` picks the highest available.
    pub quality: Option<String>,
    /// Forced server name; `None` lets the resolver choose.
    pub server: Option<String>,
    /// Number of tasks resolving/downloading at once.
    pub concurrency: usize,
    /// Attempt cap per task, including the first attempt.
    pub max_attempts: u32,
    /// Which failures are retried.
    pub retry_scope: RetryScope,
    /// Minimum spacing between rate-limited requests (zero disables).
    pub rate_limit: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            prefix: String::new(),
            episodes: Vec::new(),
            quality: None,
            server: None,
            concurrency: DEFAULT_CONCURRENCY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_scope: RetryScope::default(),
            rate_limit: DEFAULT_RATE_LIMIT,
        }
    }
}

impl BatchConfig {
    /// Returns the destination path for `item`: `<output_dir>/<prefix><name>.mp4`.
    #[must_use]
    pub fn destination_for(&self, item: &Item) -> PathBuf {
        let stem = sanitize_filename(&format!("{}{}", self.prefix, item.name));
        self.output_dir.join(format!("{stem}.{DESTINATION_EXTENSION}"))
    }
}

/// Replaces characters that are invalid on common filesystems with `_`.
fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.trim_matches('.').is_empty() {
        return "_".to_string();
    }
    sanitized
}
