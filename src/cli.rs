//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use seriesdl_core::{
    BatchConfig, DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, MAX_ATTEMPTS_LIMIT, RetryScope,
};

/// Download every episode of a series.
///
/// Episodes are fetched concurrently while requests to the listing site are
/// spaced by a global rate limit. Failed episodes are retried from scratch.
#[derive(Parser, Debug)]
#[command(name = "series-dl")]
#[command(author, version, about)]
pub struct Args {
    /// Series manifest URL
    pub url: String,

    /// Directory to save episodes into (created if absent)
    #[arg(short = 'd', long, default_value = ".")]
    pub destination: PathBuf,

    /// Prefix prepended to every filename
    #[arg(short = 'p', long, default_value = "")]
    pub prefix: String,

    /// Only download these episodes (repeat or separate with commas)
    #[arg(short = 'e', long = "episodes", value_delimiter = ',')]
    pub episodes: Vec<String>,

    /// Preferred quality label, e.g. 720p (default: highest available)
    #[arg(short = 'q', long)]
    pub quality: Option<String>,

    /// Server to take episodes from (default: first listed)
    #[arg(short = 's', long)]
    pub server: Option<String>,

    /// Maximum concurrent downloads (1-100)
    #[arg(short = 'w', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub workers: u8,

    /// Attempts per episode, including the first (1-20)
    #[arg(short = 'a', long, default_value_t = DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_ATTEMPTS_LIMIT)))]
    pub attempts: u32,

    /// Minimum delay between link requests in milliseconds (0 to disable, max 60000)
    #[arg(short = 'l', long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub rate_limit: u64,

    /// Give up immediately on errors that cannot succeed on retry (e.g. 404)
    #[arg(long)]
    pub retry_transient_only: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long)]
    pub quiet: bool,

    /// Disable the live progress display
    #[arg(long)]
    pub no_progress: bool,
}

impl Args {
    /// Converts the parsed flags into a batch configuration.
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            output_dir: self.destination.clone(),
            prefix: self.prefix.clone(),
            episodes: self
                .episodes
                .iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
            quality: self.quality.clone().filter(|label| !label.is_empty()),
            server: self.server.clone().filter(|name| !name.is_empty()),
            concurrency: usize::from(self.workers),
            max_attempts: self.attempts,
            retry_scope: if self.retry_transient_only {
                RetryScope::TransientOnly
            } else {
                RetryScope::All
            },
            rate_limit: Duration::from_millis(self.rate_limit),
        }
    }
}
