//! CLI entry point for the series downloader.

use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::Result;
use clap::Parser;
use seriesdl_core::{
    BatchConfig, BatchSummary, HttpClient, ManifestResolver, SeriesInfo, start_series,
};
use tracing::{debug, info};

mod app;
mod cli;

use app::{progress, terminal};
use cli::Args;

/// How a run ended, mapped to the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessExit {
    /// Every episode finished.
    Success,
    /// At least one episode failed.
    Partial,
    /// Interrupted with Ctrl-C.
    Canceled,
}

impl ProcessExit {
    fn from_summary(summary: &BatchSummary) -> Self {
        if summary.cancelled {
            Self::Canceled
        } else if summary.all_finished() {
            Self::Success
        } else {
            Self::Partial
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Partial => 2,
            Self::Canceled => 130,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let progress_enabled = terminal::should_use_progress(
        io::stdout().is_terminal(),
        args.quiet,
        args.no_progress,
        terminal::is_dumb_terminal(),
    );
    terminal::init_tracing(terminal::default_log_level(
        args.verbose,
        args.quiet,
        progress_enabled,
    ));
    debug!(?args, "CLI arguments parsed");

    match run(&args, progress_enabled).await {
        Ok(exit) => ExitCode::from(exit.code()),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, progress_enabled: bool) -> Result<ProcessExit> {
    let config = args.batch_config();
    let client = HttpClient::new();
    let resolver = Arc::new(ManifestResolver::new(client.clone(), config.server.clone()));

    let setup = start_series(&config, &args.url, resolver, Arc::new(client));
    let Some(series_run) = until_interrupted(setup, ctrl_c()).await? else {
        info!("Interrupted while resolving series");
        if !args.quiet {
            println!("Downloads canceled.");
        }
        return Ok(ProcessExit::Canceled);
    };
    let monitor = series_run.handle.monitor();

    if !args.quiet {
        print_header(&series_run.series, monitor.len(), &args.url, &config);
    }

    let interrupt_monitor = monitor.clone();
    let interrupt = tokio::spawn(async move {
        ctrl_c().await;
        interrupt_monitor.cancel();
    });

    let (progress_handle, progress_stop) =
        progress::spawn_progress_ui(progress_enabled, monitor.clone());

    let summary = series_run.handle.wait().await;
    interrupt.abort();

    progress_stop.store(true, Ordering::SeqCst);
    if let Some(handle) = progress_handle {
        let _ = handle.await;
    }

    info!(
        finished = summary.finished,
        failed = summary.failed,
        abandoned = summary.abandoned,
        retried = summary.retried,
        total = summary.total,
        "Download complete"
    );

    let exit = ProcessExit::from_summary(&summary);
    if !args.quiet {
        if !progress_enabled {
            for view in monitor.snapshot() {
                println!("{}", progress::task_line(&view));
            }
        }
        print_outcome(&summary, exit);
    }
    Ok(exit)
}

/// Resolves when Ctrl-C is pressed. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Runs `work` unless `interrupt` completes first, in which case `None` is returned.
async fn until_interrupted<T, E>(
    work: impl Future<Output = Result<T, E>>,
    interrupt: impl Future<Output = ()>,
) -> Result<Option<T>, E> {
    tokio::select! {
        biased;
        () = interrupt => Ok(None),
        result = work => result.map(Some),
    }
}

fn print_header(series: &SeriesInfo, selected: usize, url: &str, config: &BatchConfig) {
    println!("{}", series.title);
    println!("  Episodes:    {selected} of {}", series.items.len());
    println!("  Server:      {}", series.server);
    println!("  Link:        {url}");
    println!("  Destination: {}", config.output_dir.display());
    if !config.prefix.is_empty() {
        println!("  Prefix:      {}", config.prefix);
    }
    println!();
}

fn print_outcome(summary: &BatchSummary, exit: ProcessExit) {
    if summary.failed > 0 {
        println!("{} of {} downloads failed.", summary.failed, summary.total);
    }
    match exit {
        ProcessExit::Canceled => println!("Downloads canceled."),
        ProcessExit::Success | ProcessExit::Partial => println!("Downloads finished."),
    }
}
