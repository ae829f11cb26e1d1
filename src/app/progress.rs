//! Live progress display for a running batch.
//!
//! One indicatif bar per task, refreshed by polling [`BatchMonitor::snapshot`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use seriesdl_core::{BatchMonitor, TaskView};

/// How often the display re-reads task snapshots.
const REFRESH_INTERVAL: Duration = Duration::from_millis(200);

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Spawns the progress display when requested.
/// Returns (handle, stop) so the caller can signal stop and await the handle.
/// When `enabled` is false, returns (None, stop) with stop already true.
pub(crate) fn spawn_progress_ui(
    enabled: bool,
    monitor: BatchMonitor,
) -> (Option<tokio::task::JoinHandle<()>>, Arc<AtomicBool>) {
    if !enabled {
        return (None, Arc::new(AtomicBool::new(true)));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let handle = tokio::spawn(render_loop(monitor, Arc::clone(&stop)));
    (Some(handle), stop)
}

async fn render_loop(monitor: BatchMonitor, stop: Arc<AtomicBool>) {
    let multi = MultiProgress::new();
    let style = ProgressStyle::with_template("{msg}\n  [{wide_bar}] {percent:>3}%")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    let bars: Vec<ProgressBar> = monitor
        .snapshot()
        .iter()
        .map(|_| multi.add(ProgressBar::new(0).with_style(style.clone())))
        .collect();

    loop {
        // Read the flags before rendering so the last frame shows final state.
        let finished = stop.load(Ordering::SeqCst) || monitor.is_done();
        for (bar, view) in bars.iter().zip(monitor.snapshot()) {
            bar.set_length(view.bytes_total);
            bar.set_position(view.bytes_downloaded);
            bar.set_message(task_line(&view));
        }
        if finished {
            break;
        }
        tokio::time::sleep(REFRESH_INTERVAL).await;
    }

    for bar in &bars {
        bar.abandon();
    }
}

/// Text shown above a task's bar.
pub(crate) fn task_line(view: &TaskView) -> String {
    let status = format!("{}:", view.status.as_str());
    let mut line = format!(
        "{status:<13}{} => {}",
        view.item.name,
        view.destination.display()
    );
    if !view.resolved_quality.is_empty() {
        line.push_str(&format!(" ({})", view.resolved_quality));
    }
    line.push_str("  ");
    line.push_str(&byte_counts(view.bytes_downloaded, view.bytes_total));
    line
}

/// Formats `"x.xMB / y.yMB"`.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn byte_counts(downloaded: u64, total: u64) -> String {
    format!(
        "{:.1}MB / {:.1}MB",
        downloaded as f64 / BYTES_PER_MB,
        total as f64 / BYTES_PER_MB
    )
}
