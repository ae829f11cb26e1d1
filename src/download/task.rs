//! Per-item task state shared between a worker and the presentation layer.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::resolver::DownloadDescriptor;
use crate::series::Item;

/// Lifecycle status of a task.
///
/// Moves forward `Waiting → Resolving → Downloading → Finished | Failed`.
/// The only backward step is a retry, which restarts at `Resolving`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskStatus {
    /// Created, not yet picked up by a worker.
    #[default]
    Waiting,
    /// Obtaining a download link (rate-limited).
    Resolving,
    /// Streaming bytes to the destination file.
    Downloading,
    /// All bytes written.
    Finished,
    /// Gave up after exhausting attempts.
    Failed,
}

impl TaskStatus {
    /// Returns the display label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "Waiting",
            Self::Resolving => "Resolving",
            Self::Downloading => "Downloading",
            Self::Finished => "Finished",
            Self::Failed => "Failed",
        }
    }

    /// Returns true for `Finished` and `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    /// Returns true while a worker is resolving or downloading.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Resolving | Self::Downloading)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
struct Progress {
    status: TaskStatus,
    bytes_downloaded: u64,
    bytes_total: u64,
    resolved_quality: String,
    resolved_source: String,
    attempts_used: u32,
}

/// Mutable record of one item's download.
///
/// Writes come only from the worker assigned to the item; any number of
/// readers may call [`view`](Self::view) concurrently. All mutable fields sit
/// behind one mutex, so a view never mixes values from two updates. Once
/// the status is terminal every mutator is a no-op.
#[derive(Debug)]
pub struct TaskState {
    item: Arc<Item>,
    destination: PathBuf,
    progress: Mutex<Progress>,
}

/// Read-only copy of a [`TaskState`] taken at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    /// The item being downloaded.
    pub item: Arc<Item>,
    /// Destination file path.
    pub destination: PathBuf,
    /// Current status.
    pub status: TaskStatus,
    /// Bytes written so far in the current attempt.
    pub bytes_downloaded: u64,
    /// Announced payload size; 0 while unknown.
    pub bytes_total: u64,
    /// Selected quality label; empty until resolved.
    pub resolved_quality: String,
    /// Selected source URL; empty until resolved.
    pub resolved_source: String,
    /// Attempts started so far.
    pub attempts_used: u32,
}

impl TaskView {
    /// Completed fraction in `0.0..=1.0`; 0 while the total is unknown.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.bytes_total == 0 {
            return 0.0;
        }
        (self.bytes_downloaded as f64 / self.bytes_total as f64).clamp(0.0, 1.0)
    }
}

impl TaskState {
    /// Creates a waiting task for `item` writing to `destination`.
    #[must_use]
    pub fn new(item: Arc<Item>, destination: impl Into<PathBuf>) -> Self {
        Self {
            item,
            destination: destination.into(),
            progress: Mutex::new(Progress::default()),
        }
    }

    /// Returns the item this task downloads.
    #[must_use]
    pub fn item(&self) -> &Arc<Item> {
        &self.item
    }

    /// Returns the destination path.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.lock().status
    }

    /// Takes a consistent copy of every field.
    #[must_use]
    pub fn view(&self) -> TaskView {
        let progress = self.lock().clone();
        TaskView {
            item: Arc::clone(&self.item),
            destination: self.destination.clone(),
            status: progress.status,
            bytes_downloaded: progress.bytes_downloaded,
            bytes_total: progress.bytes_total,
            resolved_quality: progress.resolved_quality,
            resolved_source: progress.resolved_source,
            attempts_used: progress.attempts_used,
        }
    }

    /// Starts attempt number `attempt`: back to `Resolving` with progress cleared.
    pub(crate) fn begin_attempt(&self, attempt: u32) {
        self.update(|progress| {
            *progress = Progress {
                status: TaskStatus::Resolving,
                attempts_used: attempt,
                ..Progress::default()
            };
        });
    }

    /// Records the selected link and quality.
    pub(crate) fn set_resolved(&self, descriptor: &DownloadDescriptor) {
        self.update(|progress| {
            progress.resolved_quality.clone_from(&descriptor.quality);
            progress.resolved_source.clone_from(&descriptor.url);
        });
    }

    /// Enters `Downloading` with a known payload size.
    pub(crate) fn begin_download(&self, bytes_total: u64) {
        self.update(|progress| {
            progress.status = TaskStatus::Downloading;
            progress.bytes_total = bytes_total;
            progress.bytes_downloaded = 0;
        });
    }

    /// Adds `bytes` just written to disk, never past the announced total.
    pub(crate) fn add_progress(&self, bytes: u64) {
        self.update(|progress| {
            let next = progress.bytes_downloaded.saturating_add(bytes);
            progress.bytes_downloaded = if progress.bytes_total > 0 {
                next.min(progress.bytes_total)
            } else {
                next
            };
        });
    }

    /// Marks the task finished with every byte accounted for.
    pub(crate) fn finish(&self) {
        self.update(|progress| {
            progress.bytes_downloaded = progress.bytes_total;
            progress.status = TaskStatus::Finished;
        });
    }

    /// Marks the task permanently failed.
    pub(crate) fn fail(&self) {
        self.update(|progress| progress.status = TaskStatus::Failed);
    }

    fn update(&self, apply: impl FnOnce(&mut Progress)) {
        let mut progress = self.lock();
        if progress.status.is_terminal() {
            return;
        }
        apply(&mut progress);
    }

    // A panicking writer cannot leave `Progress` half-updated in a way that
    // breaks readers, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Progress> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
