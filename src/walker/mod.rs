//! Parallel tree walkers
//!
//! Three interchangeable engines implement [`TreeWalker`]. They share the
//! same data flow but schedule work differently:
//!
//! ```text
//!                      traverse(root)
//!                            │
//!                  validate root exists
//!                            │
//!       ┌────────────────────┼─────────────────────┐
//!       │                    │                     │
//! ┌─────▼──────┐      ┌──────▼──────┐       ┌──────▼──────┐
//! │    pool    │      │    steal    │       │   stream    │
//! │ LIFO stack │      │ task/entry  │       │ par_iter    │
//! │ list dirs  │      │ fork kids   │       │ recursion   │
//! │ submit     │      │ no joins    │       │ per child   │
//! │ files      │      │             │       │             │
//! └─────┬──────┘      └──────┬──────┘       └──────┬──────┘
//!       │                    │                     │
//! wait on every        outstanding == 0      install() returns
//! WorkHandle           (quiescence)          (implicit join)
//!       │                    │                     │
//!       └────────────────────┼─────────────────────┘
//!                            ▼
//!                        WalkStats
//! ```
//!
//! Every call to `traverse` builds its own stack, pool or deques from the
//! walker's [`PoolConfig`] and releases them before returning.

pub mod pool;
pub mod scheduled;
pub mod stealing;
pub mod stream;

pub use pool::{PoolStats, WorkHandle, WorkerPool};
pub use scheduled::{PendingWork, PoolScheduledWalker};
pub use stealing::WorkStealingWalker;
pub use stream::StreamWalker;

use crate::config::{PoolConfig, WalkFilter};
use crate::error::{panic_message, DirectoryListingError, FileProcessingError, Result, WalkerError};
use crate::fs::{FileSystem, LocalFs};
use crate::processor::{DirectoryObserver, FileProcessor};
use clap::ValueEnum;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Scheduling strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Strategy {
    /// Explicit stack, files dispatched to a fixed-size worker pool
    Pool,
    /// One task per entry on a work-stealing scheduler
    Steal,
    /// Recursive parallel iteration over directory children
    Stream,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Pool, Strategy::Steal, Strategy::Stream];

    /// Build the walker for this strategy
    pub fn build(self, ctx: WalkContext, pool: PoolConfig) -> Box<dyn TreeWalker> {
        match self {
            Strategy::Pool => Box::new(PoolScheduledWalker::new(ctx, pool)),
            Strategy::Steal => Box::new(WorkStealingWalker::new(ctx, pool)),
            Strategy::Stream => Box::new(StreamWalker::new(ctx, pool)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Pool => "pool",
            Strategy::Steal => "steal",
            Strategy::Stream => "stream",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A complete traversal engine
pub trait TreeWalker: Send + Sync {
    /// Which scheduling strategy this walker uses
    fn strategy(&self) -> Strategy;

    /// Walk the tree under `root`, updating `counters` as work completes
    ///
    /// Fails only with [`WalkerError::PathNotFound`] (root missing, nothing
    /// scheduled) or when the worker threads can't be created. Listing and
    /// processing failures are logged and counted, never returned.
    fn traverse_with_counters(&self, root: &Path, counters: &WalkCounters) -> Result<WalkStats>;

    /// Walk the tree under `root` and block until every file was processed
    fn traverse(&self, root: &Path) -> Result<WalkStats> {
        self.traverse_with_counters(root, &WalkCounters::new())
    }
}

/// Run a traversal while a background thread reports progress
///
/// The callback fires every `interval` and once more after the walk
/// returned, so the last call always carries the final counts.
pub fn traverse_with_progress<F>(
    walker: &dyn TreeWalker,
    root: &Path,
    interval: Duration,
    callback: F,
) -> Result<WalkStats>
where
    F: Fn(WalkProgress) + Send,
{
    let counters = WalkCounters::new();
    let done = AtomicBool::new(false);
    let start = Instant::now();

    thread::scope(|s| {
        let counters_ref = &counters;
        let done_ref = &done;

        s.spawn(move || {
            while !done_ref.load(Ordering::SeqCst) {
                callback(counters_ref.snapshot(start.elapsed()));
                thread::sleep(interval);
            }
            // Final counts once the walk returned
            callback(counters_ref.snapshot(start.elapsed()));
        });

        let result = walker.traverse_with_counters(root, &counters);
        done.store(true, Ordering::SeqCst);
        result
    })
}

/// Everything a walker needs besides its pool sizing
///
/// Cheap to clone; all collaborators are behind `Arc`.
#[derive(Clone)]
pub struct WalkContext {
    fs: Arc<dyn FileSystem>,
    processor: Arc<dyn FileProcessor>,
    observer: Option<Arc<dyn DirectoryObserver>>,
    filter: Arc<WalkFilter>,
    shutdown: Arc<AtomicBool>,
}

impl WalkContext {
    /// Start building a context around a file processor
    pub fn builder(processor: Arc<dyn FileProcessor>) -> WalkContextBuilder {
        WalkContextBuilder {
            fs: None,
            processor,
            observer: None,
            filter: WalkFilter::default(),
            shutdown: None,
        }
    }

    /// Context over the local disk with default settings
    pub fn local(processor: Arc<dyn FileProcessor>) -> Self {
        Self::builder(processor).build()
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Fail fast if the root is missing
    pub(crate) fn validate_root(&self, root: &Path) -> Result<()> {
        if !self.fs.exists(root) {
            return Err(WalkerError::PathNotFound {
                path: root.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Classify an entry found at `depth`; the root (depth 0) resolves links
    pub(crate) fn is_dir(&self, path: &Path, depth: u32) -> bool {
        if depth == 0 {
            self.fs.is_root_dir(path)
        } else {
            self.fs.is_dir(path)
        }
    }

    /// Report a discovered directory to the observer
    ///
    /// A panicking observer is logged and otherwise ignored.
    pub(crate) fn observe_dir(&self, path: &Path, counters: &WalkCounters) {
        counters.record_dir();
        if let Some(observer) = &self.observer {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| observer.on_directory(path))) {
                warn!(
                    path = %path.display(),
                    message = %panic_message(payload.as_ref()),
                    "Directory observer panicked"
                );
            }
        }
    }

    /// List the children of a directory found at `depth`
    ///
    /// Listing failures are logged and counted, and yield no children.
    /// Children rejected by the filter are counted as skipped.
    pub(crate) fn list_children(
        &self,
        path: &Path,
        depth: u32,
        counters: &WalkCounters,
    ) -> Vec<PathBuf> {
        debug!(path = %path.display(), depth, "Processing directory");

        let children = match self.fs.read_dir(path) {
            Ok(children) => children,
            Err(e) => {
                let err = DirectoryListingError::new(path, e);
                counters.record_list_error();
                // Not found errors are common on live trees (deleted mid-walk)
                if err.is_not_found() {
                    debug!(path = %path.display(), error = %err, "Directory vanished");
                } else {
                    warn!(path = %path.display(), error = %err, "Failed to list directory");
                }
                return Vec::new();
            }
        };

        let total = children.len();
        let admitted: Vec<PathBuf> = children
            .into_iter()
            .filter(|child| self.filter.admits(child, depth + 1))
            .collect();

        let skipped = (total - admitted.len()) as u64;
        if skipped > 0 {
            counters.record_skipped(skipped);
        }

        admitted
    }

    /// Run the processor on one file, converting errors and panics
    pub(crate) fn run_processor(&self, path: &Path) -> std::result::Result<(), FileProcessingError> {
        run_processor(self.processor.as_ref(), path)
    }

    /// Log and count the outcome of one file
    pub(crate) fn report(
        &self,
        outcome: std::result::Result<(), FileProcessingError>,
        counters: &WalkCounters,
    ) {
        if let Err(e) = outcome {
            counters.record_process_error();
            warn!(path = %e.path().display(), error = %e, "File processing failed");
        }
    }
}

impl fmt::Debug for WalkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalkContext")
            .field("filter", &self.filter)
            .field("has_observer", &self.observer.is_some())
            .field("shutdown", &self.is_shutdown())
            .finish_non_exhaustive()
    }
}

/// Builder for [`WalkContext`]
pub struct WalkContextBuilder {
    fs: Option<Arc<dyn FileSystem>>,
    processor: Arc<dyn FileProcessor>,
    observer: Option<Arc<dyn DirectoryObserver>>,
    filter: WalkFilter,
    shutdown: Option<Arc<AtomicBool>>,
}

impl WalkContextBuilder {
    /// Filesystem to walk (defaults to [`LocalFs`])
    pub fn filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// Callback for every discovered directory
    pub fn observer(mut self, observer: Arc<dyn DirectoryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Depth and exclusion limits
    pub fn filter(mut self, filter: WalkFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Shared flag that stops the walk from starting new work once set
    pub fn shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    pub fn build(self) -> WalkContext {
        WalkContext {
            fs: self.fs.unwrap_or_else(|| Arc::new(LocalFs::new())),
            processor: self.processor,
            observer: self.observer,
            filter: Arc::new(self.filter),
            shutdown: self
                .shutdown
                .unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        }
    }
}

/// Run a processor, isolating errors and panics to this one file
pub(crate) fn run_processor(
    processor: &dyn FileProcessor,
    path: &Path,
) -> std::result::Result<(), FileProcessingError> {
    match panic::catch_unwind(AssertUnwindSafe(|| processor.process(path))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(FileProcessingError::Failed {
            path: path.to_path_buf(),
            source,
        }),
        Err(payload) => Err(FileProcessingError::Panicked {
            path: path.to_path_buf(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

/// Live counters updated by the engines while walking
#[derive(Debug, Clone, Default)]
pub struct WalkCounters {
    dirs: Arc<AtomicU64>,
    files: Arc<AtomicU64>,
    processed: Arc<AtomicU64>,
    list_errors: Arc<AtomicU64>,
    process_errors: Arc<AtomicU64>,
    skipped: Arc<AtomicU64>,
    interrupted: Arc<AtomicBool>,
}

impl WalkCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_dir(&self) {
        self.dirs.fetch_add(1, Ordering::Relaxed);
    }

    /// A file was dispatched for processing
    pub(crate) fn record_file(&self) {
        self.files.fetch_add(1, Ordering::Relaxed);
    }

    /// A dispatched file reached a terminal state
    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_list_error(&self) {
        self.list_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_process_error(&self) {
        self.process_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_skipped(&self, count: u64) {
        self.skipped.fetch_add(count, Ordering::Relaxed);
    }

    /// Pending work was abandoned because shutdown was requested
    pub(crate) fn record_interrupted(&self) {
        self.interrupted.store(true, Ordering::Relaxed);
    }

    /// Point-in-time view for progress display
    pub fn snapshot(&self, elapsed: Duration) -> WalkProgress {
        WalkProgress {
            dirs: self.dirs.load(Ordering::Relaxed),
            files: self.files.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            errors: self.list_errors.load(Ordering::Relaxed)
                + self.process_errors.load(Ordering::Relaxed),
            elapsed,
        }
    }

    /// Final statistics once the completion barrier was passed
    ///
    /// The walk counts as completed unless some pending work was abandoned.
    pub(crate) fn finish(&self, duration: Duration) -> WalkStats {
        WalkStats {
            dirs: self.dirs.load(Ordering::Relaxed),
            files: self.files.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            list_errors: self.list_errors.load(Ordering::Relaxed),
            process_errors: self.process_errors.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            duration,
            completed: !self.interrupted.load(Ordering::Relaxed),
        }
    }
}

/// Progress information for display
#[derive(Debug, Clone, Default)]
pub struct WalkProgress {
    pub dirs: u64,
    pub files: u64,
    pub processed: u64,
    pub errors: u64,
    pub elapsed: Duration,
}

impl WalkProgress {
    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }

    /// Files dispatched but not yet finished
    pub fn in_flight(&self) -> u64 {
        self.files.saturating_sub(self.processed)
    }
}

/// Result of a completed walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Directories discovered (root included)
    pub dirs: u64,

    /// Files dispatched to the processor
    pub files: u64,

    /// Files whose processing reached a terminal state
    pub processed: u64,

    /// Directories that could not be listed
    pub list_errors: u64,

    /// Files whose processing failed or panicked
    pub process_errors: u64,

    /// Entries dropped by depth or exclusion limits
    pub skipped: u64,

    /// Time taken for the walk
    pub duration: Duration,

    /// Whether the walk completed (vs was interrupted)
    pub completed: bool,
}

impl WalkStats {
    pub fn errors(&self) -> u64 {
        self.list_errors + self.process_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use crate::processor::NoOp;

    #[test]
    fn test_walk_stats_default() {
        let stats = WalkStats::default();
        assert_eq!(stats.dirs, 0);
        assert_eq!(stats.files, 0);
        assert_eq!(stats.errors(), 0);
        assert!(!stats.completed);
    }

    #[test]
    fn test_walk_progress_rate() {
        let progress = WalkProgress {
            files: 120,
            processed: 100,
            elapsed: Duration::from_secs(10),
            ..Default::default()
        };
        assert!((progress.files_per_second() - 10.0).abs() < 0.01);
        assert_eq!(progress.in_flight(), 20);
        assert_eq!(WalkProgress::default().files_per_second(), 0.0);
    }

    #[test]
    fn test_run_processor_isolates_panics() {
        let panicking = |_: &Path| -> std::result::Result<(), crate::error::ProcessError> {
            panic!("processor blew up")
        };
        let err = run_processor(&panicking, Path::new("/f")).unwrap_err();
        match err {
            FileProcessingError::Panicked { message, .. } => {
                assert!(message.contains("blew up"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_list_children_failure_counted() {
        let fs = MemoryFs::new().unlistable("/r/locked");
        let ctx = WalkContext::builder(Arc::new(NoOp))
            .filesystem(Arc::new(fs))
            .build();
        let counters = WalkCounters::new();

        let children = ctx.list_children(Path::new("/r/locked"), 1, &counters);
        assert!(children.is_empty());

        let stats = counters.finish(Duration::ZERO);
        assert_eq!(stats.list_errors, 1);
    }

    #[test]
    fn test_list_children_filtered() {
        let fs = MemoryFs::new().file("/r/keep.txt").file("/r/skip.log");
        let ctx = WalkContext::builder(Arc::new(NoOp))
            .filesystem(Arc::new(fs))
            .filter(WalkFilter::new().exclude(r"\.log$").unwrap())
            .build();
        let counters = WalkCounters::new();

        let children = ctx.list_children(Path::new("/r"), 0, &counters);
        assert_eq!(children, vec![PathBuf::from("/r/keep.txt")]);
        assert_eq!(counters.finish(Duration::ZERO).skipped, 1);
    }

    #[test]
    fn test_completed_unless_work_abandoned() {
        let counters = WalkCounters::new();
        assert!(counters.finish(Duration::ZERO).completed);

        counters.record_interrupted();
        assert!(!counters.finish(Duration::ZERO).completed);
    }

    #[test]
    fn test_root_classified_through_links() {
        struct LinkedRoot;

        impl FileSystem for LinkedRoot {
            fn exists(&self, _path: &Path) -> bool {
                true
            }

            fn is_dir(&self, _path: &Path) -> bool {
                false
            }

            fn is_root_dir(&self, _path: &Path) -> bool {
                true
            }

            fn read_dir(&self, _path: &Path) -> std::io::Result<Vec<PathBuf>> {
                Ok(Vec::new())
            }
        }

        let ctx = WalkContext::builder(Arc::new(NoOp))
            .filesystem(Arc::new(LinkedRoot))
            .build();
        assert!(ctx.is_dir(Path::new("/link"), 0));
        assert!(!ctx.is_dir(Path::new("/link/child"), 1));
    }

    #[test]
    fn test_validate_root() {
        let ctx = WalkContext::builder(Arc::new(NoOp))
            .filesystem(Arc::new(MemoryFs::new().dir("/r")))
            .build();
        assert!(ctx.validate_root(Path::new("/r")).is_ok());
        assert!(matches!(
            ctx.validate_root(Path::new("/missing")),
            Err(WalkerError::PathNotFound { .. })
        ));
    }

    #[test]
    fn test_strategy_build() {
        for strategy in Strategy::ALL {
            let walker = strategy.build(
                WalkContext::local(Arc::new(NoOp)),
                PoolConfig::with_workers(2),
            );
            assert_eq!(walker.strategy(), strategy);
        }
        assert_eq!(Strategy::Steal.to_string(), "steal");
    }
}
