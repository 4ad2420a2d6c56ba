//! Injected per-entry operations
//!
//! A traversal calls a [`FileProcessor`] once per discovered file and an
//! optional [`DirectoryObserver`] once per discovered directory. Both are
//! invoked concurrently from worker threads, so implementations must manage
//! their own shared state.
//!
//! Plain closures work for both:
//!
//! ```
//! use std::path::Path;
//! use treewalk::processor::{DirectoryObserver, FileProcessor};
//!
//! let processor = |path: &Path| -> anyhow::Result<()> {
//!     anyhow::ensure!(path.extension().is_some(), "no extension");
//!     Ok(())
//! };
//! assert!(processor.process(Path::new("a.txt")).is_ok());
//!
//! let observer = |_dir: &Path| {};
//! observer.on_directory(Path::new("/tmp"));
//! ```

use crate::error::ProcessError;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::trace;

/// Operation applied to every file found by a traversal
pub trait FileProcessor: Send + Sync {
    fn process(&self, path: &Path) -> Result<(), ProcessError>;
}

impl<F> FileProcessor for F
where
    F: Fn(&Path) -> Result<(), ProcessError> + Send + Sync,
{
    fn process(&self, path: &Path) -> Result<(), ProcessError> {
        self(path)
    }
}

/// Callback for every directory found by a traversal (root included)
pub trait DirectoryObserver: Send + Sync {
    fn on_directory(&self, path: &Path);
}

impl<F> DirectoryObserver for F
where
    F: Fn(&Path) + Send + Sync,
{
    fn on_directory(&self, path: &Path) {
        self(path)
    }
}

/// Does nothing; useful for measuring pure traversal cost
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOp;

impl FileProcessor for NoOp {
    fn process(&self, _path: &Path) -> Result<(), ProcessError> {
        Ok(())
    }
}

/// Simulated blocking work: sleeps one millisecond per byte of the path
#[derive(Debug, Clone, Copy)]
pub struct SimulatedWork {
    max_sleep: Duration,
}

impl SimulatedWork {
    pub fn new(max_sleep: Duration) -> Self {
        Self { max_sleep }
    }

    /// How long `path` will be worked on
    pub fn cost(&self, path: &Path) -> Duration {
        let len = path.as_os_str().len() as u64;
        Duration::from_millis(len).min(self.max_sleep)
    }
}

impl FileProcessor for SimulatedWork {
    fn process(&self, path: &Path) -> Result<(), ProcessError> {
        let cost = self.cost(path);
        trace!(path = %path.display(), ms = cost.as_millis() as u64, "Processing started");
        thread::sleep(cost);
        trace!(path = %path.display(), "Processing finished");
        Ok(())
    }
}

/// Sums file sizes into a shared counter
#[derive(Debug, Clone, Default)]
pub struct SizeTally {
    bytes: Arc<AtomicU64>,
}

impl SizeTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared byte counter (readable while the walk is running)
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.bytes)
    }

    pub fn total(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

impl FileProcessor for SizeTally {
    fn process(&self, path: &Path) -> Result<(), ProcessError> {
        let metadata = fs::symlink_metadata(path)?;
        self.bytes.fetch_add(metadata.len(), Ordering::Relaxed);
        Ok(())
    }
}

/// Records every processed path
#[derive(Debug, Default)]
pub struct Recorder {
    seen: Mutex<Vec<PathBuf>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded paths, sorted
    pub fn sorted(&self) -> Vec<PathBuf> {
        let mut seen = self.seen.lock().clone();
        seen.sort();
        seen
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}

impl FileProcessor for Recorder {
    fn process(&self, path: &Path) -> Result<(), ProcessError> {
        self.seen.lock().push(path.to_path_buf());
        Ok(())
    }
}

impl DirectoryObserver for Recorder {
    fn on_directory(&self, path: &Path) {
        self.seen.lock().push(path.to_path_buf());
    }
}
