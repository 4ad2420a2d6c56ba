//! Explicit-stack walker with a bounded worker pool
//!
//! Discovery and processing are decoupled:
//!
//! ```text
//! traversal thread                       WorkerPool (N threads)
//! ────────────────                       ──────────────────────
//! stack.pop()
//!  ├─ Directory → read_dir → push kids
//!  └─ File ──────── submit ────────────▶ processor(file)
//!                    │                         │
//!              handles.push(h)                 │
//! ...stack empty...                            │
//! for h in handles: h.wait() ◀──── result ─────┘
//! ```
//!
//! Directory listing stays on the calling thread; only file processing is
//! parallel, capped at the pool size regardless of tree shape.

use super::pool::{WorkHandle, WorkerPool};
use super::{Strategy, TreeWalker, WalkContext, WalkCounters, WalkStats};
use crate::config::PoolConfig;
use crate::error::Result;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// A discovered entry waiting on the stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingWork {
    /// Directory to expand
    Directory { path: PathBuf, depth: u32 },

    /// File to dispatch
    File { path: PathBuf },
}

impl PendingWork {
    /// Classify a discovered path
    pub fn discover(ctx: &WalkContext, path: PathBuf, depth: u32) -> Self {
        if ctx.is_dir(&path, depth) {
            PendingWork::Directory { path, depth }
        } else {
            PendingWork::File { path }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            PendingWork::Directory { path, .. } => path,
            PendingWork::File { path } => path,
        }
    }
}

/// Walker that expands directories on the calling thread and dispatches
/// files to a fixed-size pool
#[derive(Debug, Clone)]
pub struct PoolScheduledWalker {
    ctx: WalkContext,
    pool: PoolConfig,
}

impl PoolScheduledWalker {
    pub fn new(ctx: WalkContext, pool: PoolConfig) -> Self {
        Self { ctx, pool }
    }

    /// Push every admitted child of `dir` onto the stack
    fn expand(
        &self,
        dir: &Path,
        depth: u32,
        stack: &mut Vec<PendingWork>,
        counters: &WalkCounters,
    ) {
        self.ctx.observe_dir(dir, counters);
        for child in self.ctx.list_children(dir, depth, counters) {
            stack.push(PendingWork::discover(&self.ctx, child, depth + 1));
        }
    }

    fn dispatch(&self, pool: &WorkerPool, path: PathBuf, counters: &WalkCounters) -> WorkHandle {
        counters.record_file();
        debug!(path = %path.display(), "Processing file");

        let ctx = self.ctx.clone();
        let job_counters = counters.clone();
        let job_path = path.clone();
        pool.submit(path, move || {
            let outcome = ctx.run_processor(&job_path);
            job_counters.record_processed();
            outcome
        })
    }

    /// Block on every handle in submission order
    fn wait_all(&self, handles: Vec<WorkHandle>, counters: &WalkCounters) {
        debug!(handles = handles.len(), "Waiting for dispatched files");
        for handle in handles {
            let outcome = handle.wait();
            self.ctx.report(outcome, counters);
        }
    }
}

impl TreeWalker for PoolScheduledWalker {
    fn strategy(&self) -> Strategy {
        Strategy::Pool
    }

    fn traverse_with_counters(&self, root: &Path, counters: &WalkCounters) -> Result<WalkStats> {
        let start = Instant::now();
        self.ctx.validate_root(root)?;

        info!(
            root = %root.display(),
            workers = self.pool.workers,
            "Starting pool-scheduled walk"
        );

        let pool = WorkerPool::new(self.pool.workers)?;
        let mut stack = vec![PendingWork::discover(&self.ctx, root.to_path_buf(), 0)];
        let mut handles: Vec<WorkHandle> = Vec::new();

        while let Some(work) = stack.pop() {
            if self.ctx.is_shutdown() {
                info!(pending = stack.len() + 1, "Shutdown requested, stopping discovery");
                counters.record_interrupted();
                break;
            }

            match work {
                PendingWork::Directory { path, depth } => {
                    self.expand(&path, depth, &mut stack, counters);
                }
                PendingWork::File { path } => {
                    handles.push(self.dispatch(&pool, path, counters));
                }
            }
        }

        self.wait_all(handles, counters);
        pool.shutdown();

        let stats = counters.finish(start.elapsed());
        info!(
            dirs = stats.dirs,
            files = stats.files,
            errors = stats.errors(),
            duration_ms = stats.duration.as_millis() as u64,
            "Pool-scheduled walk complete"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use crate::processor::{NoOp, Recorder};
    use std::sync::Arc;

    fn context(fs: MemoryFs, processor: Arc<Recorder>) -> WalkContext {
        WalkContext::builder(processor)
            .filesystem(Arc::new(fs))
            .build()
    }

    #[test]
    fn test_discover_classifies() {
        let ctx = WalkContext::builder(Arc::new(NoOp))
            .filesystem(Arc::new(MemoryFs::new().file("/r/a")))
            .build();

        assert_eq!(
            PendingWork::discover(&ctx, PathBuf::from("/r"), 0),
            PendingWork::Directory {
                path: PathBuf::from("/r"),
                depth: 0
            }
        );
        let file = PendingWork::discover(&ctx, PathBuf::from("/r/a"), 1);
        assert!(matches!(file, PendingWork::File { .. }));
        assert_eq!(file.path(), Path::new("/r/a"));
    }

    #[test]
    fn test_walks_every_file() {
        let fs = MemoryFs::balanced("/t", 2, 3, 2);
        let expected = fs.files();
        let recorder = Arc::new(Recorder::new());
        let walker = PoolScheduledWalker::new(
            context(fs, Arc::clone(&recorder)),
            PoolConfig::with_workers(3),
        );

        let stats = walker.traverse(Path::new("/t")).unwrap();

        assert_eq!(recorder.sorted(), expected);
        assert_eq!(stats.files, expected.len() as u64);
        assert_eq!(stats.processed, stats.files);
        assert_eq!(stats.dirs, 13);
        assert!(stats.completed);
    }

    #[test]
    fn test_root_is_a_file() {
        let fs = MemoryFs::new().file("/only.txt");
        let recorder = Arc::new(Recorder::new());
        let walker = PoolScheduledWalker::new(
            context(fs, Arc::clone(&recorder)),
            PoolConfig::with_workers(1),
        );

        let stats = walker.traverse(Path::new("/only.txt")).unwrap();
        assert_eq!(recorder.sorted(), vec![PathBuf::from("/only.txt")]);
        assert_eq!(stats.dirs, 0);
        assert_eq!(stats.files, 1);
    }
}
