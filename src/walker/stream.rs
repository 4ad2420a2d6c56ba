//! Parallel-iteration walker
//!
//! Each directory's children are iterated with rayon's `into_par_iter`, and
//! every child recurses into the same visit. The fork/join inside
//! `for_each` only returns once all of its children returned, so the
//! outermost call is the completion barrier for the whole tree. No task or
//! handle objects exist.
//!
//! The rayon pool is built per traversal from the walker's [`PoolConfig`];
//! rayon's global pool is never used.

use super::{Strategy, TreeWalker, WalkContext, WalkCounters, WalkStats};
use crate::config::PoolConfig;
use crate::error::{Result, WorkerError};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Walker that recurses through parallel iteration over children
#[derive(Debug, Clone)]
pub struct StreamWalker {
    ctx: WalkContext,
    pool: PoolConfig,
}

impl StreamWalker {
    pub fn new(ctx: WalkContext, pool: PoolConfig) -> Self {
        Self { ctx, pool }
    }

    fn visit(&self, path: &Path, depth: u32, counters: &WalkCounters) {
        if self.ctx.is_shutdown() {
            counters.record_interrupted();
            return;
        }

        if self.ctx.is_dir(path, depth) {
            self.ctx.observe_dir(path, counters);
            self.ctx
                .list_children(path, depth, counters)
                .into_par_iter()
                .for_each(|child| self.visit(&child, depth + 1, counters));
        } else {
            debug!(path = %path.display(), "Processing file");
            counters.record_file();
            let outcome = self.ctx.run_processor(path);
            counters.record_processed();
            self.ctx.report(outcome, counters);
        }
    }
}

impl TreeWalker for StreamWalker {
    fn strategy(&self) -> Strategy {
        Strategy::Stream
    }

    fn traverse_with_counters(&self, root: &Path, counters: &WalkCounters) -> Result<WalkStats> {
        let start = Instant::now();
        self.ctx.validate_root(root)?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.pool.workers.max(1))
            .thread_name(|i| format!("walker-stream-{}", i))
            .build()
            .map_err(|e| WorkerError::PoolBuild(e.to_string()))?;

        info!(
            root = %root.display(),
            workers = pool.current_num_threads(),
            "Starting parallel-iteration walk"
        );

        pool.install(|| self.visit(root, 0, counters));

        let stats = counters.finish(start.elapsed());
        info!(
            dirs = stats.dirs,
            files = stats.files,
            errors = stats.errors(),
            duration_ms = stats.duration.as_millis() as u64,
            "Parallel-iteration walk complete"
        );
        Ok(stats)
    }
}
