//! Work-stealing walker - one task per filesystem entry
//!
//! Architecture:
//! ```text
//! Entry tasks (crossbeam deque - work stealing)
//! │
//! ├── Worker 0: pop task → dir? list + fork children : process file
//! ├── Worker 1: pop task → dir? list + fork children : process file
//! └── Worker N: pop task → dir? list + fork children : process file
//! │
//! └── outstanding counter: +1 per fork, -1 per finished task
//!     traversal ends when it reaches zero (quiescence)
//! ```
//!
//! A directory task never waits for the children it forked. Completion is
//! tracked by the outstanding-task counter alone: a child is counted before
//! its parent finishes, so the counter can only reach zero once the whole
//! tree has been processed.

use super::{Strategy, TreeWalker, WalkContext, WalkCounters, WalkStats};
use crate::config::PoolConfig;
use crate::error::{Result, WorkerError};
use crossbeam_deque::{Injector, Steal, Stealer, Worker as DequeWorker};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Spins before an idle worker starts sleeping between steal attempts
const MAX_IDLE_SPINS: u32 = 64;

/// Unit of work: one filesystem entry
#[derive(Debug, Clone)]
struct EntryTask {
    path: PathBuf,
    depth: u32,
}

/// Shared scheduling state for one traversal
struct Scheduler<'a> {
    injector: Injector<EntryTask>,
    stealers: Vec<Stealer<EntryTask>>,
    outstanding: AtomicUsize,
    ctx: &'a WalkContext,
    counters: &'a WalkCounters,
}

impl Scheduler<'_> {
    /// Local deque first, then the injector, then steal from peers
    fn find_task(&self, id: usize, local: &DequeWorker<EntryTask>) -> Option<EntryTask> {
        if let Some(task) = local.pop() {
            return Some(task);
        }

        loop {
            match self.injector.steal_batch_and_pop(local) {
                Steal::Success(task) => return Some(task),
                Steal::Empty => break,
                Steal::Retry => continue,
            }
        }

        for (i, stealer) in self.stealers.iter().enumerate() {
            if i == id {
                continue;
            }
            loop {
                match stealer.steal() {
                    Steal::Success(task) => return Some(task),
                    Steal::Empty => break,
                    Steal::Retry => continue,
                }
            }
        }

        None
    }

    fn run_task(&self, task: EntryTask, local: &DequeWorker<EntryTask>) {
        if self.ctx.is_shutdown() {
            self.counters.record_interrupted();
            return;
        }

        if self.ctx.is_dir(&task.path, task.depth) {
            self.ctx.observe_dir(&task.path, self.counters);
            let children = self.ctx.list_children(&task.path, task.depth, self.counters);
            for child in children {
                // Count the fork before the parent can finish
                self.outstanding.fetch_add(1, Ordering::SeqCst);
                local.push(EntryTask {
                    path: child,
                    depth: task.depth + 1,
                });
            }
        } else {
            debug!(path = %task.path.display(), "Processing file");
            self.counters.record_file();
            let outcome = self.ctx.run_processor(&task.path);
            self.counters.record_processed();
            self.ctx.report(outcome, self.counters);
        }
    }

    fn worker_loop(&self, id: usize, local: DequeWorker<EntryTask>) {
        trace!(worker = id, "Stealing worker started");
        let mut idle_spins = 0;
        let mut tasks_run = 0u64;

        loop {
            match self.find_task(id, &local) {
                Some(task) => {
                    idle_spins = 0;
                    self.run_task(task, &local);
                    tasks_run += 1;
                    self.outstanding.fetch_sub(1, Ordering::SeqCst);
                }
                None => {
                    if self.outstanding.load(Ordering::SeqCst) == 0 {
                        break;
                    }

                    idle_spins += 1;
                    if idle_spins > MAX_IDLE_SPINS {
                        // Yield to avoid busy spinning
                        thread::sleep(Duration::from_micros(100));
                        idle_spins = 0;
                    } else {
                        thread::yield_now();
                    }
                }
            }
        }

        debug!(worker = id, tasks = tasks_run, "Stealing worker finished");
    }
}

/// Walker that turns every entry into a task on a work-stealing scheduler
#[derive(Debug, Clone)]
pub struct WorkStealingWalker {
    ctx: WalkContext,
    pool: PoolConfig,
}

impl WorkStealingWalker {
    pub fn new(ctx: WalkContext, pool: PoolConfig) -> Self {
        Self { ctx, pool }
    }
}

impl TreeWalker for WorkStealingWalker {
    fn strategy(&self) -> Strategy {
        Strategy::Steal
    }

    fn traverse_with_counters(&self, root: &Path, counters: &WalkCounters) -> Result<WalkStats> {
        let start = Instant::now();
        self.ctx.validate_root(root)?;

        let worker_count = self.pool.workers.max(1);
        info!(
            root = %root.display(),
            workers = worker_count,
            "Starting work-stealing walk"
        );

        // Create worker local queues and stealers
        let locals: Vec<DequeWorker<EntryTask>> =
            (0..worker_count).map(|_| DequeWorker::new_lifo()).collect();

        let scheduler = Scheduler {
            injector: Injector::new(),
            stealers: locals.iter().map(DequeWorker::stealer).collect(),
            outstanding: AtomicUsize::new(1),
            ctx: &self.ctx,
            counters,
        };
        scheduler.injector.push(EntryTask {
            path: root.to_path_buf(),
            depth: 0,
        });

        let spawned: Vec<std::result::Result<(), WorkerError>> = thread::scope(|s| {
            locals
                .into_iter()
                .enumerate()
                .map(|(id, local)| {
                    let scheduler = &scheduler;
                    thread::Builder::new()
                        .name(format!("walker-steal-{}", id))
                        .spawn_scoped(s, move || scheduler.worker_loop(id, local))
                        .map(|_| ())
                        .map_err(|e| WorkerError::InitFailed {
                            id,
                            reason: e.to_string(),
                        })
                })
                .collect()
        });

        // Any worker that did start drained the whole tree before the scope ended
        if spawned.iter().all(|r| r.is_err()) {
            if let Some(Err(e)) = spawned.into_iter().next() {
                return Err(e.into());
            }
        }

        let stats = counters.finish(start.elapsed());
        info!(
            dirs = stats.dirs,
            files = stats.files,
            errors = stats.errors(),
            duration_ms = stats.duration.as_millis() as u64,
            "Work-stealing walk complete"
        );
        Ok(stats)
    }
}
