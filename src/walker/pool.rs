//! Fixed-size worker pool with per-job handles
//!
//! Jobs go through an unbounded crossbeam channel to `size` worker threads.
//! Each job reports its outcome on its own one-shot channel, wrapped in a
//! [`WorkHandle`]. Dropping the pool closes the job channel and joins every
//! worker, so the threads never outlive the traversal that created them.

use crate::error::{panic_message, FileProcessingError, WorkerError};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub type JobResult = Result<(), FileProcessingError>;

/// Statistics for the worker pool
#[derive(Debug, Default)]
pub struct PoolStats {
    submitted: AtomicU64,
    completed: AtomicU64,
    panicked: AtomicU64,
}

impl PoolStats {
    /// Jobs submitted
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Jobs that ran to completion (successfully or not)
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Jobs that panicked
    pub fn panicked(&self) -> u64 {
        self.panicked.load(Ordering::Relaxed)
    }
}

/// Future-like token for one dispatched file job
#[derive(Debug)]
pub struct WorkHandle {
    path: PathBuf,
    result: Receiver<JobResult>,
}

impl WorkHandle {
    /// File this job is processing
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until the job reaches a terminal state
    pub fn wait(self) -> JobResult {
        match self.result.recv() {
            Ok(result) => result,
            Err(_) => Err(FileProcessingError::Disconnected { path: self.path }),
        }
    }
}

/// A worker thread pulling jobs from the shared channel
struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn(id: usize, jobs: Receiver<Job>) -> Result<Self, WorkerError> {
        let handle = thread::Builder::new()
            .name(format!("walker-pool-{}", id))
            .spawn(move || worker_loop(id, jobs))
            .map_err(|e| WorkerError::InitFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
        })
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                debug!(worker = self.id, "Worker thread panicked");
            }
        }
    }
}

fn worker_loop(id: usize, jobs: Receiver<Job>) {
    trace!(worker = id, "Pool worker started");

    // Ends once the pool drops its sender and the channel drains
    while let Ok(job) = jobs.recv() {
        job();
    }

    trace!(worker = id, "Pool worker finished");
}

/// Bounded pool of worker threads
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<Worker>,
    stats: Arc<PoolStats>,
}

impl WorkerPool {
    /// Spawn `size` worker threads (at least one)
    pub fn new(size: usize) -> Result<Self, WorkerError> {
        let (sender, receiver) = unbounded::<Job>();
        let mut pool = Self {
            sender: Some(sender),
            workers: Vec::with_capacity(size.max(1)),
            stats: Arc::new(PoolStats::default()),
        };

        // On failure the partially built pool is dropped, joining what started
        for id in 0..size.max(1) {
            pool.workers.push(Worker::spawn(id, receiver.clone())?);
        }

        debug!(workers = pool.workers.len(), "Worker pool started");
        Ok(pool)
    }

    /// Number of worker threads
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Get pool statistics
    pub fn stats(&self) -> Arc<PoolStats> {
        Arc::clone(&self.stats)
    }

    /// Dispatch a job for `path`
    ///
    /// The returned handle resolves to the job's result, or to an error if
    /// the job panicked or could not be queued.
    pub fn submit<F>(&self, path: PathBuf, job: F) -> WorkHandle
    where
        F: FnOnce() -> JobResult + Send + 'static,
    {
        let (result_tx, result_rx) = bounded::<JobResult>(1);
        let stats = Arc::clone(&self.stats);
        let job_path = path.clone();

        let task: Job = Box::new(move || {
            let result = match panic::catch_unwind(AssertUnwindSafe(job)) {
                Ok(result) => result,
                Err(payload) => {
                    stats.panicked.fetch_add(1, Ordering::Relaxed);
                    Err(FileProcessingError::Panicked {
                        path: job_path,
                        message: panic_message(payload.as_ref()),
                    })
                }
            };
            stats.completed.fetch_add(1, Ordering::Relaxed);
            // The handle may already be gone; nothing left to report to
            let _ = result_tx.send(result);
        });

        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        if let Some(sender) = &self.sender {
            if sender.send(task).is_err() {
                debug!(path = %path.display(), "Job channel closed, job dropped");
            }
        }

        WorkHandle {
            path,
            result: result_rx,
        }
    }

    /// Stop accepting jobs and wait for the queued ones to finish
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        // Closing the channel lets workers exit after draining it
        self.sender.take();
        for worker in &mut self.workers {
            worker.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_pool_runs_jobs() {
        let pool = WorkerPool::new(4).unwrap();
        assert_eq!(pool.size(), 4);

        let hits = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..32)
            .map(|i| {
                let hits = Arc::clone(&hits);
                pool.submit(PathBuf::from(format!("/f{i}")), move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            handle.wait().unwrap();
        }

        assert_eq!(hits.load(Ordering::SeqCst), 32);
        assert_eq!(pool.stats().submitted(), 32);
        assert_eq!(pool.stats().completed(), 32);
    }

    #[test]
    fn test_panicking_job_resolves_handle() {
        let pool = WorkerPool::new(1).unwrap();
        let bad = pool.submit(PathBuf::from("/bad"), || panic!("kaboom"));
        let good = pool.submit(PathBuf::from("/good"), || Ok(()));

        match bad.wait() {
            Err(FileProcessingError::Panicked { path, message }) => {
                assert_eq!(path, PathBuf::from("/bad"));
                assert!(message.contains("kaboom"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        // The single worker survived the panic
        assert!(good.wait().is_ok());
        assert_eq!(pool.stats().panicked(), 1);
    }

    #[test]
    fn test_shutdown_drains_queue() {
        let pool = WorkerPool::new(2).unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        for i in 0..8 {
            let done = Arc::clone(&done);
            let _ = pool.submit(PathBuf::from(format!("/f{i}")), move || {
                thread::sleep(Duration::from_millis(2));
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        pool.shutdown();
        assert_eq!(done.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_zero_size_gets_one_worker() {
        let pool = WorkerPool::new(0).unwrap();
        assert_eq!(pool.size(), 1);
        let handle = pool.submit(PathBuf::from("/x"), || Ok(()));
        assert_eq!(handle.path(), Path::new("/x"));
        assert!(handle.wait().is_ok());
    }
}
