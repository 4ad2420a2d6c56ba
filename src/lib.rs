//! treewalk - Parallel Directory Tree Traversal
//!
//! Walks a directory tree and applies a caller-supplied processor to every
//! file, processing files concurrently while the tree is still being
//! discovered. `traverse` blocks until every dispatched file reached a
//! terminal state.
//!
//! # Strategies
//!
//! - **pool** ([`PoolScheduledWalker`]): the calling thread expands
//!   directories from an explicit stack and submits files to a fixed-size
//!   worker pool, keeping one handle per file and waiting on all of them.
//!
//! - **steal** ([`WorkStealingWalker`]): every entry is a task on a
//!   work-stealing scheduler. Directories fork one task per child and never
//!   join; the walk ends when the outstanding-task counter hits zero.
//!
//! - **stream** ([`StreamWalker`]): recursive parallel iteration over each
//!   directory's children on a rayon pool; the nested fork/join is the
//!   completion barrier.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         TreeWalker                              │
//! │          traverse(root) -> Result<WalkStats, WalkerError>       │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │
//!            ┌──────────────────┼──────────────────┐
//!            ▼                  ▼                  ▼
//!     ┌────────────┐     ┌────────────┐     ┌────────────┐
//!     │ FileSystem │     │   File     │     │ Directory  │
//!     │ exists     │     │ Processor  │     │ Observer   │
//!     │ is_dir     │     │ (per file) │     │ (optional) │
//!     │ read_dir   │     └────────────┘     └────────────┘
//!     └────────────┘
//! ```
//!
//! Failures are contained: a directory that can't be listed counts as
//! empty, a file whose processor fails or panics is logged and counted.
//! Only a missing root is returned as an error.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use treewalk::{PoolConfig, Strategy, WalkContext};
//!
//! let processor = |path: &Path| -> anyhow::Result<()> {
//!     println!("{}", path.display());
//!     Ok(())
//! };
//!
//! let walker = Strategy::Steal.build(
//!     WalkContext::local(Arc::new(processor)),
//!     PoolConfig::with_workers(8),
//! );
//! let stats = walker.traverse(Path::new("/data")).unwrap();
//! println!("{} files in {:?}", stats.files, stats.duration);
//! ```

pub mod config;
pub mod error;
pub mod fs;
pub mod processor;
pub mod progress;
pub mod walker;

pub use config::{CliArgs, PoolConfig, WalkConfig, WalkFilter};
pub use error::{Result, WalkerError};
pub use walker::{
    traverse_with_progress, PoolScheduledWalker, StreamWalker, Strategy, TreeWalker, WalkContext,
    WalkStats, WorkStealingWalker,
};
