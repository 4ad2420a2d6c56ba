//! Filesystem access
//!
//! The engines never touch `std::fs` directly. Everything goes through the
//! [`FileSystem`] trait so a traversal can run against the local disk
//! ([`LocalFs`]) or an in-memory tree ([`MemoryFs`]) with injected listing
//! failures.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 TreeWalker                  │
//! │   exists(root) and is_root_dir(root) once,  │
//! │   then per discovered entry:                │
//! │   is_dir(entry) → read_dir(entry) | process │
//! └──────────────────────┬──────────────────────┘
//!                        │
//!            ┌───────────┴───────────┐
//!            ▼                       ▼
//!     ┌─────────────┐         ┌─────────────┐
//!     │   LocalFs   │         │  MemoryFs   │
//!     │  std::fs    │         │  BTreeMap   │
//!     └─────────────┘         └─────────────┘
//! ```

pub mod local;
pub mod memory;

pub use local::LocalFs;
pub use memory::MemoryFs;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Filesystem operations needed by a traversal
///
/// Implementations must be safe to call from many worker threads at once.
pub trait FileSystem: Send + Sync {
    /// Check whether `path` exists
    fn exists(&self, path: &Path) -> bool;

    /// Check whether `path` is a directory that should be expanded
    fn is_dir(&self, path: &Path) -> bool;

    /// Check whether the traversal root is a directory
    ///
    /// The root is named by the caller, so a link to a directory is always
    /// expanded even when discovered links are not.
    fn is_root_dir(&self, path: &Path) -> bool {
        self.is_dir(path)
    }

    /// List the immediate children of `path`, in no particular order
    ///
    /// Fails with an I/O error if the listing cannot be completed.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

impl<T: FileSystem + ?Sized> FileSystem for Arc<T> {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        (**self).is_dir(path)
    }

    fn is_root_dir(&self, path: &Path) -> bool {
        (**self).is_root_dir(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        (**self).read_dir(path)
    }
}
