//! Local filesystem access through `std::fs`

use super::FileSystem;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// [`FileSystem`] backed by the local disk
///
/// Symlinks are not followed by default: a discovered link to a directory is
/// reported as a non-directory and handed to the file processor like any
/// other leaf. The root itself is always resolved through links.
/// With `follow_symlinks` enabled, link cycles are not detected and make a
/// traversal run forever.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs {
    follow_symlinks: bool,
}

impl LocalFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descend into symlinked directories
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }
}

impl FileSystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        let metadata = if self.follow_symlinks {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        };
        metadata.map(|m| m.is_dir()).unwrap_or(false)
    }

    fn is_root_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }
}
