//! In-memory filesystem for tests and benchmarks
//!
//! Paths are stored verbatim; adding an entry creates its missing parent
//! directories. Directories can be marked unlistable to simulate permission
//! or I/O failures that a root user can't reproduce on a real disk.

use super::FileSystem;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
enum Node {
    File,
    Dir(BTreeSet<PathBuf>),
}

/// [`FileSystem`] over an in-memory tree
#[derive(Debug, Default)]
pub struct MemoryFs {
    nodes: BTreeMap<PathBuf, Node>,
    unlistable: HashSet<PathBuf>,
    listings: Mutex<HashMap<PathBuf, usize>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory (and its ancestors)
    pub fn dir(mut self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), Node::Dir(BTreeSet::new()));
        self
    }

    /// Add a file (and its ancestors)
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), Node::File);
        self
    }

    /// Add a directory whose listing always fails with `PermissionDenied`
    pub fn unlistable(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        self.insert(path, Node::Dir(BTreeSet::new()));
        self.unlistable.insert(path.to_path_buf());
        self
    }

    /// Build a balanced tree: `depth` levels of `fanout` subdirectories,
    /// each holding `files` files
    pub fn balanced(root: impl AsRef<Path>, depth: usize, fanout: usize, files: usize) -> Self {
        fn fill(fs: &mut MemoryFs, dir: &Path, depth: usize, fanout: usize, files: usize) {
            for f in 0..files {
                fs.insert(&dir.join(format!("file-{f}.dat")), Node::File);
            }
            if depth == 0 {
                return;
            }
            for d in 0..fanout {
                let sub = dir.join(format!("dir-{d}"));
                fs.insert(&sub, Node::Dir(BTreeSet::new()));
                fill(fs, &sub, depth - 1, fanout, files);
            }
        }

        let root = root.as_ref();
        let mut fs = Self::new().dir(root);
        fill(&mut fs, root, depth, fanout, files);
        fs
    }

    /// All file paths in the tree
    pub fn files(&self) -> Vec<PathBuf> {
        self.nodes
            .iter()
            .filter(|(_, node)| matches!(node, Node::File))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// All directory paths in the tree
    pub fn dirs(&self) -> Vec<PathBuf> {
        self.nodes
            .iter()
            .filter(|(_, node)| matches!(node, Node::Dir(_)))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// How many times each directory was listed
    pub fn listings(&self) -> HashMap<PathBuf, usize> {
        self.listings.lock().clone()
    }

    fn insert(&mut self, path: &Path, node: Node) {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !matches!(self.nodes.get(parent), Some(Node::Dir(_))) {
                self.insert(parent, Node::Dir(BTreeSet::new()));
            }
            if let Some(Node::Dir(children)) = self.nodes.get_mut(parent) {
                children.insert(path.to_path_buf());
            }
        }

        match (self.nodes.get(path), &node) {
            // Don't clobber an existing directory's children
            (Some(Node::Dir(_)), Node::Dir(_)) => {}
            _ => {
                self.nodes.insert(path.to_path_buf(), node);
            }
        }
    }
}

impl FileSystem for MemoryFs {
    fn exists(&self, path: &Path) -> bool {
        self.nodes.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.nodes.get(path), Some(Node::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        *self.listings.lock().entry(path.to_path_buf()).or_insert(0) += 1;

        if self.unlistable.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {}", path.display()),
            ));
        }

        match self.nodes.get(path) {
            Some(Node::Dir(children)) => Ok(children.iter().cloned().collect()),
            Some(Node::File) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("not a directory: {}", path.display()),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", path.display()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parents_created() {
        let fs = MemoryFs::new().file("/r/a/b/c.txt");

        assert!(fs.is_dir(Path::new("/r")));
        assert!(fs.is_dir(Path::new("/r/a/b")));
        assert!(!fs.is_dir(Path::new("/r/a/b/c.txt")));
        assert_eq!(
            fs.read_dir(Path::new("/r/a")).unwrap(),
            vec![PathBuf::from("/r/a/b")]
        );
    }

    #[test]
    fn test_dir_keeps_children() {
        let fs = MemoryFs::new().file("/r/x").dir("/r");
        assert_eq!(fs.read_dir(Path::new("/r")).unwrap().len(), 1);
    }

    #[test]
    fn test_unlistable() {
        let fs = MemoryFs::new().unlistable("/r/locked").file("/r/ok");
        let err = fs.read_dir(Path::new("/r/locked")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert!(fs.is_dir(Path::new("/r/locked")));
        assert_eq!(fs.listings()[Path::new("/r/locked")], 1);
    }

    #[test]
    fn test_balanced_counts() {
        // 1 + 2 + 4 directories, 3 files each
        let fs = MemoryFs::balanced("/root", 2, 2, 3);
        let dirs = fs.dirs().into_iter().filter(|d| d.starts_with("/root")).count();
        assert_eq!(dirs, 7);
        assert_eq!(fs.files().len(), 21);
    }
}
