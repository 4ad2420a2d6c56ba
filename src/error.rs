//! Error types for treewalk
//!
//! This module defines the error hierarchy for a traversal:
//! - Fatal errors that abort `traverse` before any work is scheduled
//! - Directory listing errors (recovered locally, subtree abandoned)
//! - File processing errors (recovered locally, logged and counted)
//! - Configuration and worker pool errors
//!
//! Only `WalkerError` ever reaches the caller of `traverse`. The per-entry
//! errors are logged where they happen and show up as counts in `WalkStats`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for treewalk
#[derive(Error, Debug)]
pub enum WalkerError {
    /// Root path missing when the traversal started
    #[error("Path doesn't exist: '{}'", path.display())]
    PathNotFound { path: PathBuf },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker pool errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

/// A directory could not be enumerated
///
/// Recovered locally: the directory is treated as empty and every other
/// branch keeps going.
#[derive(Error, Debug)]
#[error("Failed to list directory '{}': {source}", path.display())]
pub struct DirectoryListingError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl DirectoryListingError {
    pub fn new(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }

    /// Listing races with deletion on live trees; these are worth less noise
    pub fn is_not_found(&self) -> bool {
        self.source.kind() == io::ErrorKind::NotFound
    }
}

/// The injected processor failed for a single file
#[derive(Error, Debug)]
pub enum FileProcessingError {
    /// Processor returned an error
    #[error("Processing failed for '{}': {source}", path.display())]
    Failed {
        path: PathBuf,
        #[source]
        source: ProcessError,
    },

    /// Processor panicked
    #[error("Processor panicked on '{}': {message}", path.display())]
    Panicked { path: PathBuf, message: String },

    /// The job was dropped before reporting a result
    #[error("Processing of '{}' was interrupted before completion", path.display())]
    Disconnected { path: PathBuf },
}

impl FileProcessingError {
    /// Returns the path of the file that failed
    pub fn path(&self) -> &std::path::Path {
        match self {
            FileProcessingError::Failed { path, .. } => path,
            FileProcessingError::Panicked { path, .. } => path,
            FileProcessingError::Disconnected { path } => path,
        }
    }
}

/// Error returned by a `FileProcessor`
pub type ProcessError = anyhow::Error;

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid exclude pattern
    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    InvalidExcludePattern { pattern: String, reason: String },

    /// Invalid simulated work cap
    #[error("Invalid sleep cap {millis}ms: must be at most {max}ms")]
    InvalidSleepCap { millis: u64, max: u64 },
}

/// Worker pool errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker thread could not be spawned
    #[error("Failed to initialize worker {id}: {reason}")]
    InitFailed { id: usize, reason: String },

    /// Thread pool could not be built
    #[error("Failed to build thread pool: {0}")]
    PoolBuild(String),
}

/// Result type alias for WalkerError
pub type Result<T> = std::result::Result<T, WalkerError>;

/// Render a panic payload as text
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_error_not_found() {
        let err = DirectoryListingError::new(
            "/gone",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());

        let err = DirectoryListingError::new(
            "/locked",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("/locked"));
    }

    #[test]
    fn test_error_conversion() {
        let cfg_err = ConfigError::InvalidWorkerCount { count: 0, max: 512 };
        let walker_err: WalkerError = cfg_err.into();
        assert!(matches!(walker_err, WalkerError::Config(_)));
    }

    #[test]
    fn test_processing_error_path() {
        let err = FileProcessingError::Panicked {
            path: PathBuf::from("/a/b"),
            message: "boom".into(),
        };
        assert_eq!(err.path(), std::path::Path::new("/a/b"));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
