//! Configuration types for treewalk
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - Worker pool sizing and traversal filters shared by every engine

use crate::error::ConfigError;
use crate::walker::Strategy;
use clap::{Parser, ValueEnum};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Upper bound for simulated per-file work
const MAX_SLEEP_MS: u64 = 60_000;

/// Parallel directory walker
#[derive(Parser, Debug, Clone)]
#[command(
    name = "treewalk",
    version,
    about = "Walk a directory tree and process every file in parallel",
    long_about = "Walks a directory tree and runs a processor on every file while the tree is still being discovered.\n\n\
                  Three scheduling strategies are available:\n  \
                  pool   - explicit stack, files dispatched to a fixed worker pool\n  \
                  steal  - one task per entry on a work-stealing scheduler\n  \
                  stream - recursive parallel iteration over directory children",
    after_help = "EXAMPLES:\n    \
        treewalk /data\n    \
        treewalk /data --strategy steal -w 16\n    \
        treewalk /data --strategy stream --processor size --exclude '\\.git$'\n    \
        treewalk /data --processor simulate --max-sleep-ms 20 -d 3"
)]
pub struct CliArgs {
    /// Directory (or file) to traverse
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Scheduling strategy
    #[arg(short = 's', long, value_enum, default_value_t = Strategy::Pool)]
    pub strategy: Strategy,

    /// Number of worker threads
    #[arg(
        short = 'w',
        long,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Work to run on every file
    #[arg(short = 'p', long, value_enum, default_value_t = ProcessorKind::Simulate)]
    pub processor: ProcessorKind,

    /// Cap on simulated work per file, in milliseconds
    #[arg(long, default_value = "100", value_name = "MILLIS")]
    pub max_sleep_ms: u64,

    /// Maximum directory depth (unlimited if not set)
    #[arg(short = 'd', long, value_name = "NUM")]
    pub max_depth: Option<usize>,

    /// Exclude paths matching pattern (can be repeated)
    #[arg(long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Descend into symlinked directories (cycles are not detected)
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Built-in file processors selectable from the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProcessorKind {
    /// Sleep in proportion to the path length
    Simulate,
    /// Sum file sizes
    Size,
    /// Do nothing (pure traversal cost)
    #[value(name = "none")]
    Noop,
}

fn default_workers() -> usize {
    num_cpus::get()
}

/// Worker pool sizing, passed explicitly to every engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads each traversal creates
    pub workers: usize,
}

impl PoolConfig {
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::with_workers(default_workers())
    }
}

/// Limits on which discovered entries are visited
///
/// The root is always visited. Children are dropped (and counted as skipped)
/// when they exceed `max_depth` or match an exclude pattern; an excluded
/// directory is not descended into.
#[derive(Debug, Clone, Default)]
pub struct WalkFilter {
    /// Maximum depth below the root (root = 0)
    pub max_depth: Option<usize>,

    /// Compiled exclude patterns
    pub exclude_patterns: Vec<Regex>,
}

impl WalkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Compile and add an exclude pattern
    pub fn exclude(mut self, pattern: &str) -> Result<Self, ConfigError> {
        let re = Regex::new(pattern).map_err(|e| ConfigError::InvalidExcludePattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        self.exclude_patterns.push(re);
        Ok(self)
    }

    /// Check if a path should be excluded
    pub fn is_excluded(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.exclude_patterns.iter().any(|re| re.is_match(&path))
    }

    /// Check whether an entry found at `depth` should be visited
    pub fn admits(&self, path: &Path, depth: u32) -> bool {
        let within_depth = self
            .max_depth
            .map(|max| depth as usize <= max)
            .unwrap_or(true);

        within_depth && !self.is_excluded(path)
    }
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct WalkConfig {
    /// Traversal root
    pub root: PathBuf,

    /// Scheduling strategy
    pub strategy: Strategy,

    /// Worker pool sizing
    pub pool: PoolConfig,

    /// Per-file work
    pub processor: ProcessorKind,

    /// Cap for simulated work
    pub max_sleep: Duration,

    /// Depth and exclusion limits
    pub filter: WalkFilter,

    /// Descend into symlinked directories
    pub follow_symlinks: bool,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl WalkConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        // Validate worker count
        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        if args.max_sleep_ms > MAX_SLEEP_MS {
            return Err(ConfigError::InvalidSleepCap {
                millis: args.max_sleep_ms,
                max: MAX_SLEEP_MS,
            });
        }

        let mut filter = WalkFilter {
            max_depth: args.max_depth,
            exclude_patterns: Vec::with_capacity(args.exclude_patterns.len()),
        };
        for pattern in &args.exclude_patterns {
            filter = filter.exclude(pattern)?;
        }

        Ok(Self {
            root: args.root,
            strategy: args.strategy,
            pool: PoolConfig::with_workers(args.workers),
            processor: args.processor,
            max_sleep: Duration::from_millis(args.max_sleep_ms),
            filter,
            follow_symlinks: args.follow_symlinks,
            show_progress: !args.quiet,
            verbose: args.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["treewalk", "/data"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = WalkConfig::from_args(parse(&[])).unwrap();
        assert_eq!(config.root, PathBuf::from("/data"));
        assert_eq!(config.strategy, Strategy::Pool);
        assert_eq!(config.processor, ProcessorKind::Simulate);
        assert_eq!(config.pool.workers, num_cpus::get());
        assert_eq!(config.max_sleep, Duration::from_millis(100));
        assert!(config.show_progress);
        assert!(!config.follow_symlinks);
    }

    #[test]
    fn test_parse_strategy_and_workers() {
        let config =
            WalkConfig::from_args(parse(&["--strategy", "steal", "-w", "8", "-q"])).unwrap();
        assert_eq!(config.strategy, Strategy::Steal);
        assert_eq!(config.pool.workers, 8);
        assert!(!config.show_progress);

        let config = WalkConfig::from_args(parse(&["-s", "stream", "-p", "size"])).unwrap();
        assert_eq!(config.strategy, Strategy::Stream);
        assert_eq!(config.processor, ProcessorKind::Size);
    }

    #[test]
    fn test_invalid_worker_count() {
        let err = WalkConfig::from_args(parse(&["-w", "0"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWorkerCount { count: 0, .. }));

        let err = WalkConfig::from_args(parse(&["-w", "10000"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWorkerCount { .. }));
    }

    #[test]
    fn test_invalid_sleep_cap() {
        let err = WalkConfig::from_args(parse(&["--max-sleep-ms", "999999"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSleepCap { .. }));
    }

    #[test]
    fn test_invalid_exclude_pattern() {
        let err = WalkConfig::from_args(parse(&["--exclude", "("])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidExcludePattern { .. }));
    }

    #[test]
    fn test_exclude_pattern() {
        let filter = WalkFilter::new().exclude(r"\.git$").unwrap();
        assert!(filter.is_excluded(Path::new("/repo/.git")));
        assert!(!filter.is_excluded(Path::new("/repo/src/main.rs")));
    }

    #[test]
    fn test_filter_admits_depth() {
        let filter = WalkFilter::new().max_depth(1);
        assert!(filter.admits(Path::new("/r/a"), 1));
        assert!(!filter.admits(Path::new("/r/a/b"), 2));
        assert!(WalkFilter::new().admits(Path::new("/r/a/b/c/d"), 40));
    }

    #[test]
    fn test_pool_config_min_one() {
        assert_eq!(PoolConfig::with_workers(0).workers, 1);
        assert_eq!(PoolConfig::with_workers(3).workers, 3);
    }
}
