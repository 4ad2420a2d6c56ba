//! treewalk - Parallel Directory Tree Traversal
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use treewalk::config::{CliArgs, ProcessorKind, WalkConfig};
use treewalk::fs::LocalFs;
use treewalk::processor::{FileProcessor, NoOp, SimulatedWork, SizeTally};
use treewalk::progress::{print_header, print_summary, ProgressReporter};
use treewalk::walker::{traverse_with_progress, WalkContext};

/// How often the progress line refreshes
const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = WalkConfig::from_args(args).context("Invalid configuration")?;

    let (processor, bytes) = build_processor(&config);
    let ctx = WalkContext::builder(processor)
        .filesystem(Arc::new(
            LocalFs::new().follow_symlinks(config.follow_symlinks),
        ))
        .filter(config.filter.clone())
        .build();

    // Setup signal handler for graceful shutdown
    let shutdown_flag = ctx.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, finishing in-flight files...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let walker = config.strategy.build(ctx, config.pool);

    if config.show_progress {
        print_header(
            &config.root.display().to_string(),
            config.strategy,
            config.pool.workers,
        );
    }

    let start = Instant::now();
    let result = if config.show_progress {
        let progress = ProgressReporter::new();
        progress.set_status("Starting walk...");

        let result = traverse_with_progress(walker.as_ref(), &config.root, PROGRESS_INTERVAL, |p| {
            progress.update(&p)
        });

        match &result {
            Ok(stats) if stats.completed => progress.finish("Walk completed"),
            Ok(_) => progress.finish("Walk interrupted"),
            Err(_) => progress.finish_and_clear(),
        }
        result
    } else {
        walker.traverse(&config.root)
    };
    let stats = result.context("Walk failed")?;

    info!(
        strategy = %config.strategy,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Total elapsed"
    );

    print_summary(&stats, bytes.map(|b| b.load(Ordering::Relaxed)));

    // Report success/failure
    if !stats.completed {
        info!("Walk was interrupted before completion");
    }

    if stats.errors() > 0 {
        info!(errors = stats.errors(), "Walk completed with errors");
    }

    Ok(())
}

/// Build the per-file processor, plus a byte counter when it tallies sizes
fn build_processor(config: &WalkConfig) -> (Arc<dyn FileProcessor>, Option<Arc<AtomicU64>>) {
    match config.processor {
        ProcessorKind::Simulate => {
            let work: Arc<dyn FileProcessor> = Arc::new(SimulatedWork::new(config.max_sleep));
            (work, None)
        }
        ProcessorKind::Size => {
            let tally = SizeTally::new();
            let counter = tally.counter();
            let work: Arc<dyn FileProcessor> = Arc::new(tally);
            (work, Some(counter))
        }
        ProcessorKind::Noop => (Arc::new(NoOp) as Arc<dyn FileProcessor>, None),
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("treewalk=debug,warn")
    } else {
        EnvFilter::new("treewalk=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
