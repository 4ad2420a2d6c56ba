//! Progress reporting for the tree walker
//!
//! Provides real-time progress display using indicatif progress bars.

use crate::walker::{Strategy, WalkProgress, WalkStats};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter that displays walk status
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &WalkProgress) {
        self.bar.set_message(progress_line(progress));
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn progress_line(progress: &WalkProgress) -> String {
    format!(
        "Dirs: {} | Files: {} | Done: {} | In flight: {} | Errors: {} | Rate: {:.0}/s",
        format_number(progress.dirs),
        format_number(progress.files),
        format_number(progress.processed),
        format_number(progress.in_flight()),
        format_number(progress.errors),
        progress.files_per_second(),
    )
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .rev()
                .map(|&b| b as char)
                .collect::<String>()
        })
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a summary of the walk results
pub fn print_summary(stats: &WalkStats, bytes: Option<u64>) {
    let duration_secs = stats.duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        stats.processed as f64 / duration_secs
    } else {
        0.0
    };

    let title = if stats.completed {
        style("Traverse Complete").green().bold()
    } else {
        style("Traverse Interrupted").yellow().bold()
    };

    println!();
    println!("{}", title);
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Directories:").bold(),
        format_number(stats.dirs)
    );
    println!(
        "  {} {} ({} processed)",
        style("Files:").bold(),
        format_number(stats.files),
        format_number(stats.processed)
    );
    if let Some(bytes) = bytes {
        println!("  {} {}", style("Total Size:").bold(), format_size(bytes, BINARY));
    }
    if stats.skipped > 0 {
        println!("  {} {}", style("Skipped:").bold(), format_number(stats.skipped));
    }
    println!(
        "  {} {} ms ({:.0} files/sec)",
        style("Elapsed:").bold(),
        stats.duration.as_millis(),
        rate
    );
    if stats.errors() > 0 {
        println!(
            "  {} {} ({} listing, {} processing)",
            style("Errors:").yellow().bold(),
            format_number(stats.errors()),
            format_number(stats.list_errors),
            format_number(stats.process_errors)
        );
    }
    println!();
}

/// Print a header at the start of the walk
pub fn print_header(root: &str, strategy: Strategy, workers: usize) {
    println!();
    println!(
        "{} {}",
        style("treewalk").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Root:").bold(), root);
    println!("  {} {}", style("Strategy:").bold(), strategy);
    println!("  {} {}", style("Workers:").bold(), workers);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(1234567890), "1,234,567,890");
    }

    #[test]
    fn test_progress_line() {
        let line = progress_line(&WalkProgress {
            dirs: 12,
            files: 2500,
            processed: 2000,
            errors: 1,
            elapsed: Duration::from_secs(2),
        });
        assert!(line.contains("Files: 2,500"));
        assert!(line.contains("In flight: 500"));
        assert!(line.contains("Rate: 1000/s"));
    }
}
