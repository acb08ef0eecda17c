//! Output helpers for consistent CLI formatting
//!
//! Strata runs in CI logs, so output stays line-oriented: no cursor
//! tricks beyond the spinner, which indicatif hides on non-TTYs.

use crate::engine::observer::BuildStats;
use crate::orchestrator::{BatchReport, PlatformState};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Display a section header
pub fn section(title: &str) {
    println!();
    println!("{}", style(title).bold());
}

/// Display a success step
pub fn step_ok(message: &str) {
    println!("  {} {}", style("[OK]").green(), message);
}

/// Display a warning step
pub fn step_warn(message: &str) {
    println!("  {} {}", style("[WARN]").yellow(), message);
}

/// Display an error step
pub fn step_error(message: &str) {
    println!("  {} {}", style("[FAIL]").red(), message);
}

/// Print styled key-value pair
pub fn key_value(key: &str, value: &str) {
    println!("  {}: {}", style(key).dim(), value);
}

/// Spinner used while builds and transfers run
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("valid spinner template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn stats_cell(stats: Option<&BuildStats>) -> String {
    match stats {
        Some(s) => format!("{}/{}", s.fresh, s.cached),
        None => "-".to_string(),
    }
}

/// Print the per-platform outcome table for a batch
pub fn print_batch_table(report: &BatchReport) {
    println!(
        "{:<20} {:<28} {:<10} {:<12} {:<8}",
        "PLATFORM", "TAG", "STATE", "FRESH/CACHED", "PRIMED"
    );
    println!("{}", "-".repeat(80));

    for outcome in &report.outcomes {
        let state_display = match outcome.state {
            PlatformState::Saved => style("saved").green().to_string(),
            PlatformState::Built => style("built").green().to_string(),
            PlatformState::Failed => style("failed").red().to_string(),
            PlatformState::Skipped => style("skipped").yellow().to_string(),
        };

        println!(
            "{:<20} {:<28} {:<10} {:<12} {:<8}",
            outcome.platform,
            outcome.tag,
            state_display,
            stats_cell(outcome.stats.as_ref()),
            if outcome.cache_loaded { "yes" } else { "no" },
        );

        if let Some(detail) = &outcome.detail {
            println!("    {}", style(detail).dim());
        }
    }

    println!();
    let failed = report.failed_platforms();
    if failed.is_empty() {
        println!(
            "{} {} platform(s) built",
            style("[OK]").green(),
            report.outcomes.len()
        );
    } else {
        println!(
            "{} {} of {} platform(s) failed: {}",
            style("[FAIL]").red(),
            failed.len(),
            report.outcomes.len(),
            failed.join(", ")
        );
    }
}
