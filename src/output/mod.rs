//! Output module for run summaries and catalog reports
//!
//! This module handles:
//! - Printing the summary of a pipeline run
//! - Printing the plan of a dry run
//! - Catalog statistics for `--stats`

pub mod stats;

pub use stats::{load_statistics, print_statistics, CatalogStatistics};

use crate::pipeline::{RunPlan, RunSummary};

/// Prints a run summary to stdout
pub fn print_run_summary(summary: &RunSummary) {
    println!("=== Run Summary ===\n");
    println!("  Processed: {}", summary.processed);
    println!("    New:     {}", summary.new);
    println!("    Updated: {}", summary.updated);
    println!("    Failed:  {}", summary.failed);
    println!("  Skipped:   {}", summary.skipped);
    if summary.cancelled > 0 {
        println!("  Cancelled: {}", summary.cancelled);
    }
    println!("  Duration:  {:.1}s", summary.duration_ms as f64 / 1000.0);
}

/// Prints which domains a run would process and which it would skip
pub fn print_plan(plan: &RunPlan) {
    println!("=== Dry Run ===\n");

    println!("Would process ({}):", plan.to_process.len());
    for task in &plan.to_process {
        println!("  {} <{}>", task.domain, task.url);
    }
    println!();

    println!("Fresh, would skip ({}):", plan.skipped.len());
    for task in &plan.skipped {
        println!("  {}", task.domain);
    }

    if plan.duplicates > 0 {
        println!();
        println!("Repeated entries ignored: {}", plan.duplicates);
    }
}
