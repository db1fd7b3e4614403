//! Run planning
//!
//! Decides, before any worker starts, which domains this run processes and
//! which it skips because their catalog entry is still fresh. The plan is made
//! once against the store as loaded; nothing re-plans mid-run.

use crate::source::DomainTask;
use crate::storage::SnapshotStore;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Work for one run, in source order
#[derive(Debug, Default)]
pub struct RunPlan {
    /// Stale or unknown domains
    pub to_process: Vec<DomainTask>,

    /// Domains with a fresh entry
    pub skipped: Vec<DomainTask>,

    /// Repeated domains dropped from the input
    pub duplicates: usize,
}

impl RunPlan {
    pub fn total(&self) -> usize {
        self.to_process.len() + self.skipped.len()
    }
}

/// Splits `tasks` into stale and fresh domains
///
/// A domain listed more than once is kept at its first position.
pub fn plan_run(
    tasks: Vec<DomainTask>,
    store: &SnapshotStore,
    staleness_days: u32,
    now: DateTime<Utc>,
) -> RunPlan {
    let mut seen = HashSet::new();
    let mut plan = RunPlan::default();

    for task in tasks {
        if !seen.insert(task.domain.clone()) {
            tracing::debug!("Ignoring repeated domain {}", task.domain);
            plan.duplicates += 1;
            continue;
        }

        if store.is_stale(&task.domain, staleness_days, now) {
            plan.to_process.push(task);
        } else {
            tracing::trace!("{} is fresh", task.domain);
            plan.skipped.push(task);
        }
    }

    tracing::info!(
        "Planned run: {} to process, {} fresh, {} duplicates",
        plan.to_process.len(),
        plan.skipped.len(),
        plan.duplicates
    );
    plan
}
