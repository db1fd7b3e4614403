//! Snapshot pipeline
//!
//! This module contains the run logic, including:
//! - Fetching pages with classified errors
//! - Planning a run against the staleness threshold
//! - Coordinating workers and merging their results

mod coordinator;
mod fetcher;
mod scheduler;

pub use coordinator::{Coordinator, RunSummary};
pub use fetcher::{build_http_client, fetch_page, FetchError, FetchedPage};
pub use scheduler::{plan_run, RunPlan};

use crate::config::Config;
use crate::source::{DomainListFile, DomainSource};
use crate::storage::open_store;
use tokio_util::sync::CancellationToken;

/// Runs one complete pipeline pass
///
/// It will:
/// 1. Read the domain list (unreadable list: setup error)
/// 2. Load the catalog, clearing it first when `fresh` is set
/// 3. Process every stale domain and persist the catalog
///
/// # Returns
///
/// * `Ok(RunSummary)` - The run finished, possibly with per-domain failures
/// * `Err(FolioError)` - Setup or storage failed
pub async fn run_pipeline(config: Config, fresh: bool, cancel: CancellationToken) -> crate::Result<RunSummary> {
    let tasks = DomainListFile::from_config(&config.input).load_tasks()?;

    let mut store = open_store(&config.storage)?;
    if fresh {
        store.reset()?;
    }

    let mut coordinator = Coordinator::new(config, store).await?;
    coordinator.run(tasks, cancel).await
}
