//! Pipeline coordinator - run orchestration
//!
//! The coordinator owns the snapshot store for the whole run. It plans the
//! run, dispatches stale domains to a bounded pool of workers and applies
//! their reports one at a time:
//! - Workers fetch, analyze and capture, then send a `TaskReport` back
//! - Only the coordinator merges into the store and persists it
//! - Cancellation or the run timeout stops dispatch; in-flight work gets a
//!   grace period before it is abandoned
//! - The store is persisted after every merge and once more at run end

use crate::analyzer::{analyze_blocking, ContentAnalyzer, PatternAnalyzer};
use crate::config::Config;
use crate::pipeline::fetcher::{build_http_client, fetch_page, FetchError};
use crate::pipeline::scheduler::{plan_run, RunPlan};
use crate::source::DomainTask;
use crate::state::TaskState;
use crate::storage::{MergeOutcome, Snapshot, SnapshotStore, StorageResult};
use crate::thumbnail::{CaptureOutcome, ChromeRenderer, ThumbnailCapturer};
use crate::url::domain_hash;
use chrono::Utc;
use futures::FutureExt;
use reqwest::Client;
use serde::Serialize;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Outcome counts for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Domains that were fetched (merged or failed)
    pub processed: usize,
    /// Domains with a fresh snapshot
    pub skipped: usize,
    pub failed: usize,
    /// Merges that created an entry
    pub new: usize,
    /// Merges that replaced an entry
    pub updated: usize,
    /// Domains never started or abandoned because the run was stopped
    pub cancelled: usize,
    pub duration_ms: u64,
}

enum TaskResult {
    /// The snapshot's thumbnail is still staged until the merge publishes it
    Completed {
        snapshot: Box<Snapshot>,
        thumbnail: CaptureOutcome,
    },
    Failed(FetchError),
    Crashed(String),
}

/// What a worker sends back for one domain
struct TaskReport {
    domain: String,
    state: TaskState,
    result: TaskResult,
}

/// Everything a worker needs, shared read-only across workers
struct WorkerContext {
    client: Client,
    analyzer: Arc<dyn ContentAnalyzer>,
    capturer: Arc<ThumbnailCapturer>,
    politeness_delay: Duration,
}

/// Main pipeline coordinator
pub struct Coordinator {
    config: Arc<Config>,
    store: SnapshotStore,
    context: Arc<WorkerContext>,
}

impl Coordinator {
    /// Creates a coordinator with the configured analyzer, HTTP client and
    /// capturer; a browser is started only when rendering is enabled
    pub async fn new(config: Config, store: SnapshotStore) -> crate::Result<Self> {
        let client = build_http_client(&config.user_agent, &config.fetch)?;
        let renderer = ChromeRenderer::detect(&config.render).await;
        let capturer = ThumbnailCapturer::new(
            client.clone(),
            &config.thumbnail,
            config.pipeline.capture_concurrency as usize,
        )
        .with_renderer(renderer, &config.render);
        let analyzer = Arc::new(PatternAnalyzer::from_config(&config.analyzer));

        Ok(Self::with_parts(config, store, client, analyzer, capturer))
    }

    /// Creates a coordinator from already built collaborators
    pub fn with_parts(
        config: Config,
        store: SnapshotStore,
        client: Client,
        analyzer: Arc<dyn ContentAnalyzer>,
        capturer: ThumbnailCapturer,
    ) -> Self {
        let context = Arc::new(WorkerContext {
            client,
            analyzer,
            capturer: Arc::new(capturer),
            politeness_delay: config.pipeline.politeness_delay(),
        });

        Self {
            config: Arc::new(config),
            store,
            context,
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn into_store(self) -> SnapshotStore {
        self.store
    }

    /// Splits `tasks` into domains to process and fresh domains, without
    /// touching the network
    pub fn plan(&self, tasks: Vec<DomainTask>) -> RunPlan {
        plan_run(tasks, &self.store, self.config.pipeline.staleness_days, Utc::now())
    }

    /// Runs the pipeline over `tasks`
    ///
    /// Per-domain failures are counted in the summary. Only a store write
    /// failure ends the run with an error.
    pub async fn run(&mut self, tasks: Vec<DomainTask>, cancel: CancellationToken) -> crate::Result<RunSummary> {
        let started = std::time::Instant::now();
        let pipeline = self.config.pipeline.clone();
        let mut summary = RunSummary::default();

        let plan = self.plan(tasks);
        for task in &plan.skipped {
            let mut state = TaskState::Pending;
            advance(&task.domain, &mut state, TaskState::Skipped);
        }
        summary.skipped = plan.skipped.len();

        tracing::info!(
            "Starting run: {} domains with {} workers ({} captures at once)",
            plan.to_process.len(),
            pipeline.workers,
            pipeline.capture_concurrency
        );

        let run_deadline = pipeline.run_timeout().map(|t| Instant::now() + t);
        let capture_deadline = self
            .config
            .thumbnail
            .batch_timeout()
            .map(|t| Instant::now() + t);

        let workers_limit = pipeline.workers.max(1) as usize;
        let permits = Arc::new(Semaphore::new(workers_limit));
        let (tx, mut rx) = mpsc::channel::<TaskReport>(workers_limit * 2);
        let mut workers = JoinSet::new();

        let mut pending: VecDeque<DomainTask> = plan.to_process.into();
        let mut in_flight = 0usize;
        let mut stopping = false;
        let mut grace_deadline: Option<Instant> = None;
        let far_future = Instant::now() + Duration::from_secs(365 * 24 * 60 * 60);

        loop {
            if (stopping || pending.is_empty()) && in_flight == 0 {
                break;
            }

            tokio::select! {
                biased;

                Some(report) = rx.recv() => {
                    in_flight -= 1;
                    self.apply_report(report, &mut summary)?;

                    if summary.processed % 10 == 0 {
                        let elapsed = started.elapsed();
                        tracing::info!(
                            "Progress: {} processed, {} queued, {:.2} domains/sec",
                            summary.processed,
                            pending.len(),
                            summary.processed as f64 / elapsed.as_secs_f64().max(0.001)
                        );
                    }
                }

                _ = cancel.cancelled(), if !stopping => {
                    stopping = true;
                    grace_deadline = Some(Instant::now() + pipeline.shutdown_grace());
                    stop_dispatch("Run cancelled", &mut pending, &mut summary, in_flight, pipeline.shutdown_grace());
                }

                _ = sleep_until(run_deadline.unwrap_or(far_future)), if !stopping && run_deadline.is_some() => {
                    stopping = true;
                    grace_deadline = Some(Instant::now() + pipeline.shutdown_grace());
                    stop_dispatch("Run timeout reached", &mut pending, &mut summary, in_flight, pipeline.shutdown_grace());
                }

                _ = sleep_until(grace_deadline.unwrap_or(far_future)), if grace_deadline.is_some() => {
                    tracing::warn!("Grace period over; abandoning {} domains in flight", in_flight);
                    break;
                }

                Ok(permit) = permits.clone().acquire_owned(), if !stopping && !pending.is_empty() => {
                    if let Some(task) = pending.pop_front() {
                        let context = self.context.clone();
                        let tx = tx.clone();
                        in_flight += 1;

                        workers.spawn(async move {
                            let report = match AssertUnwindSafe(process_task(&context, &task, capture_deadline))
                                .catch_unwind()
                                .await
                            {
                                Ok(report) => report,
                                Err(panic) => TaskReport {
                                    domain: task.domain.clone(),
                                    state: TaskState::Failed,
                                    result: TaskResult::Crashed(panic_message(panic.as_ref())),
                                },
                            };

                            // A closed channel means the run is over
                            let _ = tx.send(report).await;

                            if !context.politeness_delay.is_zero() {
                                tokio::time::sleep(context.politeness_delay).await;
                            }
                            drop(permit);
                        });
                    }
                }

                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    if let Err(e) = joined {
                        if !e.is_cancelled() {
                            tracing::error!("Worker task failed: {}", e);
                        }
                    }
                }

                else => break,
            }
        }

        workers.abort_all();
        while workers.join_next().await.is_some() {}

        // Reports sent before the workers stopped still count
        while let Ok(report) = rx.try_recv() {
            in_flight -= 1;
            self.apply_report(report, &mut summary)?;
        }
        summary.cancelled += in_flight;

        self.store.persist()?;

        summary.duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            "Run completed in {:?}: {} processed ({} new, {} updated, {} failed), {} skipped, {} cancelled",
            started.elapsed(),
            summary.processed,
            summary.new,
            summary.updated,
            summary.failed,
            summary.skipped,
            summary.cancelled
        );

        Ok(summary)
    }

    /// Applies one worker report to the store and the summary
    fn apply_report(&mut self, report: TaskReport, summary: &mut RunSummary) -> StorageResult<()> {
        let TaskReport {
            domain,
            mut state,
            result,
        } = report;
        summary.processed += 1;

        match result {
            TaskResult::Completed {
                mut snapshot,
                thumbnail,
            } => {
                let strategy = snapshot.thumbnail_strategy;
                snapshot.thumbnail_path = thumbnail
                    .publish()
                    .map(|p| p.to_string_lossy().into_owned());
                let outcome = self.store.merge(*snapshot);
                self.store.persist()?;
                advance(&domain, &mut state, TaskState::Merged);

                match outcome {
                    MergeOutcome::Inserted => summary.new += 1,
                    MergeOutcome::Updated => summary.updated += 1,
                }
                tracing::info!(
                    "Merged {} ({:?}, thumbnail from {})",
                    domain,
                    outcome,
                    strategy.map(|s| s.to_string()).unwrap_or_else(|| "nowhere".to_string())
                );
            }
            TaskResult::Failed(e) => {
                summary.failed += 1;
                tracing::warn!(
                    "Failed to fetch {} [{}]: {} (kept prior snapshot if any)",
                    domain,
                    e.kind(),
                    e
                );
            }
            TaskResult::Crashed(message) => {
                summary.failed += 1;
                tracing::error!("Processing {} crashed: {}", domain, message);
            }
        }
        Ok(())
    }
}

/// Fetches, analyzes and captures one domain
async fn process_task(
    context: &WorkerContext,
    task: &DomainTask,
    capture_deadline: Option<Instant>,
) -> TaskReport {
    let mut state = TaskState::Pending;
    advance(&task.domain, &mut state, TaskState::Fetching);

    let fetched = match Url::parse(&task.url) {
        Ok(url) => fetch_page(&context.client, &url).await,
        Err(e) => Err(FetchError::InvalidUrl(format!("{}: {}", task.url, e))),
    };

    let page = match fetched {
        Ok(page) => page,
        Err(e) => {
            advance(&task.domain, &mut state, TaskState::Failed);
            return TaskReport {
                domain: task.domain.clone(),
                state,
                result: TaskResult::Failed(e),
            };
        }
    };

    tracing::debug!(
        "Fetched {} from {} (status {}, {} bytes)",
        task.domain,
        page.final_url,
        page.status,
        page.body.len()
    );

    let html: Arc<str> = Arc::from(page.body);

    // Capture reuses the fetched markup and overlaps with analysis
    advance(&task.domain, &mut state, TaskState::Analyzing);
    advance(&task.domain, &mut state, TaskState::Capturing);
    let (analysis, capture) = tokio::join!(
        analyze_blocking(context.analyzer.clone(), html.clone()),
        context
            .capturer
            .capture_page(&page.final_url, &task.domain, Some(&*html), capture_deadline)
    );

    let snapshot = Snapshot {
        domain: task.domain.clone(),
        domain_hash: domain_hash(&task.domain),
        url: page.final_url.to_string(),
        theme: analysis.theme,
        keywords: analysis.keywords,
        technologies: analysis.technologies,
        hashtags: Vec::new(),
        thumbnail_path: None,
        thumbnail_strategy: Some(capture.strategy),
        description: String::new(),
        last_updated: Utc::now(),
    };

    TaskReport {
        domain: task.domain.clone(),
        state,
        result: TaskResult::Completed {
            snapshot: Box::new(snapshot),
            thumbnail: capture,
        },
    }
}

/// Drops every task not yet started and counts it as cancelled
fn stop_dispatch(
    reason: &str,
    pending: &mut VecDeque<DomainTask>,
    summary: &mut RunSummary,
    in_flight: usize,
    grace: Duration,
) {
    tracing::warn!(
        "{}: {} domains not started, waiting up to {:?} for {} in flight",
        reason,
        pending.len(),
        grace,
        in_flight
    );
    summary.cancelled += pending.len();
    pending.clear();
}

fn advance(domain: &str, state: &mut TaskState, next: TaskState) {
    match state.transition(next) {
        Ok(()) => tracing::trace!("{} -> {}", domain, next),
        Err((from, to)) => tracing::error!("Invalid state change for {}: {} -> {}", domain, from, to),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
