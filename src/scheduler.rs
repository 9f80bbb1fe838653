//! # Data Pull Job
//!
//! Background task that wakes once a minute, checks the cron schedule, and
//! when due pulls every configured project source in turn: fetch, normalize,
//! reconcile. A failing source is logged and skipped; the others still run.
//!
//! The job has two states. `start` spawns the timer task; `stop` cancels the
//! timer and waits for an in-flight pass to finish instead of aborting it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ProjectSource;
use crate::connectors::{FetchError, ProjectFetcher};
use crate::normalization;
use crate::reconciler::{ReconcileError, ReconcileSummary, Reconciler};
use crate::schedule::{Schedule, ScheduleError};

/// How often the schedule is evaluated.
const TICK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("data pull job is already running")]
    AlreadyRunning,
}

/// Why one source was skipped for this pass.
#[derive(Debug, Error)]
pub enum PullError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl PullError {
    pub fn step(&self) -> &'static str {
        match self {
            PullError::Fetch(_) => "fetch",
            PullError::Reconcile(err) => err.step(),
        }
    }
}

/// Outcome counts for one pass over the configured sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped_duplicates: u64,
}

impl TickStats {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

struct JobInner {
    schedule: Schedule,
    sources: Vec<ProjectSource>,
    fetcher: Arc<dyn ProjectFetcher>,
    reconciler: Reconciler,
}

enum JobState {
    Stopped,
    Running {
        shutdown: CancellationToken,
        handle: JoinHandle<()>,
    },
}

/// Scheduled ingestion of all configured project sources.
pub struct DataPullJob {
    inner: Arc<JobInner>,
    state: Mutex<JobState>,
    tick_interval: Duration,
}

impl DataPullJob {
    /// Build a stopped job. Fails when `expression` is empty or malformed.
    pub fn new(
        expression: &str,
        sources: Vec<ProjectSource>,
        fetcher: Arc<dyn ProjectFetcher>,
        reconciler: Reconciler,
    ) -> Result<Self, SchedulerError> {
        let schedule = Schedule::parse(expression)?;

        if sources.is_empty() {
            warn!("no project sources configured; the data pull job will have nothing to do");
        }

        Ok(Self {
            inner: Arc::new(JobInner {
                schedule,
                sources,
                fetcher,
                reconciler,
            }),
            state: Mutex::new(JobState::Stopped),
            tick_interval: TICK_INTERVAL,
        })
    }

    /// Override the timer period (tests).
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn is_running(&self) -> bool {
        matches!(
            *self.state.lock().unwrap_or_else(|e| e.into_inner()),
            JobState::Running { .. }
        )
    }

    /// Spawn the timer task. Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(*state, JobState::Running { .. }) {
            return Err(SchedulerError::AlreadyRunning);
        }

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            self.inner.clone(),
            self.tick_interval,
            shutdown.clone(),
        ));

        info!(
            cron = self.inner.schedule.expression(),
            sources = self.inner.sources.len(),
            "started data pull job"
        );
        *state = JobState::Running { shutdown, handle };
        Ok(())
    }

    /// Cancel the timer and wait for any in-flight pass to complete.
    pub async fn stop(&self) {
        let previous = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *state, JobState::Stopped)
        };

        if let JobState::Running { shutdown, handle } = previous {
            shutdown.cancel();
            if let Err(err) = handle.await {
                error!(error = %err, "data pull task ended abnormally");
            }
            info!("stopped data pull job");
        }
    }

    /// Run a pass if `now` falls in a scheduled minute.
    pub async fn tick(&self, now: DateTime<Utc>) -> Option<TickStats> {
        self.inner.tick(now).await
    }

    /// Pull every source immediately, ignoring the schedule.
    pub async fn run_once(&self) -> TickStats {
        self.inner.run_once().await
    }
}

async fn run_loop(inner: Arc<JobInner>, period: Duration, shutdown: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                inner.tick(Utc::now()).await;
            }
        }
    }
}

impl JobInner {
    async fn tick(&self, now: DateTime<Utc>) -> Option<TickStats> {
        let due = self.schedule.is_due(now);
        debug!(due, %now, "evaluated data pull schedule");
        if !due {
            return None;
        }
        Some(self.run_once().await)
    }

    #[instrument(skip_all)]
    async fn run_once(&self) -> TickStats {
        let started = Instant::now();
        let mut stats = TickStats::default();
        let mut seen = HashSet::with_capacity(self.sources.len());

        for source in &self.sources {
            let key = source.key();
            if !seen.insert(key.clone()) {
                stats.skipped_duplicates += 1;
                warn!(source = %key, "duplicate project source skipped");
                continue;
            }

            stats.processed += 1;
            match self.pull_source(source).await {
                Ok(summary) => {
                    stats.succeeded += 1;
                    counter!("data_pull_sources_total", "outcome" => "success").increment(1);
                    debug!(source = %key, ?summary, "source pulled");
                }
                Err(err) => {
                    stats.failed += 1;
                    counter!("data_pull_sources_total", "outcome" => "failure", "step" => err.step())
                        .increment(1);
                    error!(source = %key, step = err.step(), error = %err, "source pull failed");
                }
            }
        }

        histogram!("data_pull_duration_ms").record(started.elapsed().as_secs_f64() * 1_000.0);
        info!(
            processed = stats.processed,
            succeeded = stats.succeeded,
            failed = stats.failed,
            skipped_duplicates = stats.skipped_duplicates,
            "data pull pass completed"
        );

        stats
    }

    async fn pull_source(&self, source: &ProjectSource) -> Result<ReconcileSummary, PullError> {
        let raw = self.fetcher.fetch_project(source).await?;
        let project = normalization::normalize(raw);
        Ok(self.reconciler.reconcile(&project).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sea_orm::Database;

    use crate::config::ProjectOwner;
    use crate::connectors::RawProject;

    struct NeverFetcher;

    #[async_trait]
    impl ProjectFetcher for NeverFetcher {
        async fn fetch_project(&self, source: &ProjectSource) -> Result<RawProject, FetchError> {
            Err(FetchError::ProjectNotFound(source.key()))
        }
    }

    async fn reconciler() -> Reconciler {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Reconciler::new(Arc::new(db))
    }

    fn source(login: &str) -> ProjectSource {
        ProjectSource {
            owner: ProjectOwner::Organization {
                login: login.to_string(),
            },
            project_number: 1,
            token: "t".to_string(),
        }
    }

    #[tokio::test]
    async fn invalid_cron_fails_construction() {
        let result = DataPullJob::new("*", vec![], Arc::new(NeverFetcher), reconciler().await);
        assert!(matches!(result, Err(SchedulerError::Schedule(_))));

        let result = DataPullJob::new("", vec![], Arc::new(NeverFetcher), reconciler().await);
        assert!(matches!(
            result,
            Err(SchedulerError::Schedule(ScheduleError::Empty))
        ));
    }

    #[tokio::test]
    async fn start_and_stop_toggle_state() {
        let job = DataPullJob::new(
            "* * * * *",
            vec![],
            Arc::new(NeverFetcher),
            reconciler().await,
        )
        .unwrap();

        assert!(!job.is_running());
        job.start().unwrap();
        assert!(job.is_running());
        assert!(matches!(job.start(), Err(SchedulerError::AlreadyRunning)));

        job.stop().await;
        assert!(!job.is_running());

        // Stopping twice is harmless.
        job.stop().await;
    }

    #[tokio::test]
    async fn duplicate_sources_are_processed_once() {
        let job = DataPullJob::new(
            "* * * * *",
            vec![source("acme"), source("acme"), source("globex")],
            Arc::new(NeverFetcher),
            reconciler().await,
        )
        .unwrap();

        let stats = job.run_once().await;
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.skipped_duplicates, 1);
        assert_eq!(stats.failed, 2);
        assert!(stats.has_failures());
    }

    #[test]
    fn pull_error_step_names_the_failing_stage() {
        let fetch = PullError::from(FetchError::Unauthorized);
        assert_eq!(fetch.step(), "fetch");

        let reconcile = PullError::from(ReconcileError::WorkItem {
            key: "a".to_string(),
            source: anyhow::anyhow!("no such table: work_item_history"),
        });
        assert_eq!(reconcile.step(), "work_item");
        assert!(reconcile.to_string().contains("work item a"));
    }

    #[tokio::test]
    async fn tick_outside_schedule_does_nothing() {
        use chrono::TimeZone;

        let job = DataPullJob::new(
            "0 3 * * *",
            vec![source("acme")],
            Arc::new(NeverFetcher),
            reconciler().await,
        )
        .unwrap();

        let not_due = Utc.with_ymd_and_hms(2024, 3, 4, 4, 0, 0).unwrap();
        assert!(job.tick(not_due).await.is_none());

        let due = Utc.with_ymd_and_hms(2024, 3, 4, 3, 0, 30).unwrap();
        let stats = job.tick(due).await.unwrap();
        assert_eq!(stats.processed, 1);
    }
}
