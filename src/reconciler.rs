//! Snapshot reconciliation
//!
//! Writes one normalized [`Project`] into the store in a fixed order: the
//! project row, its iterations, the status vocabulary, then one history row
//! per issue for the snapshot day. Every write is an upsert, so running the
//! same project twice on one day leaves the store unchanged and a failed run
//! heals on the next one. No transaction spans the steps.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use thiserror::Error;
use tracing::{debug, info};

use crate::normalization::Project;
use crate::repositories::{
    IterationRepository, NewSnapshot, ProjectRepository, WorkItemHistoryRepository,
    WorkItemStatusRepository,
};

/// The step a reconciliation stopped at, with the key of the entity being written.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to upsert project {key}: {source:#}")]
    Project {
        key: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to upsert iteration {key}: {source:#}")]
    Iteration {
        key: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to upsert status {key}: {source:#}")]
    Status {
        key: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to upsert work item {key}: {source:#}")]
    WorkItem {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ReconcileError {
    pub fn step(&self) -> &'static str {
        match self {
            ReconcileError::Project { .. } => "project",
            ReconcileError::Iteration { .. } => "iteration",
            ReconcileError::Status { .. } => "status",
            ReconcileError::WorkItem { .. } => "work_item",
        }
    }
}

/// Row counts written by one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub project_id: i32,
    pub iterations: usize,
    pub statuses: usize,
    pub work_items: usize,
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    projects: ProjectRepository,
    iterations: IterationRepository,
    statuses: WorkItemStatusRepository,
    history: WorkItemHistoryRepository,
}

impl Reconciler {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            projects: ProjectRepository::new(db.clone()),
            iterations: IterationRepository::new(db.clone()),
            statuses: WorkItemStatusRepository::new(db.clone()),
            history: WorkItemHistoryRepository::new(db),
        }
    }

    /// Snapshot `project` for the current UTC day.
    pub async fn reconcile(&self, project: &Project) -> Result<ReconcileSummary, ReconcileError> {
        self.reconcile_on(project, Utc::now().date_naive()).await
    }

    /// Snapshot `project` as observed on `change_date`.
    pub async fn reconcile_on(
        &self,
        project: &Project,
        change_date: NaiveDate,
    ) -> Result<ReconcileSummary, ReconcileError> {
        let stored = self
            .projects
            .upsert(&project.external_id, &project.title)
            .await
            .map_err(|source| ReconcileError::Project {
                key: project.external_id.clone(),
                source,
            })?;

        let mut iteration_ids: HashMap<&str, i32> = HashMap::with_capacity(project.iterations.len());
        for iteration in &project.iterations {
            let row = self
                .iterations
                .upsert(
                    &iteration.external_id,
                    &iteration.title,
                    iteration.start_date,
                    iteration.end_date,
                    stored.id,
                )
                .await
                .map_err(|source| ReconcileError::Iteration {
                    key: iteration.external_id.clone(),
                    source,
                })?;
            iteration_ids.insert(iteration.external_id.as_str(), row.id);
        }

        for status in &project.statuses {
            self.statuses
                .upsert(status)
                .await
                .map_err(|source| ReconcileError::Status {
                    key: status.clone(),
                    source,
                })?;
        }

        for issue in &project.issues {
            // An unknown iteration just means the item is unassigned today.
            let iteration_id = issue
                .iteration_external_id
                .as_deref()
                .and_then(|gh_id| iteration_ids.get(gh_id).copied());

            self.history
                .upsert(NewSnapshot {
                    change_date,
                    gh_id: issue.external_id.clone(),
                    name: issue.title.clone(),
                    status: issue.status.clone(),
                    effort: issue.effort,
                    remaining_hours: issue.remaining_hours,
                    iteration_id,
                    project_id: stored.id,
                    labels: issue.labels.clone(),
                })
                .await
                .map_err(|source| ReconcileError::WorkItem {
                    key: issue.external_id.clone(),
                    source,
                })?;
        }

        let summary = ReconcileSummary {
            project_id: stored.id,
            iterations: project.iterations.len(),
            statuses: project.statuses.len(),
            work_items: project.issues.len(),
        };

        debug!(project = %project.external_id, ?summary, %change_date, "snapshot written");
        info!(
            project = %project.title,
            work_items = summary.work_items,
            "project reconciled"
        );

        Ok(summary)
    }
}
