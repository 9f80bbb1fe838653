//! Work item snapshot repository
//!
//! Writes one row per item per day and serves the raw rows the burndown and
//! burnup reports aggregate.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::models::work_item_history::{self, Entity as WorkItemHistory};

/// Values for one day's snapshot of one work item.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSnapshot {
    pub change_date: NaiveDate,
    pub gh_id: String,
    pub name: String,
    pub status: Option<String>,
    pub effort: f64,
    pub remaining_hours: f64,
    pub iteration_id: Option<i32>,
    pub project_id: i32,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct WorkItemHistoryRepository {
    pub db: Arc<DatabaseConnection>,
}

impl WorkItemHistoryRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert or overwrite the snapshot for `(change_date, gh_id)`.
    ///
    /// Rows of other days are never touched.
    pub async fn upsert(&self, snapshot: NewSnapshot) -> Result<work_item_history::Model> {
        let NewSnapshot {
            change_date,
            gh_id,
            name,
            status,
            effort,
            remaining_hours,
            iteration_id,
            project_id,
            labels,
        } = snapshot;

        let am = work_item_history::ActiveModel {
            change_date: Set(change_date),
            gh_id: Set(gh_id.clone()),
            project_id: Set(project_id),
            iteration_id: Set(iteration_id),
            name: Set(name),
            status: Set(status),
            effort: Set(effort),
            remaining_hours: Set(remaining_hours),
            labels: Set(Some(JsonValue::from(labels))),
            ..Default::default()
        };

        WorkItemHistory::insert(am)
            .on_conflict(
                OnConflict::columns([
                    work_item_history::Column::ChangeDate,
                    work_item_history::Column::GhId,
                ])
                .update_columns([
                    work_item_history::Column::ProjectId,
                    work_item_history::Column::IterationId,
                    work_item_history::Column::Name,
                    work_item_history::Column::Status,
                    work_item_history::Column::Effort,
                    work_item_history::Column::RemainingHours,
                    work_item_history::Column::Labels,
                ])
                .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await
            .with_context(|| format!("upserting snapshot of {gh_id} for {change_date}"))?;

        WorkItemHistory::find()
            .filter(work_item_history::Column::ChangeDate.eq(change_date))
            .filter(work_item_history::Column::GhId.eq(gh_id.as_str()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow::anyhow!("snapshot of '{}' not persisted", gh_id))
    }

    /// Every snapshot row recorded for an iteration
    pub async fn find_by_iteration(
        &self,
        iteration_id: i32,
    ) -> Result<Vec<work_item_history::Model>> {
        let rows = WorkItemHistory::find()
            .filter(work_item_history::Column::IterationId.eq(iteration_id))
            .order_by_asc(work_item_history::Column::ChangeDate)
            .order_by_asc(work_item_history::Column::GhId)
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    /// Snapshot rows of a project from `since` onwards, including rows with no iteration
    pub async fn find_by_project_since(
        &self,
        project_id: i32,
        since: NaiveDate,
    ) -> Result<Vec<work_item_history::Model>> {
        let rows = WorkItemHistory::find()
            .filter(work_item_history::Column::ProjectId.eq(project_id))
            .filter(work_item_history::Column::ChangeDate.gte(since))
            .order_by_asc(work_item_history::Column::ChangeDate)
            .order_by_asc(work_item_history::Column::GhId)
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    /// Rows of one work item across all days, oldest first
    pub async fn find_by_gh_id(&self, gh_id: &str) -> Result<Vec<work_item_history::Model>> {
        let rows = WorkItemHistory::find()
            .filter(work_item_history::Column::GhId.eq(gh_id))
            .order_by_asc(work_item_history::Column::ChangeDate)
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(WorkItemHistory::find().count(&*self.db).await?)
    }
}
