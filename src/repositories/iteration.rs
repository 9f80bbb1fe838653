//! Iteration repository

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;

use crate::models::iteration::{self, Entity as Iteration};

/// Repository for iteration rows
#[derive(Debug, Clone)]
pub struct IterationRepository {
    pub db: Arc<DatabaseConnection>,
}

impl IterationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert or update the iteration keyed by `gh_id`.
    ///
    /// Title, dates and the owning project are overwritten; rows are never
    /// deleted when an iteration disappears upstream.
    pub async fn upsert(
        &self,
        gh_id: &str,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        project_id: i32,
    ) -> Result<iteration::Model> {
        let am = iteration::ActiveModel {
            gh_id: Set(gh_id.to_string()),
            name: Set(name.to_string()),
            start_date: Set(start_date),
            end_date: Set(end_date),
            project_id: Set(project_id),
            ..Default::default()
        };

        Iteration::insert(am)
            .on_conflict(
                OnConflict::column(iteration::Column::GhId)
                    .update_columns([
                        iteration::Column::Name,
                        iteration::Column::StartDate,
                        iteration::Column::EndDate,
                        iteration::Column::ProjectId,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await
            .with_context(|| format!("upserting iteration {gh_id}"))?;

        Iteration::find()
            .filter(iteration::Column::GhId.eq(gh_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow::anyhow!("iteration '{}' not persisted", gh_id))
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<iteration::Model>> {
        Ok(Iteration::find_by_id(id).one(&*self.db).await?)
    }

    /// Iterations of a project ordered by start date
    pub async fn find_by_project(&self, project_id: i32) -> Result<Vec<iteration::Model>> {
        let iterations = Iteration::find()
            .filter(iteration::Column::ProjectId.eq(project_id))
            .order_by_asc(iteration::Column::StartDate)
            .order_by_asc(iteration::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(iterations)
    }
}
