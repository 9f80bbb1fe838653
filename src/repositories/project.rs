//! Project repository
//!
//! Upserts keyed by the external node id and the read queries behind the
//! project listing.

use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;

use crate::models::project::{self, Entity as Project};

/// Repository for project rows
#[derive(Debug, Clone)]
pub struct ProjectRepository {
    pub db: Arc<DatabaseConnection>,
}

impl ProjectRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert or rename the project with external id `gh_id`, returning the stored row.
    pub async fn upsert(&self, gh_id: &str, name: &str) -> Result<project::Model> {
        let am = project::ActiveModel {
            gh_id: Set(gh_id.to_string()),
            name: Set(name.to_string()),
            ..Default::default()
        };

        Project::insert(am)
            .on_conflict(
                OnConflict::column(project::Column::GhId)
                    .update_column(project::Column::Name)
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await
            .with_context(|| format!("upserting project {gh_id}"))?;

        self.find_by_gh_id(gh_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("project '{}' not persisted", gh_id))
    }

    pub async fn find_by_gh_id(&self, gh_id: &str) -> Result<Option<project::Model>> {
        let project = Project::find()
            .filter(project::Column::GhId.eq(gh_id))
            .one(&*self.db)
            .await?;
        Ok(project)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<project::Model>> {
        Ok(Project::find_by_id(id).one(&*self.db).await?)
    }

    /// All projects, oldest first
    pub async fn find_all(&self) -> Result<Vec<project::Model>> {
        let projects = Project::find()
            .order_by_asc(project::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(projects)
    }
}
