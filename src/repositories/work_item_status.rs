//! Status vocabulary repository

use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;

use crate::models::work_item_status::{self, Entity as WorkItemStatus};

#[derive(Debug, Clone)]
pub struct WorkItemStatusRepository {
    pub db: Arc<DatabaseConnection>,
}

impl WorkItemStatusRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record `name` in the vocabulary if it is new; existing names are left untouched.
    pub async fn upsert(&self, name: &str) -> Result<work_item_status::Model> {
        let am = work_item_status::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        };

        WorkItemStatus::insert(am)
            .on_conflict(
                OnConflict::column(work_item_status::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await
            .with_context(|| format!("upserting status {name}"))?;

        WorkItemStatus::find()
            .filter(work_item_status::Column::Name.eq(name))
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow::anyhow!("status '{}' not persisted", name))
    }

    /// The vocabulary in first-seen order
    pub async fn find_all(&self) -> Result<Vec<work_item_status::Model>> {
        let statuses = WorkItemStatus::find()
            .order_by_asc(work_item_status::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(statuses)
    }
}
