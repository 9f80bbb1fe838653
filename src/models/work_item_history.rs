//! Work item history entity model
//!
//! A snapshot row records the state of one work item on one day. Rows are
//! unique per `(change_date, gh_id)`; earlier days are never rewritten.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "work_item_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// UTC day the snapshot was taken
    pub change_date: Date,

    /// External project item id
    pub gh_id: String,

    pub project_id: i32,

    /// Absent when the item was not assigned to an iteration that day
    pub iteration_id: Option<i32>,

    pub name: String,

    pub status: Option<String>,

    #[sea_orm(column_type = "Double")]
    pub effort: f64,

    #[sea_orm(column_type = "Double")]
    pub remaining_hours: f64,

    /// Issue labels as a JSON array of names
    #[sea_orm(column_type = "Json", nullable)]
    pub labels: Option<JsonValue>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
    #[sea_orm(
        belongs_to = "super::iteration::Entity",
        from = "Column::IterationId",
        to = "super::iteration::Column::Id"
    )]
    Iteration,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::iteration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Iteration.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
