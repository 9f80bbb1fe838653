//! Iteration entity model
//!
//! Iterations are upserted by external id on every pull and never deleted.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "iteration")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// External iteration id (unique)
    #[sea_orm(unique)]
    pub gh_id: String,

    pub name: String,

    pub start_date: Date,

    /// `start_date` plus the iteration duration in days
    pub end_date: Date,

    pub project_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
