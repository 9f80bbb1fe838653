//! Project entity model
//!
//! One row per upstream project, keyed by the external node id (`gh_id`).

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "project")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// External project node id (unique)
    #[sea_orm(unique)]
    pub gh_id: String,

    /// Project title as reported upstream
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::iteration::Entity")]
    Iteration,
    #[sea_orm(has_many = "super::work_item_history::Entity")]
    WorkItemHistory,
}

impl Related<super::iteration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Iteration.def()
    }
}

impl Related<super::work_item_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkItemHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
