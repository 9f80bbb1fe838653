//! Migration to create the work_item_history snapshot table.
//!
//! Each row is the observed state of one item on one day. The unique index on
//! `(change_date, gh_id)` is the conflict target for the daily upsert.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WorkItemHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WorkItemHistory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WorkItemHistory::ChangeDate).date().not_null())
                    .col(ColumnDef::new(WorkItemHistory::GhId).string().not_null())
                    .col(ColumnDef::new(WorkItemHistory::ProjectId).integer().not_null())
                    .col(ColumnDef::new(WorkItemHistory::IterationId).integer().null())
                    .col(ColumnDef::new(WorkItemHistory::Name).string().not_null())
                    .col(ColumnDef::new(WorkItemHistory::Status).string().null())
                    .col(
                        ColumnDef::new(WorkItemHistory::Effort)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(WorkItemHistory::RemainingHours)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(WorkItemHistory::Labels).json().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_item_history_project")
                            .from(WorkItemHistory::Table, WorkItemHistory::ProjectId)
                            .to(Project::Table, Project::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_item_history_iteration")
                            .from(WorkItemHistory::Table, WorkItemHistory::IterationId)
                            .to(Iteration::Table, Iteration::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_work_item_history_day_item")
                    .table(WorkItemHistory::Table)
                    .col(WorkItemHistory::ChangeDate)
                    .col(WorkItemHistory::GhId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_work_item_history_iteration")
                    .table(WorkItemHistory::Table)
                    .col(WorkItemHistory::IterationId)
                    .col(WorkItemHistory::ChangeDate)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_work_item_history_project")
                    .table(WorkItemHistory::Table)
                    .col(WorkItemHistory::ProjectId)
                    .col(WorkItemHistory::ChangeDate)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WorkItemHistory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum WorkItemHistory {
    Table,
    Id,
    ChangeDate,
    GhId,
    ProjectId,
    IterationId,
    Name,
    Status,
    Effort,
    RemainingHours,
    Labels,
}

#[derive(DeriveIden)]
enum Project {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Iteration {
    Table,
    Id,
}
