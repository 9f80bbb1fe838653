//! Migration to create the iteration table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Iteration::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Iteration::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Iteration::GhId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Iteration::Name).string().not_null())
                    .col(ColumnDef::new(Iteration::StartDate).date().not_null())
                    .col(ColumnDef::new(Iteration::EndDate).date().not_null())
                    .col(ColumnDef::new(Iteration::ProjectId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_iteration_project")
                            .from(Iteration::Table, Iteration::ProjectId)
                            .to(Project::Table, Project::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_iteration_project_id")
                    .table(Iteration::Table)
                    .col(Iteration::ProjectId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Iteration::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Iteration {
    Table,
    Id,
    GhId,
    Name,
    StartDate,
    EndDate,
    ProjectId,
}

#[derive(DeriveIden)]
enum Project {
    Table,
    Id,
}
