//! Database migrations for the charts service.
//!
//! Creates the snapshot tables written by the ingestion pipeline and read by
//! the reporting endpoints.

pub use sea_orm_migration::prelude::*;

mod m2025_01_01_000001_create_project;
mod m2025_01_01_000002_create_iteration;
mod m2025_01_01_000003_create_work_item_status;
mod m2025_01_01_000004_create_work_item_history;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_01_000001_create_project::Migration),
            Box::new(m2025_01_01_000002_create_iteration::Migration),
            Box::new(m2025_01_01_000003_create_work_item_status::Migration),
            Box::new(m2025_01_01_000004_create_work_item_history::Migration),
        ]
    }
}
