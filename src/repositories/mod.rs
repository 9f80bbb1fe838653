//! # Repository Layer
//!
//! SeaORM access to the snapshot tables. Writes are conflict-resolving
//! upserts on each table's natural key followed by a lookup of the stored row.

pub mod iteration;
pub mod project;
pub mod work_item_history;
pub mod work_item_status;

pub use iteration::IterationRepository;
pub use project::ProjectRepository;
pub use work_item_history::{NewSnapshot, WorkItemHistoryRepository};
pub use work_item_status::WorkItemStatusRepository;
