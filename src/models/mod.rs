//! # Data Models
//!
//! SeaORM entities for the snapshot tables plus the JSON shapes returned by
//! the reporting API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod iteration;
pub mod project;
pub mod work_item_history;
pub mod work_item_status;

pub use iteration::Entity as Iteration;
pub use project::Entity as Project;
pub use work_item_history::Entity as WorkItemHistory;
pub use work_item_status::Entity as WorkItemStatus;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "charts".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// A tracked project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub id: i32,
    pub title: String,
}

impl From<project::Model> for ProjectInfo {
    fn from(model: project::Model) -> Self {
        Self {
            id: model.id,
            title: model.name,
        }
    }
}

/// An iteration of a tracked project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IterationInfo {
    pub id: i32,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl From<iteration::Model> for IterationInfo {
    fn from(model: iteration::Model) -> Self {
        Self {
            id: model.id,
            title: model.name,
            start_date: model.start_date,
            end_date: model.end_date,
        }
    }
}

/// Health of a single backing dependency
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthDependency {
    pub name: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResult {
    pub healthy: bool,
    pub dependencies: Vec<HealthDependency>,
}
