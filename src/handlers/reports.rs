//! # Report API Handlers
//!
//! Burndown and burnup series computed from the snapshot history.

use axum::{
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    response::Json,
};
use chrono::{Days, NaiveDate, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::analytics::{self, BurndownPoint, BurnupPoint};
use crate::error::{ApiError, not_found, validation_error};
use crate::repositories::{
    IterationRepository, ProjectRepository, WorkItemHistoryRepository, WorkItemStatusRepository,
};
use crate::server::AppState;

/// Query parameters for the burnup report
#[derive(Debug, Deserialize, IntoParams)]
pub struct BurnupQuery {
    /// First day of the window (`YYYY-MM-DD`); defaults to the configured lookback
    pub since: Option<NaiveDate>,
}

/// Remaining effort per business day of an iteration
#[utoipa::path(
    get,
    path = "/projects/{id}/iterations/{iteration_id}/burndown",
    params(
        ("id" = i32, Path, description = "Project id"),
        ("iteration_id" = i32, Path, description = "Iteration id")
    ),
    responses(
        (status = 200, description = "Burndown series", body = [BurndownPoint], example = json!([
            {"iterationDay": "2024-03-04", "remaining": 8.0, "ideal": 6.4},
            {"iterationDay": "2024-03-05", "remaining": 0.0, "ideal": 4.8}
        ])),
        (status = 400, description = "Malformed path parameter", body = ApiError),
        (status = 404, description = "Iteration not found in project", body = ApiError),
        (status = 500, description = "Unknown error", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn iteration_burndown(
    State(state): State<AppState>,
    path: Result<Path<(i32, i32)>, PathRejection>,
) -> Result<Json<Vec<BurndownPoint>>, ApiError> {
    let Path((project_id, iteration_id)) = path?;

    let iteration = IterationRepository::new(state.db.clone())
        .find_by_id(iteration_id)
        .await?
        .filter(|iteration| iteration.project_id == project_id)
        .ok_or_else(|| not_found("iteration", iteration_id))?;

    let rows = WorkItemHistoryRepository::new(state.db.clone())
        .find_by_iteration(iteration.id)
        .await?;

    Ok(Json(analytics::burndown(
        iteration.start_date,
        iteration.end_date,
        &rows,
        &state.config.reporting.done_status,
    )))
}

/// Daily effort per status for a project
#[utoipa::path(
    get,
    path = "/projects/{id}/burnup",
    params(
        ("id" = i32, Path, description = "Project id"),
        BurnupQuery
    ),
    responses(
        (status = 200, description = "Burnup series", body = [BurnupPoint], example = json!([
            {"status": "Done", "projectDay": "2024-03-04", "qty": 3.0},
            {"status": "Todo", "projectDay": "2024-03-04", "qty": 5.0}
        ])),
        (status = 400, description = "Malformed id or since date", body = ApiError),
        (status = 404, description = "Project not found", body = ApiError),
        (status = 500, description = "Unknown error", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn project_burnup(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
    query: Result<Query<BurnupQuery>, QueryRejection>,
) -> Result<Json<Vec<BurnupPoint>>, ApiError> {
    let Path(project_id) = path?;
    let Query(query) = query?;

    let today = Utc::now().date_naive();
    let since = match query.since {
        Some(since) if since > today => {
            return Err(validation_error("since must not be in the future"));
        }
        Some(since) => since,
        None => today
            .checked_sub_days(Days::new(u64::from(state.config.reporting.burnup_lookback_days)))
            .unwrap_or(today),
    };

    ProjectRepository::new(state.db.clone())
        .find_by_id(project_id)
        .await?
        .ok_or_else(|| not_found("project", project_id))?;

    let statuses: Vec<String> = WorkItemStatusRepository::new(state.db.clone())
        .find_all()
        .await?
        .into_iter()
        .map(|status| status.name)
        .collect();

    let rows = WorkItemHistoryRepository::new(state.db.clone())
        .find_by_project_since(project_id, since)
        .await?;

    Ok(Json(analytics::burnup(&statuses, since, today, &rows)))
}
