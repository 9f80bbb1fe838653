//! # Project API Handlers
//!
//! Listings of tracked projects and their iterations.

use axum::{
    extract::{Path, State, rejection::PathRejection},
    response::Json,
};

use crate::error::{ApiError, not_found};
use crate::models::{IterationInfo, ProjectInfo};
use crate::repositories::{IterationRepository, ProjectRepository};
use crate::server::AppState;

/// List every tracked project
#[utoipa::path(
    get,
    path = "/projects",
    responses(
        (status = 200, description = "Tracked projects", body = [ProjectInfo], example = json!([
            {"id": 1, "title": "Roadmap"}
        ])),
        (status = 500, description = "Unknown error", body = ApiError)
    ),
    tag = "projects"
)]
pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<ProjectInfo>>, ApiError> {
    let projects = ProjectRepository::new(state.db.clone()).find_all().await?;
    Ok(Json(projects.into_iter().map(ProjectInfo::from).collect()))
}

/// List the iterations of a project ordered by start date
#[utoipa::path(
    get,
    path = "/projects/{id}/iterations",
    params(("id" = i32, Path, description = "Project id")),
    responses(
        (status = 200, description = "Iterations of the project", body = [IterationInfo], example = json!([
            {"id": 3, "title": "Sprint 1", "startDate": "2024-03-04", "endDate": "2024-03-18"}
        ])),
        (status = 400, description = "Malformed project id", body = ApiError),
        (status = 404, description = "Project not found", body = ApiError),
        (status = 500, description = "Unknown error", body = ApiError)
    ),
    tag = "projects"
)]
pub async fn list_iterations(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<Vec<IterationInfo>>, ApiError> {
    let Path(project_id) = path?;

    ProjectRepository::new(state.db.clone())
        .find_by_id(project_id)
        .await?
        .ok_or_else(|| not_found("project", project_id))?;

    let iterations = IterationRepository::new(state.db.clone())
        .find_by_project(project_id)
        .await?;

    Ok(Json(iterations.into_iter().map(IterationInfo::from).collect()))
}
