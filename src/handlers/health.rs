//! # Health Handler

use axum::{extract::State, http::StatusCode, response::Json};

use crate::db;
use crate::models::{HealthDependency, HealthResult};
use crate::server::AppState;

/// Report whether the service and its database are reachable
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "All dependencies healthy", body = HealthResult),
        (status = 503, description = "A dependency is unhealthy", body = HealthResult)
    ),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResult>) {
    let database = match db::health_check(&state.db).await {
        Ok(()) => HealthDependency {
            name: "database".to_string(),
            healthy: true,
            error: None,
        },
        Err(err) => {
            tracing::warn!(error = %err, "database health check failed");
            HealthDependency {
                name: "database".to_string(),
                healthy: false,
                error: Some(err.to_string()),
            }
        }
    };

    let result = HealthResult {
        healthy: database.healthy,
        dependencies: vec![database],
    };
    let status = if result.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(result))
}
