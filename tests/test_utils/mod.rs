//! Test utilities for database and router testing.
//!
//! Sets up in-memory SQLite databases with migrations applied and builds
//! normalized project fixtures for the reconciler.

#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use serde_json::Value;
use tower::ServiceExt;

use charts::config::AppConfig;
use charts::normalization::{Issue, Iteration, Project};
use charts::server::{AppState, create_app};

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// SQLite pools default to a single connection, so every query in a test
/// sees the same in-memory database.
pub async fn setup_test_db() -> Result<Arc<DatabaseConnection>> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(Arc::new(db))
}

/// A configuration that passes validation.
pub fn test_config() -> AppConfig {
    AppConfig {
        data_pull_job_cron: "0 * * * *".to_string(),
        ..AppConfig::default()
    }
}

pub fn test_app(db: Arc<DatabaseConnection>) -> Router {
    create_app(AppState {
        config: Arc::new(test_config()),
        db,
    })
}

/// Issue a GET and decode the JSON body (`Null` when empty).
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return (status, Value::Null);
    }
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// A day in March 2024. The 4th is a Monday.
pub fn march(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

pub fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub fn issue(external_id: &str, status: &str, effort: f64) -> Issue {
    Issue {
        external_id: external_id.to_string(),
        title: format!("Issue {external_id}"),
        status: Some(status.to_string()),
        effort,
        remaining_hours: 0.0,
        iteration_external_id: Some("it-1".to_string()),
        labels: vec![],
        created_at: created_at(),
        closed_at: None,
    }
}

/// One project with a single Monday-to-Friday sprint.
pub fn sprint_project(issues: Vec<Issue>) -> Project {
    Project {
        external_id: "PVT_roadmap".to_string(),
        title: "Roadmap".to_string(),
        statuses: vec!["Todo".into(), "In Progress".into(), "Done".into()],
        iterations: vec![Iteration {
            external_id: "it-1".to_string(),
            title: "Sprint 1".to_string(),
            start_date: march(4),
            end_date: march(8),
        }],
        issues,
    }
}

/// Assert two float series match within rounding noise.
pub fn assert_series(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-9, "{actual:?} vs {expected:?}");
    }
}
