//! Flattening of raw project boards into the domain model.
//!
//! The normalizer never fails: absent field values become "no value",
//! shapes it does not recognise are logged and treated the same way, and
//! items that are not issues are dropped.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::connectors::graphql::{
    ItemContent, ItemFieldValue, ProjectField, RawItem, RawIteration, RawProject,
};

/// A project as observed in one fetch. Rebuilt from scratch every time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub external_id: String,
    pub title: String,
    /// Status options in board order
    pub statuses: Vec<String>,
    pub iterations: Vec<Iteration>,
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Iteration {
    pub external_id: String,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub external_id: String,
    pub title: String,
    pub status: Option<String>,
    pub effort: f64,
    pub remaining_hours: f64,
    pub iteration_external_id: Option<String>,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

pub fn normalize(raw: RawProject) -> Project {
    let statuses = status_vocabulary(raw.status.as_ref());
    let iterations = iterations(raw.iteration.as_ref());

    let total = raw.items.len();
    let issues: Vec<Issue> = raw.items.into_iter().filter_map(issue_from_item).collect();
    if issues.len() != total {
        debug!(
            project = %raw.id,
            skipped = total - issues.len(),
            "skipped items that are not issues"
        );
    }

    Project {
        external_id: raw.id,
        title: raw.title,
        statuses,
        iterations,
        issues,
    }
}

fn status_vocabulary(field: Option<&ProjectField>) -> Vec<String> {
    match field {
        Some(ProjectField::SingleSelect { options }) => {
            options.iter().map(|o| o.name.clone()).collect()
        }
        Some(other) => {
            warn!(shape = ?other, "status field is not a single select field");
            Vec::new()
        }
        None => Vec::new(),
    }
}

fn iterations(field: Option<&ProjectField>) -> Vec<Iteration> {
    match field {
        Some(ProjectField::Iteration { configuration }) => configuration
            .completed_iterations
            .iter()
            .chain(configuration.iterations.iter())
            .map(iteration_from_raw)
            .collect(),
        Some(other) => {
            warn!(shape = ?other, "iteration field is not an iteration field");
            Vec::new()
        }
        None => Vec::new(),
    }
}

fn iteration_from_raw(raw: &RawIteration) -> Iteration {
    let end_date = raw
        .start_date
        .checked_add_days(Days::new(u64::from(raw.duration)))
        .unwrap_or(raw.start_date);

    Iteration {
        external_id: raw.id.clone(),
        title: raw.title.clone(),
        start_date: raw.start_date,
        end_date,
    }
}

fn issue_from_item(item: RawItem) -> Option<Issue> {
    let issue = match item.content {
        Some(ItemContent::Issue(issue)) => issue,
        _ => return None,
    };

    let status = match item.status {
        Some(ItemFieldValue::SingleSelect { name }) => name,
        other => unexpected(&item.id, "status", other),
    };
    let iteration_external_id = match item.iteration {
        Some(ItemFieldValue::Iteration { iteration_id }) => Some(iteration_id),
        other => unexpected(&item.id, "iteration", other),
    };

    let labels = issue
        .labels
        .map(|l| l.nodes.into_iter().map(|label| label.name).collect())
        .unwrap_or_default();

    Some(Issue {
        effort: number(&item.id, "effort", item.effort),
        remaining_hours: number(&item.id, "remaining", item.remaining),
        external_id: item.id,
        title: issue.title,
        status,
        iteration_external_id,
        labels,
        created_at: issue.created_at,
        closed_at: issue.closed_at,
    })
}

fn number(item_id: &str, field: &str, value: Option<ItemFieldValue>) -> f64 {
    match value {
        Some(ItemFieldValue::Number { number }) => number.unwrap_or(0.0),
        other => unexpected::<f64>(item_id, field, other).unwrap_or(0.0),
    }
}

/// Shared branch for absent values and shapes that do not fit the field.
fn unexpected<T>(item_id: &str, field: &str, value: Option<ItemFieldValue>) -> Option<T> {
    if let Some(value) = value {
        warn!(
            item = item_id,
            field,
            shape = value.type_name(),
            "ignoring field value of unexpected shape"
        );
    }
    None
}
