//! Iteration burndown.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use super::{days_between, effort, is_business_day};
use crate::models::work_item_history;

/// Remaining effort and the ideal line for one business day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BurndownPoint {
    pub iteration_day: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub remaining: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub ideal: Decimal,
}

/// Burndown of an iteration running `start..=end` over its snapshot `rows`.
///
/// The starting effort is the total effort on the first day the iteration
/// was observed. `remaining` counts rows whose status is not `done_status`
/// (no status counts as not done); business days without rows report zero.
/// The ideal line falls linearly from the starting effort to zero on the
/// last business day.
pub fn burndown(
    start: NaiveDate,
    end: NaiveDate,
    rows: &[work_item_history::Model],
    done_status: &str,
) -> Vec<BurndownPoint> {
    let business_days: Vec<NaiveDate> = days_between(start, end)
        .filter(|day| is_business_day(*day))
        .collect();
    if business_days.is_empty() {
        return Vec::new();
    }

    let starting_effort = rows
        .iter()
        .map(|row| row.change_date)
        .min()
        .map(|first| {
            rows.iter()
                .filter(|row| row.change_date == first)
                .map(|row| effort(row.effort))
                .sum::<Decimal>()
        })
        .unwrap_or_default();

    let mut remaining_by_day: HashMap<NaiveDate, Decimal> = HashMap::new();
    for row in rows {
        if row.status.as_deref() == Some(done_status) {
            continue;
        }
        *remaining_by_day.entry(row.change_date).or_default() += effort(row.effort);
    }

    let total = Decimal::from(business_days.len());
    business_days
        .into_iter()
        .enumerate()
        .map(|(index, day)| {
            let rank = Decimal::from(index + 1);
            BurndownPoint {
                iteration_day: day,
                remaining: remaining_by_day.get(&day).copied().unwrap_or_default(),
                ideal: starting_effort * (total - rank) / total,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        // March 2024: the 4th is a Monday.
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn row(gh_id: &str, day: u32, status: Option<&str>, effort: f64) -> work_item_history::Model {
        work_item_history::Model {
            id: 0,
            change_date: date(day),
            gh_id: gh_id.to_string(),
            project_id: 1,
            iteration_id: Some(1),
            name: gh_id.to_string(),
            status: status.map(str::to_string),
            effort,
            remaining_hours: 0.0,
            labels: None,
        }
    }

    #[test]
    fn ideal_line_runs_from_start_to_zero() {
        let rows = vec![row("a", 4, Some("Todo"), 6.0), row("b", 4, None, 4.0)];
        let points = burndown(date(4), date(8), &rows, "Done");

        assert_eq!(points.len(), 5);
        assert_eq!(points[0].ideal, Decimal::from(8));
        assert_eq!(points[4].ideal, Decimal::ZERO);
    }

    #[test]
    fn sprint_closing_on_day_two() {
        let rows = vec![
            row("a", 4, Some("In Progress"), 5.0),
            row("b", 4, Some("Todo"), 3.0),
            row("a", 5, Some("Done"), 5.0),
            row("b", 5, Some("Done"), 3.0),
        ];
        let points = burndown(date(4), date(8), &rows, "Done");

        let remaining: Vec<Decimal> = points.iter().map(|p| p.remaining).collect();
        assert_eq!(
            remaining,
            vec![Decimal::from(8), Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO]
        );

        let ideal: Vec<Decimal> = points.iter().map(|p| p.ideal).collect();
        assert_eq!(
            ideal,
            vec![
                Decimal::new(64, 1),
                Decimal::new(48, 1),
                Decimal::new(32, 1),
                Decimal::new(16, 1),
                Decimal::ZERO,
            ]
        );
    }

    #[test]
    fn days_without_rows_are_zero_filled() {
        let rows = vec![row("a", 4, Some("Todo"), 2.0), row("a", 6, Some("Todo"), 2.0)];
        let points = burndown(date(4), date(8), &rows, "Done");

        assert_eq!(points[1].iteration_day, date(5));
        assert_eq!(points[1].remaining, Decimal::ZERO);
        assert_eq!(points[2].remaining, Decimal::from(2));
    }

    #[test]
    fn weekends_are_excluded() {
        // Thu 7th .. Tue 12th: Thu, Fri, Mon, Tue
        let points = burndown(date(7), date(12), &[], "Done");
        let days: Vec<NaiveDate> = points.iter().map(|p| p.iteration_day).collect();
        assert_eq!(days, vec![date(7), date(8), date(11), date(12)]);
        assert!(points.iter().all(|p| p.ideal == Decimal::ZERO));
    }

    #[test]
    fn weekend_only_iteration_is_empty() {
        assert!(burndown(date(9), date(10), &[], "Done").is_empty());
    }

    #[test]
    fn serializes_as_numbers() {
        let point = BurndownPoint {
            iteration_day: date(4),
            remaining: Decimal::new(15, 1),
            ideal: Decimal::ZERO,
        };
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"iterationDay": "2024-03-04", "remaining": 1.5, "ideal": 0.0})
        );
    }
}
