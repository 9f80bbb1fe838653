//! Project burnup: daily effort per status.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use super::{days_between, effort};
use crate::models::work_item_history;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BurnupPoint {
    pub status: String,
    pub project_day: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub qty: Decimal,
}

/// Effort per `(status, day)` for every status in `statuses` and every day in `since..=until`.
///
/// Output is ordered by status name ascending, then by day. Values are that
/// day's snapshot, not running totals; missing pairs report zero and rows
/// whose status is outside the vocabulary are ignored.
pub fn burnup(
    statuses: &[String],
    since: NaiveDate,
    until: NaiveDate,
    rows: &[work_item_history::Model],
) -> Vec<BurnupPoint> {
    let mut totals: HashMap<(&str, NaiveDate), Decimal> = HashMap::new();
    for row in rows {
        if let Some(status) = row.status.as_deref() {
            *totals.entry((status, row.change_date)).or_default() += effort(row.effort);
        }
    }

    let mut ordered: Vec<&String> = statuses.iter().collect();
    ordered.sort();
    ordered.dedup();

    ordered
        .into_iter()
        .flat_map(|status| {
            let totals = &totals;
            days_between(since, until).map(move |day| BurnupPoint {
                status: status.clone(),
                project_day: day,
                qty: totals
                    .get(&(status.as_str(), day))
                    .copied()
                    .unwrap_or_default(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn row(gh_id: &str, day: u32, status: &str, effort: f64) -> work_item_history::Model {
        work_item_history::Model {
            id: 0,
            change_date: date(day),
            gh_id: gh_id.to_string(),
            project_id: 1,
            iteration_id: None,
            name: gh_id.to_string(),
            status: Some(status.to_string()),
            effort,
            remaining_hours: 0.0,
            labels: None,
        }
    }

    fn vocabulary() -> Vec<String> {
        vec!["Todo".to_string(), "Done".to_string()]
    }

    #[test]
    fn every_status_day_pair_is_reported() {
        let rows = vec![row("a", 2, "Todo", 3.0), row("b", 2, "Todo", 2.0), row("a", 3, "Done", 3.0)];
        let points = burnup(&vocabulary(), date(1), date(3), &rows);

        assert_eq!(points.len(), 6);
        let summary: Vec<(&str, u32, Decimal)> = points
            .iter()
            .map(|p| (p.status.as_str(), chrono::Datelike::day(&p.project_day), p.qty))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Done", 1, Decimal::ZERO),
                ("Done", 2, Decimal::ZERO),
                ("Done", 3, Decimal::from(3)),
                ("Todo", 1, Decimal::ZERO),
                ("Todo", 2, Decimal::from(5)),
                ("Todo", 3, Decimal::ZERO),
            ]
        );
    }

    #[test]
    fn statuses_are_sorted_by_name() {
        let statuses = vec![
            "Todo".to_string(),
            "In Progress".to_string(),
            "Done".to_string(),
            "Todo".to_string(),
        ];
        let points = burnup(&statuses, date(1), date(1), &[]);

        let order: Vec<&str> = points.iter().map(|p| p.status.as_str()).collect();
        assert_eq!(order, vec!["Done", "In Progress", "Todo"]);
    }

    #[test]
    fn unknown_statuses_are_ignored() {
        let rows = vec![row("a", 1, "Archived", 8.0)];
        let points = burnup(&vocabulary(), date(1), date(1), &rows);
        assert!(points.iter().all(|p| p.qty == Decimal::ZERO));
    }

    #[test]
    fn inverted_window_is_empty() {
        assert!(burnup(&vocabulary(), date(5), date(4), &[]).is_empty());
    }
}
