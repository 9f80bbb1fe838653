//! Cron evaluation for the data pull job.
//!
//! Expressions are standard five-field cron (`min hour dom month dow`);
//! six- and seven-field forms with seconds or years are rejected.
//! Instants are truncated to the minute before matching, so every check made
//! within one minute agrees.

use chrono::{DateTime, Timelike, Utc};
use croner::Cron;
use croner::parser::{CronParser, Seconds};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("schedule expression is empty")]
    Empty,
    #[error("invalid schedule expression '{expression}': {source}")]
    Invalid {
        expression: String,
        #[source]
        source: croner::errors::CronError,
    },
}

/// A parsed, validated cron expression.
#[derive(Debug, Clone)]
pub struct Schedule {
    expression: String,
    cron: Cron,
}

impl Schedule {
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(ScheduleError::Empty);
        }

        let parser = CronParser::builder().seconds(Seconds::Disallowed).build();
        let cron = parser.parse(expression).map_err(|source| ScheduleError::Invalid {
            expression: expression.to_string(),
            source,
        })?;

        Ok(Self {
            expression: expression.to_string(),
            cron,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Whether the minute containing `instant` is a scheduled run.
    pub fn is_due(&self, instant: DateTime<Utc>) -> bool {
        let minute = truncate_to_minute(instant);
        self.cron.is_time_matching(&minute).unwrap_or(false)
    }
}

pub fn is_valid(expression: &str) -> bool {
    Schedule::parse(expression).is_ok()
}

/// Evaluate `expression` at `instant`; malformed expressions are never due.
pub fn is_due(expression: &str, instant: DateTime<Utc>) -> bool {
    Schedule::parse(expression)
        .map(|schedule| schedule.is_due(instant))
        .unwrap_or(false)
}

fn truncate_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(instant)
}
