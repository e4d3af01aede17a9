//! Reporting time windows.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

/// A half-open `[start, end)` window over session start times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `span` immediately preceding `now`.
    pub fn last(span: Duration, now: DateTime<Utc>) -> Self {
        Self {
            start: now - span,
            end: now,
        }
    }

    /// Parse `24h`, `7d`, `30d` style windows ending at `now`.
    pub fn parse(input: &str, now: DateTime<Utc>) -> Result<Self> {
        let input = input.trim();
        let invalid = || Error::validation(format!("invalid range '{}': expected e.g. 24h, 7d", input));

        if input.len() < 2 || !input.is_ascii() {
            return Err(invalid());
        }
        let (amount, unit) = input.split_at(input.len() - 1);
        let amount: i64 = amount.parse().map_err(|_| invalid())?;
        if !(1..=365).contains(&amount) {
            return Err(invalid());
        }

        let span = match unit {
            "h" => Duration::hours(amount),
            "d" => Duration::days(amount),
            "w" => Duration::weeks(amount),
            _ => return Err(invalid()),
        };

        Ok(Self::last(span, now))
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }
}
