//! Session records and the guarded lifecycle state machine.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

/// Default idle threshold after which the sweep closes an ACTIVE session.
pub const IDLE_TIMEOUT_HOURS: i64 = 24;

/// Sessions shorter than this are bounces.
pub const BOUNCE_THRESHOLD_SECS: i64 = 30;

/// Session lifecycle status.
///
/// Transitions only ever leave `Active`. `Completed` and `Abandoned` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Active,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Abandoned => "ABANDONED",
        }
    }

    /// Parse the stored representation. Unknown values are treated as active.
    pub fn parse(s: &str) -> Self {
        match s {
            "COMPLETED" => Self::Completed,
            "ABANDONED" => Self::Abandoned,
            _ => Self::Active,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request-derived attributes captured when a session is first seen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    #[validate(length(max = 64))]
    pub ip_address: Option<String>,
    #[validate(length(max = 512))]
    pub user_agent: Option<String>,
    #[validate(length(max = 2048))]
    pub referrer: Option<String>,
    #[validate(length(max = 128))]
    pub utm_source: Option<String>,
    /// ISO country code from an upstream proxy header.
    #[validate(length(max = 8))]
    pub country: Option<String>,
}

/// A visitor session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub session_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub utm_source: Option<String>,
    pub country: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_activity: DateTime<Utc>,
    pub status: SessionStatus,
    /// Latest configured price in cents.
    pub total_price: Option<i64>,
    pub configuration_data: Value,
    pub event_count: u64,
}

/// A guarded partial update. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    pub status: Option<SessionStatus>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    pub configuration_data: Option<Value>,
    pub total_price: Option<i64>,
    /// Accepted interactions to add to the session's counter.
    pub events: u64,
    /// Apply `status` and `end_time` only if the session is still idle past
    /// this threshold at this instant when the update lands.
    pub only_if_idle: Option<(DateTime<Utc>, Duration)>,
    /// Apply the configuration only if this update also sets `end_time`.
    pub exit_configuration: bool,
}

impl SessionUpdate {
    /// An interaction observed at `at`.
    pub fn activity(at: DateTime<Utc>) -> Self {
        Self {
            last_activity: Some(at),
            events: 1,
            ..Default::default()
        }
    }

    /// Close the timeline at `at` without changing status.
    pub fn finalize(at: DateTime<Utc>) -> Self {
        Self {
            end_time: Some(at),
            ..Default::default()
        }
    }

    /// Move to `status`, closing the timeline at `end_time` if still open.
    pub fn transition(status: SessionStatus, end_time: DateTime<Utc>) -> Self {
        Self {
            status: Some(status),
            end_time: Some(end_time),
            ..Default::default()
        }
    }

    /// Close a session idle past `threshold` at `now`. A no-op if activity
    /// arrived after the sweep read the session.
    pub fn close_idle(
        status: SessionStatus,
        end_time: DateTime<Utc>,
        now: DateTime<Utc>,
        threshold: Duration,
    ) -> Self {
        Self {
            only_if_idle: Some((now, threshold)),
            ..Self::transition(status, end_time)
        }
    }

    pub fn with_configuration(mut self, data: Value, total_price: Option<i64>) -> Self {
        self.configuration_data = Some(data);
        self.total_price = total_price;
        self
    }

    /// Configuration captured when the page unloads. It lands only with the
    /// finalize that closes the timeline; repeated beacons are dropped.
    pub fn with_exit_configuration(self, data: Value, total_price: Option<i64>) -> Self {
        Self {
            exit_configuration: true,
            ..self.with_configuration(data, total_price)
        }
    }

    pub fn with_activity(mut self, at: DateTime<Utc>) -> Self {
        self.last_activity = Some(at);
        self
    }

    pub fn with_events(mut self, events: u64) -> Self {
        self.events = events;
        self
    }

    /// Whether applying this could need a write even if nothing else changes.
    pub fn counts_events(&self) -> bool {
        self.events > 0
    }
}

/// What a guarded update actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub end_time_set: bool,
    pub status_changed: bool,
    pub activity_advanced: bool,
    pub configuration_replaced: bool,
}

impl UpdateOutcome {
    pub fn changed(&self) -> bool {
        self.end_time_set
            || self.status_changed
            || self.activity_advanced
            || self.configuration_replaced
    }
}

impl Session {
    /// Creates a new ACTIVE session first seen at `at`.
    pub fn new(session_id: impl Into<String>, metadata: SessionMetadata, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            ip_address: metadata.ip_address,
            user_agent: metadata.user_agent,
            referrer: metadata.referrer,
            utm_source: metadata.utm_source,
            country: metadata.country,
            start_time: at,
            end_time: None,
            last_activity: at,
            status: SessionStatus::Active,
            total_price: None,
            configuration_data: Value::Object(Default::default()),
            event_count: 0,
        }
    }

    /// Apply a guarded update in place.
    ///
    /// - `end_time` is written only while it is null, and never before `start_time`.
    /// - `status` only moves away from `Active`.
    /// - `last_activity` only moves forward.
    /// - configuration is last-write-wins, except exit configuration, which
    ///   lands only with the write that sets `end_time`.
    /// - an idle guard that no longer holds skips `status` and `end_time`.
    pub fn apply(&mut self, update: &SessionUpdate) -> UpdateOutcome {
        let mut outcome = UpdateOutcome::default();

        if let Some(at) = update.last_activity {
            if at > self.last_activity {
                self.last_activity = at;
                outcome.activity_advanced = true;
            }
        }

        self.event_count += update.events;

        let still_idle = update
            .only_if_idle
            .map_or(true, |(now, threshold)| self.is_idle(now, threshold));
        if !still_idle {
            return outcome;
        }

        if let Some(status) = update.status {
            if self.status == SessionStatus::Active && status != SessionStatus::Active {
                self.status = status;
                outcome.status_changed = true;
            }
        }

        if let Some(at) = update.end_time {
            if self.end_time.is_none() {
                self.end_time = Some(at.max(self.start_time));
                outcome.end_time_set = true;
            }
        }

        if let Some(data) = &update.configuration_data {
            if !update.exit_configuration || outcome.end_time_set {
                self.configuration_data = data.clone();
                if update.total_price.is_some() {
                    self.total_price = update.total_price;
                }
                outcome.configuration_replaced = true;
            }
        }

        outcome
    }

    /// Whether the timeline has been closed.
    pub fn is_finalized(&self) -> bool {
        self.end_time.is_some()
    }

    /// Elapsed time from start to end, or to last activity while open.
    pub fn duration(&self) -> Duration {
        self.end_time.unwrap_or(self.last_activity) - self.start_time
    }

    /// Whether this session counts as a bounce.
    pub fn is_bounce(&self) -> bool {
        self.duration() < Duration::seconds(BOUNCE_THRESHOLD_SECS)
    }

    /// Whether an ACTIVE session has been idle longer than `threshold` at `now`.
    pub fn is_idle(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.status == SessionStatus::Active && now - self.last_activity > threshold
    }
}
