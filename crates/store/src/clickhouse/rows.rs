//! Row types for the ClickHouse tables.
//!
//! Timestamps are DateTime64(3) as milliseconds since epoch. Field order
//! matches the DDL column order.

use ::clickhouse::Row;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracking_core::{
    ConfigurationSnapshot, EventDetails, InteractionEvent, PerformanceMetric, SelectionEvent,
    Session, SessionStatus, TriggerEvent, Viewport,
};
use uuid::Uuid;

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_json(s: &str) -> Value {
    serde_json::from_str(s).unwrap_or(Value::Null)
}

/// Row for the versioned `sessions` table.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: String,
    pub session_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub utm_source: Option<String>,
    pub country: Option<String>,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub last_activity: i64,
    pub status: String,
    pub total_price: Option<i64>,
    pub configuration_data: String,
    pub event_count: u64,
    pub version: u64,
}

impl SessionRow {
    pub fn from_session(session: &Session, version: u64) -> Self {
        Self {
            id: session.id.to_string(),
            session_id: session.session_id.clone(),
            ip_address: session.ip_address.clone(),
            user_agent: session.user_agent.clone(),
            referrer: session.referrer.clone(),
            utm_source: session.utm_source.clone(),
            country: session.country.clone(),
            start_time: session.start_time.timestamp_millis(),
            end_time: session.end_time.map(|t| t.timestamp_millis()),
            last_activity: session.last_activity.timestamp_millis(),
            status: session.status.as_str().to_string(),
            total_price: session.total_price,
            configuration_data: session.configuration_data.to_string(),
            event_count: session.event_count,
            version,
        }
    }

    pub fn into_session(self) -> Session {
        Session {
            id: parse_uuid(&self.id),
            session_id: self.session_id,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            referrer: self.referrer,
            utm_source: self.utm_source,
            country: self.country,
            start_time: from_millis(self.start_time),
            end_time: self.end_time.map(from_millis),
            last_activity: from_millis(self.last_activity),
            status: SessionStatus::parse(&self.status),
            total_price: self.total_price,
            configuration_data: parse_json(&self.configuration_data),
            event_count: self.event_count,
        }
    }
}

/// Session row joined with per-session log aggregates.
#[derive(Debug, Clone, Row, Deserialize)]
pub struct RollupRow {
    pub id: String,
    pub session_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub utm_source: Option<String>,
    pub country: Option<String>,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub last_activity: i64,
    pub status: String,
    pub total_price: Option<i64>,
    pub configuration_data: String,
    pub event_count: u64,
    pub version: u64,
    pub interaction_count: u64,
    pub page_visits: u64,
    pub form_submissions: u64,
    pub selection_count: u64,
    pub snapshot_count: u64,
    pub max_completion: u8,
}

impl RollupRow {
    pub fn into_rollup(self) -> crate::store::SessionRollup {
        let session = SessionRow {
            id: self.id,
            session_id: self.session_id,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            referrer: self.referrer,
            utm_source: self.utm_source,
            country: self.country,
            start_time: self.start_time,
            end_time: self.end_time,
            last_activity: self.last_activity,
            status: self.status,
            total_price: self.total_price,
            configuration_data: self.configuration_data,
            event_count: self.event_count,
            version: self.version,
        }
        .into_session();

        crate::store::SessionRollup {
            session,
            interaction_count: self.interaction_count,
            page_visits: self.page_visits,
            form_submissions: self.form_submissions,
            selection_count: self.selection_count,
            snapshot_count: self.snapshot_count,
            max_completion: self.max_completion,
        }
    }
}

/// Row for the `interactions` log.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct InteractionRow {
    pub id: String,
    pub session_id: String,
    pub event_type: String,
    pub category: String,
    pub element_id: Option<String>,
    pub selection_value: Option<String>,
    pub previous_value: Option<String>,
    pub time_spent: Option<i64>,
    pub device_type: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub timestamp: i64,
    pub received_at: i64,
    pub additional_data: String,
}

impl From<&InteractionEvent> for InteractionRow {
    fn from(event: &InteractionEvent) -> Self {
        Self {
            id: event.id.to_string(),
            session_id: event.session_id.clone(),
            event_type: event.event_type.clone(),
            category: event.category.clone(),
            element_id: event.element_id.clone(),
            selection_value: event.selection_value.clone(),
            previous_value: event.previous_value.clone(),
            time_spent: event.time_spent,
            device_type: event.device_type.clone(),
            viewport_width: event.viewport.width,
            viewport_height: event.viewport.height,
            timestamp: event.timestamp.timestamp_millis(),
            received_at: event.received_at.timestamp_millis(),
            additional_data: event.additional_data.to_value().to_string(),
        }
    }
}

impl InteractionRow {
    pub fn into_event(self) -> InteractionEvent {
        let raw = parse_json(&self.additional_data);
        // Rows written by older collectors may not match the current variant schema.
        let additional_data = EventDetails::parse(&self.event_type, raw.clone())
            .unwrap_or_else(|_| match raw {
                Value::Object(map) => EventDetails::Other(map),
                _ => EventDetails::Other(Map::new()),
            });

        InteractionEvent {
            id: parse_uuid(&self.id),
            session_id: self.session_id,
            event_type: self.event_type,
            category: self.category,
            element_id: self.element_id,
            selection_value: self.selection_value,
            previous_value: self.previous_value,
            time_spent: self.time_spent,
            device_type: self.device_type,
            viewport: Viewport {
                width: self.viewport_width,
                height: self.viewport_height,
            },
            timestamp: from_millis(self.timestamp),
            received_at: from_millis(self.received_at),
            additional_data,
        }
    }
}

/// Row for the `selections` log.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct SelectionRow {
    pub id: String,
    pub session_id: String,
    pub category: String,
    pub selection: String,
    pub previous_selection: Option<String>,
    pub total_price: i64,
    pub price_change: i64,
    pub timestamp: i64,
    pub time_spent_ms: i64,
}

impl From<&SelectionEvent> for SelectionRow {
    fn from(event: &SelectionEvent) -> Self {
        Self {
            id: event.id.to_string(),
            session_id: event.session_id.clone(),
            category: event.category.clone(),
            selection: event.selection.clone(),
            previous_selection: event.previous_selection.clone(),
            total_price: event.total_price,
            price_change: event.price_change,
            timestamp: event.timestamp.timestamp_millis(),
            time_spent_ms: event.time_spent_ms,
        }
    }
}

/// Row for the `configuration_snapshots` log.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub id: String,
    pub session_id: String,
    pub configuration_data: String,
    pub total_price: i64,
    pub completion_percentage: u8,
    pub trigger_event: String,
    pub timestamp: i64,
}

impl From<&ConfigurationSnapshot> for SnapshotRow {
    fn from(snapshot: &ConfigurationSnapshot) -> Self {
        Self {
            id: snapshot.id.to_string(),
            session_id: snapshot.session_id.clone(),
            configuration_data: snapshot.configuration_data.to_string(),
            total_price: snapshot.total_price,
            completion_percentage: snapshot.completion_percentage,
            trigger_event: snapshot.trigger_event.as_str().to_string(),
            timestamp: snapshot.timestamp.timestamp_millis(),
        }
    }
}

impl SnapshotRow {
    pub fn into_snapshot(self) -> ConfigurationSnapshot {
        ConfigurationSnapshot {
            id: parse_uuid(&self.id),
            session_id: self.session_id,
            configuration_data: parse_json(&self.configuration_data),
            total_price: self.total_price,
            completion_percentage: self.completion_percentage,
            trigger_event: TriggerEvent::parse(&self.trigger_event)
                .unwrap_or(TriggerEvent::AutoSave),
            timestamp: from_millis(self.timestamp),
        }
    }
}

/// Row for the `performance_metrics` log.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct MetricRow {
    pub id: String,
    pub session_id: Option<String>,
    pub metric_name: String,
    pub value: f64,
    pub endpoint: Option<String>,
    pub timestamp: i64,
    pub additional_data: String,
}

impl From<&PerformanceMetric> for MetricRow {
    fn from(metric: &PerformanceMetric) -> Self {
        Self {
            id: metric.id.to_string(),
            session_id: metric.session_id.clone(),
            metric_name: metric.metric_name.clone(),
            value: metric.value,
            endpoint: metric.endpoint.clone(),
            timestamp: metric.timestamp.timestamp_millis(),
            additional_data: Value::Object(metric.additional_data.clone()).to_string(),
        }
    }
}
