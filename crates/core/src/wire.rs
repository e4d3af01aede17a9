//! Client-facing wire formats.
//!
//! This module handles:
//! - Parsing collector submissions (camelCase, Unix ms timestamps)
//! - Supporting 3 interaction payload formats (single, array, object with events)
//! - Converting submissions into log rows, stamping server-side fields

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::completion::CompletionSchema;
use crate::error::{Error, Result, ValidationErrorCode};
use crate::events::{
    ConfigurationSnapshot, EventDetails, InteractionEvent, PerformanceMetric, SelectionEvent,
    TriggerEvent, Viewport,
};
use crate::limits::MAX_BATCH_EVENTS;
use crate::schema;
use crate::session::SessionMetadata;

/// Request attributes the client does not send itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub country: Option<String>,
}

/// Device information reported by the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default = "default_device_type")]
    pub device_type: String,
    #[serde(default)]
    pub viewport: Viewport,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            device_type: default_device_type(),
            viewport: Viewport::default(),
        }
    }
}

fn default_device_type() -> String {
    "unknown".into()
}

/// An interaction as sent by the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionSubmission {
    pub session_id: String,
    pub event_type: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<i64>,
    #[serde(default)]
    pub device_info: DeviceInfo,
    /// Unix timestamp in milliseconds; defaults to receive time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Full page URL, used for `utm_source` extraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_source: Option<String>,
    #[serde(default)]
    pub additional_data: Value,
}

impl InteractionSubmission {
    /// Session attributes this submission would seed a new session with.
    pub fn session_metadata(&self, client: &ClientMetadata) -> SessionMetadata {
        let utm_source = self
            .utm_source
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| self.url.as_deref().and_then(utm_source_from_url));

        SessionMetadata {
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
            referrer: self.referrer.clone().filter(|r| !r.is_empty()),
            utm_source,
            country: client.country.clone(),
        }
    }

    /// Convert into a validated log row.
    pub fn into_event(self, received_at: DateTime<Utc>) -> Result<InteractionEvent> {
        let timestamp = schema::resolve_timestamp(self.timestamp, received_at)?;
        let additional_data = EventDetails::parse(&self.event_type, self.additional_data)?;

        let event = InteractionEvent {
            id: Uuid::new_v4(),
            session_id: self.session_id,
            event_type: self.event_type,
            category: self.category,
            element_id: self.element_id,
            selection_value: self.selection_value,
            previous_value: self.previous_value,
            time_spent: self.time_spent,
            device_type: self.device_info.device_type,
            viewport: self.device_info.viewport,
            timestamp,
            received_at,
            additional_data,
        };
        schema::validate_interaction(&event)?;
        Ok(event)
    }
}

/// Parsed interaction request body (supports 3 formats).
#[derive(Debug, Clone)]
pub struct InteractionBatch {
    pub events: Vec<InteractionSubmission>,
}

impl InteractionBatch {
    /// Parse an interaction payload from JSON bytes.
    /// Supports:
    /// 1. Array: `[interaction, interaction, ...]`
    /// 2. Object with events: `{ "events": [...] }`
    /// 3. Single interaction: `{ "sessionId": "...", "eventType": "...", ... }`
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        schema::validate_batch_size(bytes)?;

        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::validation(format!("invalid JSON: {}", e)))?;

        let events: Vec<InteractionSubmission> = match &value {
            Value::Array(_) => serde_json::from_value(value)
                .map_err(|e| Error::validation(format!("invalid interaction array: {}", e)))?,

            Value::Object(obj) if obj.contains_key("events") => {
                #[derive(Deserialize)]
                struct Wrapper {
                    events: Vec<InteractionSubmission>,
                }
                let wrapper: Wrapper = serde_json::from_value(value)
                    .map_err(|e| Error::validation(format!("invalid batch object: {}", e)))?;
                wrapper.events
            }

            Value::Object(obj) if obj.contains_key("sessionId") && obj.contains_key("eventType") => {
                let event: InteractionSubmission = serde_json::from_value(value)
                    .map_err(|e| Error::validation(format!("invalid interaction: {}", e)))?;
                vec![event]
            }

            Value::Object(_) => {
                return Err(Error::validation(
                    "object must have 'events' array or be a single interaction with 'sessionId' and 'eventType'",
                ))
            }

            _ => {
                return Err(Error::validation(
                    "request body must be an interaction, an array, or an object with 'events'",
                ))
            }
        };

        if events.is_empty() {
            return Err(Error::validation("batch contains no interactions"));
        }
        if events.len() > MAX_BATCH_EVENTS {
            return Err(Error::validation_code(
                ValidationErrorCode::BatchTooLarge,
                format!("{} interactions exceeds limit of {}", events.len(), MAX_BATCH_EVENTS),
            ));
        }

        Ok(Self { events })
    }
}

/// A configuration field change as sent by the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSubmission {
    pub session_id: String,
    pub category: String,
    pub selection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_selection: Option<String>,
    pub total_price: i64,
    #[serde(default)]
    pub price_change: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub time_spent_ms: i64,
}

impl SelectionSubmission {
    pub fn into_event(self, received_at: DateTime<Utc>) -> Result<SelectionEvent> {
        let event = SelectionEvent {
            id: Uuid::new_v4(),
            session_id: self.session_id,
            category: self.category,
            selection: self.selection,
            previous_selection: self.previous_selection,
            total_price: self.total_price,
            price_change: self.price_change,
            timestamp: schema::resolve_timestamp(self.timestamp, received_at)?,
            time_spent_ms: self.time_spent_ms,
        };
        schema::validate_selection(&event)?;
        Ok(event)
    }
}

/// A configuration snapshot as sent by the collector.
///
/// Any client-reported completion percentage is ignored and recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSubmission {
    pub session_id: String,
    pub configuration_data: Value,
    pub total_price: i64,
    #[serde(default = "default_trigger")]
    pub trigger_event: TriggerEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

fn default_trigger() -> TriggerEvent {
    TriggerEvent::AutoSave
}

impl SnapshotSubmission {
    pub fn into_snapshot(
        self,
        completion: &CompletionSchema,
        received_at: DateTime<Utc>,
    ) -> Result<ConfigurationSnapshot> {
        let snapshot = ConfigurationSnapshot {
            id: Uuid::new_v4(),
            completion_percentage: completion.completion_percentage(&self.configuration_data),
            session_id: self.session_id,
            configuration_data: self.configuration_data,
            total_price: self.total_price,
            trigger_event: self.trigger_event,
            timestamp: schema::resolve_timestamp(self.timestamp, received_at)?,
        };
        schema::validate_snapshot(&snapshot)?;
        Ok(snapshot)
    }
}

/// A client instrumentation sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSubmission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub metric_name: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub additional_data: Map<String, Value>,
}

impl MetricSubmission {
    pub fn into_metric(self, received_at: DateTime<Utc>) -> Result<PerformanceMetric> {
        let metric = PerformanceMetric {
            id: Uuid::new_v4(),
            session_id: self.session_id,
            metric_name: self.metric_name,
            value: self.value,
            endpoint: self.endpoint,
            timestamp: schema::resolve_timestamp(self.timestamp, received_at)?,
            additional_data: self.additional_data,
        };
        schema::validate_metric(&metric)?;
        Ok(metric)
    }
}

/// Explicit end-of-visit signal, usually sent as a beacon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl FinalizeRequest {
    /// Parse a beacon body. Beacons carry no reliable content type.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        schema::validate_batch_size(bytes)?;
        let request: Self = serde_json::from_slice(bytes)
            .map_err(|e| Error::validation(format!("invalid finalize payload: {}", e)))?;
        schema::validate_session_id(&request.session_id)?;
        Ok(request)
    }
}

/// External conversion signal (payment or contact completion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Extract `utm_source` from a page URL's query string.
pub fn utm_source_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let source = parsed
        .query_pairs()
        .find(|(key, _)| key == "utm_source")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty());
    source
}
