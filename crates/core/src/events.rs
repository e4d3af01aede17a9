//! Event log row types.
//!
//! All four logs are append-only. Rows are never updated once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{Error, Result};
use crate::limits::{MAX_ADDITIONAL_DATA_BYTES, MAX_CONFIGURATION_BYTES};

/// Known interaction event types.
pub mod event_types {
    pub const PAGE_VISIT: &str = "page_visit";
    pub const CLICK: &str = "click";
    pub const FIELD_CHANGE: &str = "field_change";
    pub const FORM_SUBMIT: &str = "form_submit";
    pub const PAGE_EXIT: &str = "page_exit";
}

/// Browser viewport dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Viewport {
    #[validate(range(max = 20000))]
    pub width: u32,
    #[validate(range(max = 20000))]
    pub height: u32,
}

/// Payload of a `page_visit` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PageVisitDetails {
    #[validate(length(min = 1, max = 2000))]
    pub path: String,
    #[validate(length(max = 500))]
    pub title: Option<String>,
    /// Path of the page the visitor came from within the site.
    #[validate(length(max = 2000))]
    pub previous_path: Option<String>,
    /// Time spent on the previous page (ms).
    #[validate(range(min = 0))]
    pub previous_page_time_ms: Option<i64>,
}

/// Payload of a `click` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClickDetails {
    #[validate(length(max = 64))]
    pub tag: Option<String>,
    /// Element text content (truncated)
    #[validate(length(max = 200))]
    pub text: Option<String>,
    /// Raw clicks folded into this event by the debouncer.
    #[serde(default = "default_click_count")]
    #[validate(range(min = 1, max = 1000))]
    pub click_count: u32,
}

fn default_click_count() -> u32 {
    1
}

/// Payload of a `field_change` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FieldChangeDetails {
    #[validate(length(max = 128))]
    pub field_name: Option<String>,
    #[validate(length(max = 128))]
    pub form_id: Option<String>,
    #[validate(length(max = 32))]
    pub input_type: Option<String>,
}

/// Payload of a `form_submit` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmitDetails {
    #[validate(length(min = 1, max = 128))]
    pub form_id: String,
    #[validate(range(max = 500))]
    pub field_count: Option<u32>,
}

/// Payload of a `page_exit` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PageExitDetails {
    #[validate(range(min = 0))]
    pub time_on_page_ms: i64,
    /// Scroll depth as percentage (0-100)
    #[validate(range(min = 0.0, max = 100.0))]
    pub scroll_depth: Option<f64>,
}

/// Event-type-specific payload of an interaction.
///
/// Keyed by the interaction's `event_type`. Unknown types keep their raw map.
#[derive(Debug, Clone, PartialEq)]
pub enum EventDetails {
    PageVisit(PageVisitDetails),
    Click(ClickDetails),
    FieldChange(FieldChangeDetails),
    FormSubmit(FormSubmitDetails),
    PageExit(PageExitDetails),
    Other(Map<String, Value>),
}

impl EventDetails {
    /// Decode `raw` according to `event_type`.
    pub fn parse(event_type: &str, raw: Value) -> Result<Self> {
        let raw = match raw {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        let details = match event_type {
            event_types::PAGE_VISIT => Self::PageVisit(decode(event_type, raw)?),
            event_types::CLICK => Self::Click(decode(event_type, raw)?),
            event_types::FIELD_CHANGE => Self::FieldChange(decode(event_type, raw)?),
            event_types::FORM_SUBMIT => Self::FormSubmit(decode(event_type, raw)?),
            event_types::PAGE_EXIT => Self::PageExit(decode(event_type, raw)?),
            _ => match raw {
                Value::Object(map) => Self::Other(map),
                _ => {
                    return Err(Error::validation(format!(
                        "{}: additionalData must be an object",
                        event_type
                    )))
                }
            },
        };

        Ok(details)
    }

    /// Run the variant's field validations.
    pub fn validate(&self) -> Result<()> {
        let res = match self {
            Self::PageVisit(d) => d.validate(),
            Self::Click(d) => d.validate(),
            Self::FieldChange(d) => d.validate(),
            Self::FormSubmit(d) => d.validate(),
            Self::PageExit(d) => d.validate(),
            Self::Other(map) => {
                let size = serde_json::to_vec(map).map(|v| v.len()).unwrap_or(0);
                if size > MAX_ADDITIONAL_DATA_BYTES {
                    return Err(Error::validation(format!(
                        "additionalData {}KB exceeds {}KB limit",
                        size / 1024,
                        MAX_ADDITIONAL_DATA_BYTES / 1024
                    )));
                }
                Ok(())
            }
        };
        res.map_err(|e| Error::validation(format!("additionalData: {}", e)))
    }

    /// Number of raw clicks this event represents.
    pub fn click_count(&self) -> u32 {
        match self {
            Self::Click(d) => d.click_count,
            _ => 0,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for EventDetails {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::PageVisit(d) => d.serialize(serializer),
            Self::Click(d) => d.serialize(serializer),
            Self::FieldChange(d) => d.serialize(serializer),
            Self::FormSubmit(d) => d.serialize(serializer),
            Self::PageExit(d) => d.serialize(serializer),
            Self::Other(map) => map.serialize(serializer),
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(event_type: &str, raw: Value) -> Result<T> {
    serde_json::from_value(raw)
        .map_err(|e| Error::validation(format!("{}: invalid additionalData: {}", event_type, e)))
}

/// One behavioral interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEvent {
    pub id: Uuid,
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
    #[validate(length(min = 1, max = 64))]
    pub event_type: String,
    #[validate(length(min = 1, max = 64))]
    pub category: String,
    #[validate(length(max = 256))]
    pub element_id: Option<String>,
    #[validate(length(max = 1000))]
    pub selection_value: Option<String>,
    #[validate(length(max = 1000))]
    pub previous_value: Option<String>,
    /// Milliseconds spent before this interaction.
    #[validate(range(min = 0))]
    pub time_spent: Option<i64>,
    #[validate(length(max = 32))]
    pub device_type: String,
    #[validate(nested)]
    pub viewport: Viewport,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub received_at: DateTime<Utc>,
    pub additional_data: EventDetails,
}

impl InteractionEvent {
    pub fn is_form_submit(&self) -> bool {
        matches!(self.additional_data, EventDetails::FormSubmit(_))
    }

    pub fn is_page_visit(&self) -> bool {
        matches!(self.additional_data, EventDetails::PageVisit(_))
    }
}

/// One configuration field change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SelectionEvent {
    pub id: Uuid,
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
    #[validate(length(min = 1, max = 64))]
    pub category: String,
    #[validate(length(min = 1, max = 1000))]
    pub selection: String,
    #[validate(length(max = 1000))]
    pub previous_selection: Option<String>,
    /// Price after this change, in cents.
    #[validate(range(min = 0i64, max = 10_000_000_000i64))]
    pub total_price: i64,
    /// Signed price delta, in cents.
    pub price_change: i64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[validate(range(min = 0))]
    pub time_spent_ms: i64,
}

/// Why a configuration snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    AutoSave,
    PageExit,
    ManualSave,
    StepChange,
}

impl TriggerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoSave => "auto_save",
            Self::PageExit => "page_exit",
            Self::ManualSave => "manual_save",
            Self::StepChange => "step_change",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "auto_save" => Some(Self::AutoSave),
            "page_exit" => Some(Self::PageExit),
            "manual_save" => Some(Self::ManualSave),
            "step_change" => Some(Self::StepChange),
            _ => None,
        }
    }
}

fn validate_configuration_size(data: &Value) -> std::result::Result<(), ValidationError> {
    if data.is_null() {
        return Ok(());
    }

    let size = serde_json::to_vec(data).map(|v| v.len()).unwrap_or(0);

    if size > MAX_CONFIGURATION_BYTES {
        let mut err = ValidationError::new("configuration_too_large");
        err.message = Some(
            format!(
                "configuration {}KB exceeds {}KB limit",
                size / 1024,
                MAX_CONFIGURATION_BYTES / 1024
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// A point-in-time copy of the visitor's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationSnapshot {
    pub id: Uuid,
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
    #[validate(custom(function = "validate_configuration_size"))]
    pub configuration_data: Value,
    #[validate(range(min = 0i64, max = 10_000_000_000i64))]
    pub total_price: i64,
    /// Always derived from `configuration_data` on the server.
    #[validate(range(max = 100))]
    pub completion_percentage: u8,
    pub trigger_event: TriggerEvent,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Client or server instrumentation sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetric {
    pub id: Uuid,
    #[validate(length(min = 1, max = 128))]
    pub session_id: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub metric_name: String,
    pub value: f64,
    #[validate(length(max = 256))]
    pub endpoint: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub additional_data: Map<String, Value>,
}

impl PerformanceMetric {
    /// A server-side sample not tied to any session.
    pub fn server(metric_name: impl Into<String>, value: f64, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: None,
            metric_name: metric_name.into(),
            value,
            endpoint: None,
            timestamp: at,
            additional_data: Map::new(),
        }
    }
}
