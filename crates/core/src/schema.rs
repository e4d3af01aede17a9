//! Schema validation for log rows.

use chrono::{DateTime, Duration, TimeZone, Utc};
use validator::Validate;

use crate::error::{Error, Result, ValidationErrorCode};
use crate::events::{ConfigurationSnapshot, InteractionEvent, PerformanceMetric, SelectionEvent};
use crate::limits::{
    MAX_BATCH_SIZE_BYTES, MAX_EVENT_AGE_HOURS, MAX_FUTURE_SKEW_SECS, MAX_SESSION_ID_LEN,
};

/// Validates raw request size BEFORE deserialization.
///
/// Call this first to prevent allocation attacks from oversized payloads.
pub fn validate_batch_size(raw_bytes: &[u8]) -> Result<()> {
    if raw_bytes.len() > MAX_BATCH_SIZE_BYTES {
        return Err(Error::validation_code(
            ValidationErrorCode::PayloadTooLarge,
            format!(
                "payload {}KB exceeds {}KB limit",
                raw_bytes.len() / 1024,
                MAX_BATCH_SIZE_BYTES / 1024
            ),
        ));
    }
    Ok(())
}

pub fn validate_session_id(session_id: &str) -> Result<()> {
    if session_id.trim().is_empty() {
        return Err(Error::missing_field("sessionId"));
    }
    if session_id.chars().count() > MAX_SESSION_ID_LEN {
        return Err(Error::validation(format!(
            "sessionId exceeds {} chars",
            MAX_SESSION_ID_LEN
        )));
    }
    Ok(())
}

/// Turn an optional client timestamp (Unix ms) into a checked instant.
///
/// Missing timestamps default to `received_at`.
pub fn resolve_timestamp(millis: Option<i64>, received_at: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let Some(millis) = millis else {
        return Ok(received_at);
    };

    let timestamp = Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
        Error::validation_code(ValidationErrorCode::InvalidTimestamp, "invalid timestamp")
    })?;
    validate_timestamp(timestamp, received_at)?;
    Ok(timestamp)
}

/// Reject timestamps from the future (beyond clock skew) or too far in the past.
pub fn validate_timestamp(timestamp: DateTime<Utc>, received_at: DateTime<Utc>) -> Result<()> {
    if timestamp > received_at + Duration::seconds(MAX_FUTURE_SKEW_SECS) {
        return Err(Error::validation_code(
            ValidationErrorCode::InvalidTimestamp,
            format!(
                "timestamp cannot be more than {}s in the future",
                MAX_FUTURE_SKEW_SECS
            ),
        ));
    }

    if received_at - timestamp > Duration::hours(MAX_EVENT_AGE_HOURS) {
        return Err(Error::validation_code(
            ValidationErrorCode::InvalidTimestamp,
            format!(
                "timestamp cannot be more than {}h in the past",
                MAX_EVENT_AGE_HOURS
            ),
        ));
    }

    Ok(())
}

/// Validates an interaction row and its typed details.
pub fn validate_interaction(event: &InteractionEvent) -> Result<()> {
    event
        .validate()
        .map_err(|e| Error::validation(format!("{}", e)))?;
    event.additional_data.validate()
}

pub fn validate_selection(event: &SelectionEvent) -> Result<()> {
    event
        .validate()
        .map_err(|e| Error::validation(format!("selection: {}", e)))
}

pub fn validate_snapshot(snapshot: &ConfigurationSnapshot) -> Result<()> {
    snapshot.validate().map_err(|e| {
        let too_large = e
            .field_errors()
            .get("configuration_data")
            .map(|errs| errs.iter().any(|err| err.code == "configuration_too_large"))
            .unwrap_or(false);
        if too_large {
            Error::validation_code(ValidationErrorCode::PayloadTooLarge, format!("snapshot: {}", e))
        } else {
            Error::validation(format!("snapshot: {}", e))
        }
    })?;

    if !snapshot.configuration_data.is_object() {
        return Err(Error::validation(
            "snapshot: configurationData must be an object",
        ));
    }
    Ok(())
}

pub fn validate_metric(metric: &PerformanceMetric) -> Result<()> {
    metric
        .validate()
        .map_err(|e| Error::validation(format!("metric: {}", e)))?;

    if !metric.value.is_finite() {
        return Err(Error::validation("metric: value must be finite"));
    }
    Ok(())
}
