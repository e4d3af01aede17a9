//! Session finalization.
//!
//! ```text
//! ACTIVE ──finalize──▶ ACTIVE + endTime   (finalized-active)
//! ACTIVE ──convert───▶ COMPLETED + endTime
//! ACTIVE ──sweep─────▶ ABANDONED | COMPLETED
//! ```
//!
//! `endTime` is written by the first call that finds it null and never again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use telemetry::metrics;
use tracing::{debug, info};
use tracking_core::schema::{resolve_timestamp, validate_session_id};
use tracking_core::{
    CompletionSchema, ConversionRequest, Error, FinalizeRequest, Result, SessionStatus,
    SessionUpdate, SnapshotSubmission, TriggerEvent,
};

use crate::store::{EventStore, SessionChange};

/// Result of a finalize or conversion call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeOutcome {
    pub session_found: bool,
    /// Whether this call performed the transition.
    pub written: bool,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<SessionStatus>,
}

impl FinalizeOutcome {
    fn unknown() -> Self {
        Self {
            session_found: false,
            written: false,
            end_time: None,
            status: None,
        }
    }

    fn from_change(change: &SessionChange, written: bool) -> Self {
        Self {
            session_found: true,
            written,
            end_time: change.session.end_time,
            status: Some(change.session.status),
        }
    }
}

/// Closes session timelines on explicit client or conversion signals.
#[derive(Clone)]
pub struct SessionFinalizer {
    store: Arc<dyn EventStore>,
    completion: CompletionSchema,
}

impl SessionFinalizer {
    pub fn new(store: Arc<dyn EventStore>, completion: CompletionSchema) -> Self {
        Self { store, completion }
    }

    /// Idempotently set the session's end time.
    ///
    /// On the finalize that closes the timeline, an attached configuration
    /// becomes the session's latest configuration and is logged as a
    /// `page_exit` snapshot. Later finalizes leave both untouched.
    pub async fn finalize(&self, request: FinalizeRequest, now: DateTime<Utc>) -> Result<FinalizeOutcome> {
        validate_session_id(&request.session_id)?;
        // Beacons from suspended tabs can carry stale clocks.
        let at = resolve_timestamp(request.timestamp, now).unwrap_or(now);

        let snapshot = match &request.configuration_data {
            Some(config) => Some(
                SnapshotSubmission {
                    session_id: request.session_id.clone(),
                    configuration_data: config.clone(),
                    total_price: request.total_price.unwrap_or(0),
                    trigger_event: TriggerEvent::PageExit,
                    timestamp: None,
                }
                .into_snapshot(&self.completion, at)?,
            ),
            None => None,
        };

        let mut update = SessionUpdate::finalize(at);
        if let Some(config) = request.configuration_data {
            update = update.with_exit_configuration(config, request.total_price);
        }

        let change = match self.store.update_session(&request.session_id, &update).await {
            Ok(change) => change,
            Err(Error::SessionNotFound(_)) => {
                debug!(session_id = %request.session_id, "Finalize for unknown session ignored");
                return Ok(FinalizeOutcome::unknown());
            }
            Err(e) => return Err(e),
        };

        if let Some(snapshot) = snapshot.filter(|_| change.outcome.configuration_replaced) {
            self.store.append_snapshot(&snapshot).await?;
        }

        let written = change.outcome.end_time_set;
        if written {
            metrics().finalize_writes.inc();
            info!(
                session_id = %request.session_id,
                end_time = %at,
                "Session finalized"
            );
        } else {
            metrics().finalize_noops.inc();
            debug!(session_id = %request.session_id, "Session already finalized");
        }

        Ok(FinalizeOutcome::from_change(&change, written))
    }

    /// Mark the session COMPLETED after an external conversion.
    pub async fn convert(&self, request: ConversionRequest, now: DateTime<Utc>) -> Result<FinalizeOutcome> {
        validate_session_id(&request.session_id)?;
        let at = resolve_timestamp(request.timestamp, now).unwrap_or(now);

        let update = SessionUpdate::transition(SessionStatus::Completed, at);
        let change = match self.store.update_session(&request.session_id, &update).await {
            Ok(change) => change,
            Err(Error::SessionNotFound(_)) => {
                debug!(session_id = %request.session_id, "Conversion for unknown session ignored");
                return Ok(FinalizeOutcome::unknown());
            }
            Err(e) => return Err(e),
        };

        let written = change.outcome.status_changed;
        if written {
            metrics().conversions.inc();
            info!(
                session_id = %request.session_id,
                source = request.source.as_deref().unwrap_or("unknown"),
                "Session converted"
            );
        }

        Ok(FinalizeOutcome::from_change(&change, written))
    }
}
