//! Idle session sweep.
//!
//! Sessions still ACTIVE after the idle threshold are closed: COMPLETED when
//! they reached a milestone, ABANDONED otherwise. The end time is the last
//! recorded activity, and an end time set earlier by a finalize is kept.
//! The idle check is repeated under the session lock, so activity that lands
//! between the scan and the close keeps the session open.

use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use telemetry::metrics;
use tracing::{debug, info, warn};
use tracking_core::session::IDLE_TIMEOUT_HOURS;
use tracking_core::{Result, SessionStatus, SessionUpdate};

use crate::store::{EventStore, SessionRollup};

#[derive(Debug, Clone, Deserialize)]
pub struct SweepPolicy {
    /// Inactivity after which an ACTIVE session is closed.
    #[serde(default = "default_idle_hours")]
    pub idle_hours: i64,
    /// Maximum sessions closed per run.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
}

fn default_idle_hours() -> i64 {
    IDLE_TIMEOUT_HOURS
}

fn default_batch_limit() -> usize {
    500
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            idle_hours: default_idle_hours(),
            batch_limit: default_batch_limit(),
        }
    }
}

impl SweepPolicy {
    pub fn idle_threshold(&self) -> Duration {
        Duration::hours(self.idle_hours)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub scanned: usize,
    pub abandoned: usize,
    pub completed: usize,
    pub failed: usize,
}

fn closing_status(rollup: &SessionRollup) -> SessionStatus {
    if rollup.reached_milestone() {
        SessionStatus::Completed
    } else {
        SessionStatus::Abandoned
    }
}

/// Close every session idle past the policy threshold, up to the batch limit.
///
/// Failures on individual sessions are logged and counted; the run continues.
pub async fn sweep_idle_sessions(
    store: &dyn EventStore,
    policy: &SweepPolicy,
    now: DateTime<Utc>,
) -> Result<SweepReport> {
    let start = Instant::now();
    let cutoff = now - policy.idle_threshold();
    let stale = store.stale_active_sessions(cutoff, policy.batch_limit).await?;

    let mut report = SweepReport {
        scanned: stale.len(),
        ..Default::default()
    };

    for rollup in &stale {
        let status = closing_status(rollup);
        let update = SessionUpdate::close_idle(
            status,
            rollup.session.last_activity,
            now,
            policy.idle_threshold(),
        );

        match store.update_session(&rollup.session.session_id, &update).await {
            Ok(change) if change.outcome.status_changed => match status {
                SessionStatus::Completed => report.completed += 1,
                _ => report.abandoned += 1,
            },
            Ok(_) => {
                // Closed by a conversion, or active again since the scan.
                debug!(session_id = %rollup.session.session_id, "Session no longer idle");
            }
            Err(e) => {
                report.failed += 1;
                warn!(
                    session_id = %rollup.session.session_id,
                    error = %e,
                    "Failed to close idle session"
                );
            }
        }
    }

    let m = metrics();
    m.sweep_runs.inc();
    m.sweep_abandoned.inc_by(report.abandoned as u64);
    m.sweep_completed.inc_by(report.completed as u64);

    if report.scanned > 0 {
        info!(
            scanned = report.scanned,
            abandoned = report.abandoned,
            completed = report.completed,
            failed = report.failed,
            duration_ms = %start.elapsed().as_millis(),
            "Idle session sweep finished"
        );
    }

    Ok(report)
}
