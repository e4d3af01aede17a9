//! Fixed-window click debounce.
//!
//! The first click on an element opens a window. Further clicks on the same
//! element inside it only bump a counter. When the window closes exactly one
//! event is emitted, stamped at the close, carrying the folded click count.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tracking_core::{ClickDetails, InteractionSubmission};

const MAX_FOLDED_CLICKS: u32 = 1000;

#[derive(Debug)]
struct PendingClick {
    submission: InteractionSubmission,
    details: ClickDetails,
    opened_at_ms: i64,
    token: WindowToken,
}

/// Identifies one window on one element. A timer holding a stale token
/// cannot close a window opened after an early close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowToken(u64);

#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: Mutex<HashMap<String, PendingClick>>,
    next_token: AtomicU64,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(0),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a click observed at `at_ms` (Unix ms).
    ///
    /// Returns a token when the click opened a new window; the caller must
    /// then call [`Debouncer::close`] with it once the window has elapsed.
    pub fn observe(
        &self,
        key: &str,
        submission: InteractionSubmission,
        details: ClickDetails,
        at_ms: i64,
    ) -> Option<WindowToken> {
        let mut pending = self.pending.lock();
        match pending.get_mut(key) {
            Some(open) => {
                open.details.click_count = (open.details.click_count + 1).min(MAX_FOLDED_CLICKS);
                None
            }
            None => {
                let token = WindowToken(self.next_token.fetch_add(1, Ordering::Relaxed));
                pending.insert(
                    key.to_string(),
                    PendingClick {
                        submission,
                        details,
                        opened_at_ms: at_ms,
                        token,
                    },
                );
                Some(token)
            }
        }
    }

    /// Close the window `token` opened on `key`, returning its single event.
    ///
    /// Does nothing if that window was already closed.
    pub fn close(&self, key: &str, token: WindowToken) -> Option<InteractionSubmission> {
        let closed = {
            let mut pending = self.pending.lock();
            if pending.get(key)?.token != token {
                return None;
            }
            pending.remove(key)?
        };
        Some(self.emit(closed))
    }

    /// Close every open window early.
    pub fn close_all(&self) -> Vec<InteractionSubmission> {
        let drained: Vec<PendingClick> = self.pending.lock().drain().map(|(_, p)| p).collect();
        drained.into_iter().map(|p| self.emit(p)).collect()
    }

    pub fn open_windows(&self) -> usize {
        self.pending.lock().len()
    }

    fn emit(&self, closed: PendingClick) -> InteractionSubmission {
        let mut submission = closed.submission;
        submission.timestamp = Some(closed.opened_at_ms + self.window.as_millis() as i64);
        submission.additional_data = serde_json::to_value(&closed.details).unwrap_or(Value::Null);
        submission
    }
}
