//! Bounce rate.
//!
//! A session bounces when `(endTime or lastActivity) - startTime` is under
//! 30 seconds.

use tracking_core::Session;

use crate::{percentage, round1};

pub fn is_bounce(session: &Session) -> bool {
    session.is_bounce()
}

/// Share of bounced sessions, in percent with one decimal.
pub fn bounce_rate<'a>(sessions: impl IntoIterator<Item = &'a Session>) -> f64 {
    let (mut total, mut bounced) = (0u64, 0u64);
    for session in sessions {
        total += 1;
        if is_bounce(session) {
            bounced += 1;
        }
    }
    round1(percentage(bounced, total))
}
