//! Tracking of deliveries that have not settled yet.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct State {
    count: AtomicUsize,
    idle: Notify,
}

/// Set of in-flight deliveries that can be awaited to empty.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    state: Arc<State>,
}

/// Held by a delivery task for as long as it runs.
#[derive(Debug)]
pub struct InFlightGuard {
    state: Arc<State>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.state.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.state.idle.notify_waiters();
        }
    }
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self) -> InFlightGuard {
        self.state.count.fetch_add(1, Ordering::AcqRel);
        InFlightGuard {
            state: self.state.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.state.count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until every tracked delivery has finished.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.state.idle.notified();
            if self.is_empty() {
                return;
            }
            notified.await;
        }
    }
}
