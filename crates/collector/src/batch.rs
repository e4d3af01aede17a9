//! Interaction buffer.

use std::time::Duration;

use tokio::time::Instant;
use tracking_core::InteractionSubmission;

/// Interactions waiting to be shipped in one request.
#[derive(Debug)]
pub struct InteractionBuffer {
    events: Vec<InteractionSubmission>,
    created_at: Instant,
    max_size: usize,
}

impl InteractionBuffer {
    pub fn new(max_size: usize) -> Self {
        Self {
            events: Vec::new(),
            created_at: Instant::now(),
            max_size,
        }
    }

    /// Add an event. Returns the full batch once `max_size` is reached.
    pub fn push(&mut self, event: InteractionSubmission) -> Option<Vec<InteractionSubmission>> {
        if self.events.is_empty() {
            self.created_at = Instant::now();
        }
        self.events.push(event);
        if self.events.len() >= self.max_size {
            return Some(self.take());
        }
        None
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Take events and reset the buffer.
    pub fn take(&mut self) -> Vec<InteractionSubmission> {
        self.created_at = Instant::now();
        std::mem::take(&mut self.events)
    }

    /// Take events if the oldest has waited at least `max_age`.
    pub fn take_aged(&mut self, max_age: Duration) -> Option<Vec<InteractionSubmission>> {
        if !self.is_empty() && self.age() >= max_age {
            Some(self.take())
        } else {
            None
        }
    }
}
