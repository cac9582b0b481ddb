//! FIFO command queue drained by a single consumer.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Duration;

use super::events::AppEvent;

/// Outcome of waiting on the queue
#[derive(Debug)]
pub(crate) enum Dequeued {
    /// The oldest queued event.
    Event(AppEvent),
    /// Nothing arrived before the wait expired.
    Empty,
    /// The queue was closed and fully drained.
    Closed,
}

#[derive(Debug, Default)]
struct QueueState {
    events: VecDeque<AppEvent>,
    closed: bool,
}

/// Blocking FIFO queue
///
/// Producers push from any thread; the consumer blocks on a condition
/// variable until an event is available. Events still queued when the
/// queue is closed are handed out before `Closed` is reported.
#[derive(Debug, Default)]
pub(crate) struct CommandQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl CommandQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append an event. Returns false if the queue has been closed.
    pub(crate) fn push(&self, event: AppEvent) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.events.push_back(event);
        drop(state);
        self.available.notify_one();
        true
    }

    /// Take the oldest event without waiting
    pub(crate) fn try_pop(&self) -> Option<AppEvent> {
        self.state.lock().events.pop_front()
    }

    /// Wait up to `timeout` for the oldest event
    pub(crate) fn pop_timeout(&self, timeout: Duration) -> Dequeued {
        let mut state = self.state.lock();
        if state.events.is_empty() && !state.closed {
            // Spurious wake-ups fall through to the checks below.
            let _ = self.available.wait_for(&mut state, timeout);
        }

        match state.events.pop_front() {
            Some(event) => Dequeued::Event(event),
            None if state.closed => Dequeued::Closed,
            None => Dequeued::Empty,
        }
    }

    /// Refuse further pushes and wake the consumer
    pub(crate) fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().events.len()
    }
}
