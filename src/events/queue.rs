//! # Deferred event queue.
//!
//! Background threads (device drivers, vision workers) can hand events to the
//! router without taking the dispatch lock: they push into an [`EventQueue`],
//! and whoever drives the router (usually the [`TimerDriver`](crate::TimerDriver))
//! drains it with [`Router::process_queue`](crate::Router::process_queue).
//!
//! ## Rules
//! - FIFO: events are posted in the order they were queued.
//! - Bounded: with a non-zero capacity, pushing into a full queue fails with
//!   [`RouterError::QueueFull`] and the event is dropped.
//! - `replace` drops stale events with the same generator and source first,
//!   so only the freshest reading of a continuously updating source waits in line.

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::event::Event;
use crate::error::RouterError;

/// Thread-safe FIFO of events waiting to be posted.
#[derive(Debug)]
pub struct EventQueue {
    inner: Mutex<VecDeque<Event>>,
    capacity: Option<usize>,
}

impl EventQueue {
    /// Creates a queue; `capacity = None` means unbounded.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// Appends an event.
    pub fn push(&self, event: Event) -> Result<(), RouterError> {
        let mut q = self.inner.lock();
        if let Some(capacity) = self.capacity {
            if q.len() >= capacity {
                return Err(RouterError::QueueFull { capacity });
            }
        }
        q.push_back(event);
        Ok(())
    }

    /// Drops queued events with the same generator and source, then appends.
    pub fn replace(&self, event: Event) -> Result<(), RouterError> {
        let mut q = self.inner.lock();
        q.retain(|queued| !queued.same_origin(&event));
        if let Some(capacity) = self.capacity {
            if q.len() >= capacity {
                return Err(RouterError::QueueFull { capacity });
            }
        }
        q.push_back(event);
        Ok(())
    }

    /// Removes and returns everything queued so far.
    pub fn drain(&self) -> Vec<Event> {
        self.inner.lock().drain(..).collect()
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
