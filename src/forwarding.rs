//! # Cross-process forwarding hook.
//!
//! In a multi-process (or multi-thread-group) deployment, events posted from a
//! secondary role (the motion loop, the sound thread) may need to be shipped
//! to the main role instead of being dispatched locally. The router supports
//! this without touching the dispatch algorithm: an installed
//! [`ForwardingAgent`] for the poster's [`ProcessRole`] is consulted first,
//! under the router lock, and may consume the event.
//!
//! ## Architecture
//! ```text
//! post_event(e) on thread with role R
//!     │
//!     ├── agent for R installed? ── forward_event(e) == true ──► done (not dispatched here)
//!     │
//!     └── otherwise ──► trappers ──► listeners
//! ```
//!
//! The transport behind an agent (shared memory, sockets, proxies) lives
//! outside this crate. [`QueueForwarder`] is the in-process variant: it moves
//! events into the router's deferred queue so the main role dispatches them.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use crate::events::{Event, EventQueue};

/// Role of the current thread group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessRole {
    /// Behaviors and the main event loop.
    Main,
    /// Motion command execution.
    Motion,
    /// Sound playback.
    Sound,
    /// Simulator / hardware bridge.
    Simulator,
}

impl ProcessRole {
    /// Short stable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessRole::Main => "main",
            ProcessRole::Motion => "motion",
            ProcessRole::Sound => "sound",
            ProcessRole::Simulator => "simulator",
        }
    }

    /// Role of the calling thread, if one was assigned.
    pub fn current() -> Option<ProcessRole> {
        CURRENT_ROLE.with(Cell::get)
    }

    /// Assigns a role to the calling thread (`None` clears it).
    pub fn set_current(role: Option<ProcessRole>) {
        CURRENT_ROLE.with(|r| r.set(role));
    }
}

impl fmt::Display for ProcessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

thread_local! {
    static CURRENT_ROLE: Cell<Option<ProcessRole>> = const { Cell::new(None) };
}

/// Interceptor consulted before local dispatch.
pub trait ForwardingAgent: Send + Sync + 'static {
    /// Forward `event`; return `true` if it must not be dispatched locally.
    fn forward_event(&self, event: &Event) -> bool;
}

/// Forwards events into a deferred [`EventQueue`].
///
/// Install it for secondary roles so their posts are dispatched later by
/// whoever drains the queue (see [`Router::process_queue`](crate::Router::process_queue)).
#[derive(Debug, Clone)]
pub struct QueueForwarder {
    queue: Arc<EventQueue>,
}

impl QueueForwarder {
    /// Creates a forwarder feeding `queue`.
    pub fn new(queue: Arc<EventQueue>) -> Self {
        Self { queue }
    }
}

impl ForwardingAgent for QueueForwarder {
    fn forward_event(&self, event: &Event) -> bool {
        if let Err(err) = self.queue.push(event.clone()) {
            tracing::warn!(event = %event.name(), reason = err.as_label(), "forwarded event dropped");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventType, Generator};

    #[test]
    fn role_is_per_thread() {
        ProcessRole::set_current(Some(ProcessRole::Motion));
        assert_eq!(ProcessRole::current(), Some(ProcessRole::Motion));

        let other = std::thread::spawn(ProcessRole::current).join().unwrap();
        assert_eq!(other, None);

        ProcessRole::set_current(None);
        assert_eq!(ProcessRole::current(), None);
    }

    #[test]
    fn queue_forwarder_always_consumes() {
        let queue = Arc::new(EventQueue::new(Some(1)));
        let fwd = QueueForwarder::new(queue.clone());
        let ev = Event::new(Generator::Locomotion, 1, EventType::Status);

        assert!(fwd.forward_event(&ev));
        assert!(fwd.forward_event(&ev)); // dropped on overflow, still consumed
        assert_eq!(queue.len(), 1);
    }
}
