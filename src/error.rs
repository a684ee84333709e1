//! Error types used by the event router.
//!
//! [`RouterError`] covers the few failures the router itself can report.
//! Expected conditions (removing a subscription that does not exist, asking
//! for a timer that was never added) are plain `bool`/`Option` returns and
//! never show up here. Faults raised by subscribers travel through the
//! [`FaultHook`](crate::FaultHook) instead.
//!
//! Like the rest of the crate, the type provides `as_label` / `as_message`
//! helpers for logs and metrics.

use thiserror::Error;

/// # Errors produced by the router.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// A generator name could not be parsed.
    #[error("unknown event generator {name:?}")]
    UnknownGenerator {
        /// The offending input.
        name: String,
    },

    /// An event type name could not be parsed.
    #[error("unknown event type {name:?}")]
    UnknownEventType {
        /// The offending input.
        name: String,
    },

    /// The deferred event queue is full; the event was not queued.
    #[error("event queue full (capacity {capacity})")]
    QueueFull {
        /// The configured queue bound.
        capacity: usize,
    },

    /// The timer driver task ended abnormally.
    #[error("timer driver stopped unexpectedly")]
    DriverStopped,
}

impl RouterError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use erouter::RouterError;
    ///
    /// let err = RouterError::QueueFull { capacity: 8 };
    /// assert_eq!(err.as_label(), "router_queue_full");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RouterError::UnknownGenerator { .. } => "router_unknown_generator",
            RouterError::UnknownEventType { .. } => "router_unknown_event_type",
            RouterError::QueueFull { .. } => "router_queue_full",
            RouterError::DriverStopped => "router_driver_stopped",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RouterError::UnknownGenerator { name } => format!("unknown generator: {name}"),
            RouterError::UnknownEventType { name } => format!("unknown event type: {name}"),
            RouterError::QueueFull { capacity } => {
                format!("queue full; capacity={capacity}")
            }
            RouterError::DriverStopped => "timer driver stopped".to_string(),
        }
    }
}
