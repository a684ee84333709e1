//! # Fault hook: what happens when a subscriber panics.
//!
//! Every subscriber call is wrapped individually. When one panics, the router
//! builds a [`Fault`] describing where and why, and asks the installed
//! [`FaultHook`] for a [`FaultAction`]:
//!
//! - [`FaultAction::Continue`] swallows the panic; delivery moves on to the
//!   next subscriber (a panicking trapper counts as "did not trap").
//! - [`FaultAction::Propagate`] aborts the whole in-flight cascade and resumes
//!   unwinding out of the outermost `post_event`.
//!
//! The default hook ([`log_and_continue`]) logs at `error!` and continues.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use erouter::{Fault, FaultAction, FaultHook, FaultSite};
//!
//! // Treat listener faults as fatal, tolerate everything else.
//! let hook: FaultHook = Arc::new(|fault: &Fault<'_>| match fault.site {
//!     FaultSite::Listener => FaultAction::Propagate,
//!     _ => FaultAction::Continue,
//! });
//! # let _ = hook;
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::events::Event;
use crate::subscribers::SubscriberId;

/// Which kind of subscriber call faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultSite {
    /// A trapper's `trap_event`.
    Trapper,
    /// A listener's `process_event` during normal delivery.
    Listener,
    /// The owner's `process_event` for one of its own timers.
    Timer,
}

impl FaultSite {
    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            FaultSite::Trapper => "trapper",
            FaultSite::Listener => "listener",
            FaultSite::Timer => "timer",
        }
    }
}

impl fmt::Display for FaultSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Hook decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultAction {
    /// Swallow the fault and keep delivering.
    #[default]
    Continue,
    /// Re-raise the fault as fatal.
    Propagate,
}

/// Full context of one subscriber fault.
pub struct Fault<'a> {
    /// Where the fault happened.
    pub site: FaultSite,
    /// The event being delivered.
    pub event: &'a Event,
    /// Name of the faulting subscriber.
    pub subscriber: &'a str,
    /// Identity of the faulting subscriber.
    pub id: SubscriberId,
    /// Diagnostic message (`"occurred while processing ... by ..."` plus the panic text).
    pub message: String,
    /// Raw panic payload, if one was captured.
    pub panic: Option<&'a (dyn Any + Send)>,
}

impl fmt::Debug for Fault<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("site", &self.site)
            .field("event", &self.event.name())
            .field("subscriber", &self.subscriber)
            .field("id", &self.id)
            .field("message", &self.message)
            .finish()
    }
}

/// The single user-visible error-reporting surface.
pub type FaultHook = Arc<dyn Fn(&Fault<'_>) -> FaultAction + Send + Sync>;

/// Default hook: log the fault and keep delivering.
pub fn log_and_continue(fault: &Fault<'_>) -> FaultAction {
    tracing::error!(
        site = fault.site.as_label(),
        subscriber = fault.subscriber,
        event = %fault.event.name(),
        "{}",
        fault.message
    );
    FaultAction::Continue
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
