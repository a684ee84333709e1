//! # Core subscriber traits
//!
//! [`Listener`] and [`Trapper`] are the extension points for plugging
//! components into the router. Application types implement one or both and
//! register an `Arc` of themselves.
//!
//! ## Contract
//! - Handlers run **synchronously** under the router lock and must not block
//!   on external I/O: a stalled handler stalls every other poster.
//! - Handlers receive `&Router` and may post events, add or remove
//!   subscriptions (including their own) and manage timers re-entrantly.
//! - A panic inside a handler is caught and reported to the router's
//!   [`FaultHook`](crate::FaultHook); it never silently vanishes.
//!
//! ## Example
//! ```rust
//! use erouter::{Event, Listener, Router};
//!
//! struct Printer;
//!
//! impl Listener for Printer {
//!     fn process_event(&self, _router: &Router, event: &Event) {
//!         println!("got {}", event.name());
//!     }
//!     fn name(&self) -> &str { "printer" }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::core::Router;
use crate::events::Event;

/// Subscriber that receives events with no power to halt delivery.
pub trait Listener: Send + Sync + 'static {
    /// Handle a single event.
    fn process_event(&self, router: &Router, event: &Event);

    /// Human-readable name (for logs and fault reports).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Subscriber consulted before listeners, able to consume an event.
pub trait Trapper: Send + Sync + 'static {
    /// Inspect an event; return `true` to trap it (no listener will see it).
    fn trap_event(&self, router: &Router, event: &Event) -> bool;

    /// Human-readable name (for logs and fault reports).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Identity of a registered subscriber.
///
/// Derived from the address of the shared allocation, so the id obtained from
/// the registering `Arc` equals the id a handler computes from `&self`.
/// The router does not own subscriber lifetime: an id outliving its
/// subscriber is meaningless and must be unregistered by the caller.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(usize);

impl SubscriberId {
    /// Id of a shared subscriber.
    #[inline]
    pub fn of<T: ?Sized>(subscriber: &Arc<T>) -> Self {
        Self(Arc::as_ptr(subscriber) as *const () as usize)
    }

    /// Id of a subscriber seen through a plain reference (e.g. `self` inside a handler).
    #[inline]
    pub fn of_ref<T: ?Sized>(subscriber: &T) -> Self {
        Self(subscriber as *const T as *const () as usize)
    }
}

impl fmt::Debug for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriberId({:#x})", self.0)
    }
}
