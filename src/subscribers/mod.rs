//! # Event subscribers for the router.
//!
//! This module provides the [`Listener`] and [`Trapper`] traits, subscriber
//! identity ([`SubscriberId`]) and closure-backed helpers.
//!
//! ## Architecture
//! ```text
//! post(Event) ──► Router ──► trappers (in order) ──► trapped? ──► stop
//!                                   │
//!                                   └─ not trapped ──► listeners (in order)
//!                                                         │
//!                                        ┌────────────────┼───────────────┐
//!                                        ▼                ▼               ▼
//!                                    LogWriter       Behavior       Driver gate
//! ```
//!
//! ## Subscriber kinds
//! - **Listeners** observe events; one listener's fault never blocks the next.
//! - **Trappers** run first and may consume an event so no listener sees it.

#[cfg(feature = "logging")]
mod log;
mod subscriber;
mod subscriber_fn;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscriber::{Listener, SubscriberId, Trapper};
pub use subscriber_fn::{ListenerFn, TrapperFn};
