//! Routed events: envelope types and the deferred queue.
//!
//! ## Contents
//! - [`Generator`], [`EventType`], [`SourceId`]: the identity triple
//! - [`Event`]: the envelope delivered to listeners and trappers
//! - [`EventQueue`]: handoff from background threads that never takes the dispatch lock
//!
//! ## Quick reference
//! - **Producers**: drivers, behaviors, the timer scheduler, the membership notifier.
//! - **Consumers**: anything registered through [`Router`](crate::Router).

mod event;
mod queue;

pub use event::{Event, EventType, Generator, Payload, SourceId};
pub use queue::EventQueue;
