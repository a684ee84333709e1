//! # erouter
//!
//! **erouter** is a synchronous, re-entrant publish/subscribe event router
//! for robot-control style applications.
//!
//! Producers (sensor pollers, vision, buttons, behaviors) post small typed
//! events; consumers subscribe by generator category, optionally narrowed to
//! one source and one type. The router also schedules per-listener timers and
//! announces when a category gains or loses its last subscriber, so expensive
//! producers can idle until someone cares.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  producers ──► Router::post_event ──────────────────────────────┐
//!                      │                                          │
//!                      ▼                                          │
//! ┌────────────────────────────────────────────────────────────┐  │
//! │ Router (one re-entrant lock)                               │  │
//! │  - trapper registry   Generator ─► all | type ─► source    │  │
//! │  - listener registry  Generator ─► all | type ─► source    │  │
//! │  - timer schedule     ordered by next due time             │  │
//! │  - postings           in-flight deliveries (FIFO)          │  │
//! └───────┬───────────────────────────┬────────────────────────┘  │
//!         ▼                           ▼                           │
//!   trappers (may consume)     listeners (all invoked)            │
//!         │                           │                           │
//!         └──── handlers call back in: post / subscribe / timers ─┘
//!
//!  add_* / remove_* ──► Router-generator meta-events (activate/status/deactivate)
//!  process_timers   ──► owner.process_event(timer) then broadcast on Generator::Timer
//!  queue_event (any thread) ──► EventQueue ──► process_queue / TimerDriver
//! ```
//!
//! ### Delivery of one event
//! ```text
//! post_event(A)
//!   ├─► forwarding agent for this thread's role? ── consumed ──► return
//!   ├─► snapshot matching trappers + listeners, append to postings
//!   └─► drive postings:
//!         for each trapper:  still subscribed? → trap_event → true ⇒ stop A
//!         for each listener: still subscribed? → process_event
//!         (a handler posting B appends B; B runs after A's remaining subscribers)
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                         |
//! |-------------------|---------------------------------------------------------------|--------------------------------------------|
//! | **Events**        | Generator / source / type envelope with optional payload.     | [`Event`], [`Generator`], [`EventType`]    |
//! | **Subscribers**   | Listeners receive, trappers may consume.                      | [`Listener`], [`Trapper`], [`ListenerFn`]  |
//! | **Routing**       | Filtered subscriptions, re-entrant dispatch, introspection.   | [`Router`], [`Filter`]                     |
//! | **Timers**        | Per-listener one-shot and repeating timers.                   | [`TimerInfo`], [`TIMER_CANCEL`]            |
//! | **Faults**        | Subscriber panics reported to one hook.                       | [`FaultHook`], [`FaultAction`]             |
//! | **Cross-thread**  | Deferred queue, per-role forwarding, async pump.              | [`EventQueue`], [`ForwardingAgent`], [`TimerDriver`] |
//! | **Configuration** | Centralize router settings.                                   | [`RouterConfig`], [`RouterBuilder`]        |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] listener _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use erouter::{Event, EventType, Generator, ListenerFn, ManualClock, Router, RouterConfig};
//!
//! let clock = Arc::new(ManualClock::new(0));
//! let router = Router::builder(RouterConfig::default())
//!     .with_clock(clock.clone())
//!     .build();
//!
//! let beeper = ListenerFn::arc("beeper", |_r: &Router, ev: &Event| {
//!     println!("got {}", ev.name());
//! });
//!
//! // Button 3 presses, plus a 100ms one-shot timer.
//! router.add_listener(beeper.clone(), (Generator::Button, 3));
//! router.add_timer(beeper, 0, 100, false);
//!
//! router.post(Generator::Button, 3, EventType::Activate);
//!
//! clock.advance(100);
//! router.process_timers();
//! assert_eq!(router.timer_count(), 0);
//! ```

mod core;
mod error;
mod events;
mod forwarding;
mod policies;
mod subscribers;

// ---- Public re-exports ----

pub use core::{
    Clock, Filter, ManualClock, MonotonicClock, Router, RouterBuilder, RouterConfig, TIMER_CANCEL,
    TimerDriver, TimerInfo,
};
pub use error::RouterError;
pub use events::{Event, EventQueue, EventType, Generator, Payload, SourceId};
pub use forwarding::{ForwardingAgent, ProcessRole, QueueForwarder};
pub use policies::{Fault, FaultAction, FaultHook, FaultSite, log_and_continue};
pub use subscribers::{Listener, ListenerFn, SubscriberId, Trapper, TrapperFn};

// Optional: expose a simple built-in logger listener (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
