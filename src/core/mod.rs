//! Router core: registry, dispatch, timers and membership announcements.
//!
//! The public API from this module is [`Router`] plus its construction and
//! time/driver helpers.
//!
//! Internal modules:
//! - [`registry`]: per-generator subscription maps for listeners and trappers;
//! - [`dispatch`]: re-entrant delivery through trappers then listeners, fault handling;
//! - [`timers`]: ordered timer schedule with drift-free repetition;
//! - [`notifier`]: activate/status/deactivate meta-events on membership changes;
//! - [`router`]: the lock, the state and the public operations;
//! - [`driver`]: tokio task that pumps the queue and timers.

mod builder;
pub(crate) mod clock;
mod config;
mod dispatch;
mod driver;
mod notifier;
mod registry;
mod router;
mod timers;

pub use builder::RouterBuilder;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::RouterConfig;
pub use driver::TimerDriver;
pub use registry::Filter;
pub use router::Router;
pub use timers::{TIMER_CANCEL, TimerInfo};
