//! # LogWriter: simple event logger
//!
//! A minimal listener that writes every event it receives through `tracing`.
//! Use it for tests or demos: subscribe it to the generators you want to watch.
//!
//! ## Example output
//! ```text
//! INFO erouter: [activate] event="(button,3,A)" source=3 duration_ms=0
//! INFO erouter: [membership] generator=sensor change=deactivate
//! INFO erouter: [timer] event="(timer,42,S)" due_ms=500
//! ```

use crate::core::Router;
use crate::events::{Event, EventType, Generator};
use crate::subscribers::Listener;

/// Event logging listener.
#[derive(Default, Debug)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Listener for LogWriter {
    fn process_event(&self, _router: &Router, e: &Event) {
        match (e.generator, e.kind) {
            (Generator::Router, kind) => {
                let affected = Generator::from_index(e.source)
                    .map(|g| g.as_str())
                    .unwrap_or("invalid");
                tracing::info!(generator = affected, change = %kind, "[membership]");
            }
            (Generator::Timer, _) => {
                tracing::info!(event = %e.name(), due_ms = e.duration, "[timer]");
            }
            (_, EventType::Activate) => {
                tracing::info!(event = %e.name(), source = e.source, duration_ms = e.duration, "[activate]");
            }
            (_, EventType::Status) => {
                tracing::info!(event = %e.name(), source = e.source, magnitude = e.magnitude, "[status]");
            }
            (_, EventType::Deactivate) => {
                tracing::info!(event = %e.name(), source = e.source, duration_ms = e.duration, "[deactivate]");
            }
        }
    }

    fn name(&self) -> &str {
        "LogWriter"
    }
}
