use std::sync::Arc;

use super::{clock::Clock, clock::MonotonicClock, config::RouterConfig, router::Router};
use crate::policies::{FaultHook, log_and_continue};

/// Builder for constructing a Router with optional collaborators.
pub struct RouterBuilder {
    cfg: RouterConfig,
    clock: Option<Arc<dyn Clock>>,
    fault_hook: Option<FaultHook>,
}

impl RouterBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: RouterConfig) -> Self {
        Self {
            cfg,
            clock: None,
            fault_hook: None,
        }
    }

    /// Sets the time source used for timestamps and timers.
    ///
    /// Defaults to [`MonotonicClock`].
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the fault hook consulted when a subscriber panics.
    ///
    /// Defaults to [`log_and_continue`].
    pub fn with_fault_hook(mut self, hook: FaultHook) -> Self {
        self.fault_hook = Some(hook);
        self
    }

    /// Builds and returns the Router instance.
    pub fn build(self) -> Arc<Router> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(MonotonicClock));
        let hook = self
            .fault_hook
            .unwrap_or_else(|| Arc::new(log_and_continue));
        Arc::new(Router::new_internal(self.cfg, clock, hook))
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}
