//! # Router configuration.
//!
//! Provides [`RouterConfig`], centralized settings for a [`Router`](crate::Router)
//! and its [`TimerDriver`](crate::TimerDriver).
//!
//! ## Sentinel values
//! - `queue_capacity = 0` → unbounded deferred queue
//! - `tick = 0s` → clamped to 1ms by the driver

use std::time::Duration;

/// Settings for the router runtime.
///
/// ## Field semantics
/// - `tick`: how often the driver drains the deferred queue and fires due timers
/// - `queue_capacity`: deferred-queue bound (`0` = unbounded)
/// - `meta_events`: whether subscriber-count transitions synthesize router events
///
/// ## Notes
/// All fields are public; prefer the helper accessors over sprinkling
/// sentinel checks across the codebase.
#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Driver period.
    ///
    /// Timers are soft: a timer fires on the first tick at or after its due
    /// time, so the tick bounds the firing latency.
    pub tick: Duration,

    /// Maximum number of events waiting in the deferred queue.
    ///
    /// - `0` = unbounded
    /// - `n > 0` = pushes beyond `n` fail with `RouterError::QueueFull`
    pub queue_capacity: usize,

    /// Synthesize activate/status/deactivate events on the `Router`
    /// generator when a generator gains or loses subscribers.
    pub meta_events: bool,
}

impl RouterConfig {
    /// Returns the queue bound as an `Option` (`None` = unbounded).
    #[inline]
    pub fn queue_limit(&self) -> Option<usize> {
        if self.queue_capacity == 0 {
            None
        } else {
            Some(self.queue_capacity)
        }
    }

    /// Returns the driver tick clamped to a minimum of 1ms.
    #[inline]
    pub fn tick_clamped(&self) -> Duration {
        self.tick.max(Duration::from_millis(1))
    }
}

impl Default for RouterConfig {
    /// Default configuration:
    ///
    /// - `tick = 32ms` (one sensor frame)
    /// - `queue_capacity = 1024`
    /// - `meta_events = true`
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(32),
            queue_capacity: 1024,
            meta_events: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_hidden_by_accessors() {
        let cfg = RouterConfig {
            tick: Duration::ZERO,
            queue_capacity: 0,
            meta_events: true,
        };
        assert_eq!(cfg.queue_limit(), None);
        assert_eq!(cfg.tick_clamped(), Duration::from_millis(1));
        assert_eq!(RouterConfig::default().queue_limit(), Some(1024));
    }
}
