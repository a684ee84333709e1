//! # Timer driver: periodic pump for the deferred queue and timers.
//!
//! The router itself is synchronous. In an async application a
//! [`TimerDriver`] task calls into it every `tick`:
//!
//! ```text
//! loop {
//!   select! {
//!     token.cancelled() → exit
//!     interval.tick()   → process_queue(); process_timers()
//!   }
//! }
//! ```
//!
//! Router calls block the driver task for the length of one delivery
//! cascade, so handlers are expected to be short.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::core::router::Router;
use crate::error::RouterError;

/// Handle to a running driver task.
pub struct TimerDriver {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl TimerDriver {
    /// Spawns the driver loop on the current tokio runtime.
    ///
    /// The loop stops when `token` (or [`TimerDriver::stop`]) cancels it.
    pub fn spawn(router: Arc<Router>, token: CancellationToken) -> Self {
        let period = router.config().tick_clamped();
        let child = token.clone();

        let join = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::debug!(tick_ms = period.as_millis() as u64, "timer driver started");

            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        router.process_queue();
                        router.process_timers();
                    }
                }
            }
            tracing::debug!("timer driver stopped");
        });

        Self { token, join }
    }

    /// Token that stops this driver when cancelled.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancels the loop and waits for it to finish.
    ///
    /// Returns [`RouterError::DriverStopped`] if the task ended abnormally
    /// (for example a handler panic propagated by the fault hook).
    pub async fn stop(self) -> Result<(), RouterError> {
        self.token.cancel();
        self.join.await.map_err(|err| {
            tracing::error!(error = %err, "timer driver task failed");
            RouterError::DriverStopped
        })
    }
}
