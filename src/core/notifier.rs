//! # Membership announcements.
//!
//! When a generator's subscriber count (trappers plus listeners) changes, the
//! router posts a meta-event on [`Generator::Router`] whose source is the
//! affected generator's index:
//!
//! | transition          | type         |
//! |---------------------|--------------|
//! | 0 → 1               | `Activate`   |
//! | n → n±1, both > 0   | `Status`     |
//! | 1 → 0               | `Deactivate` |
//!
//! Announcements are delivered synchronously through the normal dispatch
//! path, before the add/remove call returns.

use crate::core::router::Router;
use crate::events::{Event, EventType, Generator};

impl Router {
    /// Announces a subscription added to `generator`.
    pub(crate) fn subscribed(&self, generator: Generator, had_subscribers: bool) {
        let kind = if had_subscribers {
            EventType::Status
        } else {
            EventType::Activate
        };
        self.announce(generator, kind);
    }

    /// Announces a subscription removed from `generator`.
    pub(crate) fn unsubscribed(&self, generator: Generator) {
        let still = self.state.lock().borrow().has_subscribers(generator);
        let kind = if still {
            EventType::Status
        } else {
            EventType::Deactivate
        };
        self.announce(generator, kind);
    }

    fn announce(&self, generator: Generator, kind: EventType) {
        if !self.config().meta_events {
            return;
        }
        tracing::debug!(generator = generator.as_str(), kind = kind.as_str(), "membership changed");
        let event = Event::new(Generator::Router, generator.index(), kind).with_timestamp(self.now());
        self.post_event(event);
    }
}
