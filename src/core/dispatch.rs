//! # Dispatch: delivering one event through trappers and listeners.
//!
//! Each `post_event` pushes a [`Posting`] (the event, snapshots of its
//! matching trappers and listeners, and two cursors) onto the router's
//! work-list, then drives the work-list until it is empty.
//!
//! ```text
//! postings: [ A (cursor mid-listeners) | B | C ]
//!             ▲ front is always the one being walked
//! ```
//!
//! ## Rules
//! - A handler of A that posts B appends B and drives the work-list itself,
//!   so A's remaining subscribers run first, then B's cascade, all before the
//!   outermost `post_event(A)` returns.
//! - Before each call the subscriber is re-checked against the live registry;
//!   removals take effect immediately, additions only for later events.
//! - A `true` from a trapper suppresses the subscribers of that event not yet
//!   reached.
//! - No state borrow is held while a subscriber runs.
//! - Every call is wrapped in `catch_unwind`; the fault hook decides whether
//!   to continue or to abandon the cascade and resume the panic at the
//!   outermost frame.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::core::registry::Entry;
use crate::core::router::{Guard, Router, State};
use crate::events::{Event, EventType, Generator};
use crate::forwarding::ProcessRole;
use crate::policies::{Fault, FaultAction, FaultSite, panic_message};
use crate::subscribers::{Listener, SubscriberId, Trapper};

/// Delivery context of one posted event.
pub(crate) struct Posting {
    id: u64,
    event: Arc<Event>,
    trappers: Vec<Entry<dyn Trapper>>,
    listeners: Vec<Entry<dyn Listener>>,
    next_trapper: usize,
    next_listener: usize,
    trapped: bool,
}

enum Step {
    Trap {
        posting: u64,
        event: Arc<Event>,
        entry: Entry<dyn Trapper>,
    },
    Deliver {
        event: Arc<Event>,
        entry: Entry<dyn Listener>,
    },
}

impl Posting {
    fn new(id: u64, state: &State, event: Event) -> Self {
        Self {
            id,
            trappers: state.trappers.matching(&event),
            listeners: state.listeners.matching(&event),
            event: Arc::new(event),
            next_trapper: 0,
            next_listener: 0,
            trapped: false,
        }
    }

    fn next_step(&mut self) -> Option<Step> {
        if self.trapped {
            return None;
        }
        if let Some(entry) = self.trappers.get(self.next_trapper) {
            self.next_trapper += 1;
            return Some(Step::Trap {
                posting: self.id,
                event: Arc::clone(&self.event),
                entry: entry.clone(),
            });
        }
        let entry = self.listeners.get(self.next_listener)?;
        self.next_listener += 1;
        Some(Step::Deliver {
            event: Arc::clone(&self.event),
            entry: entry.clone(),
        })
    }
}

/// Panic payload already judged fatal by the fault hook, travelling outwards.
struct Propagated(Box<dyn Any + Send>);

impl Router {
    /// Delivers `event` synchronously: trappers first, then listeners.
    ///
    /// May be called from inside a handler; see the module docs for ordering.
    /// If a forwarding agent is installed for the calling thread's
    /// [`ProcessRole`] and accepts the event, it is not dispatched here.
    pub fn post_event(&self, event: Event) {
        let guard = self.state.lock();
        if self.forwarded(&guard, &event) {
            return;
        }

        {
            let mut st = guard.borrow_mut();
            let id = st.next_posting;
            st.next_posting += 1;
            let posting = Posting::new(id, &st, event);
            st.postings.push_back(posting);
            st.depth += 1;
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.drain(&guard)));
        guard.borrow_mut().depth -= 1;
        if let Err(payload) = result {
            Self::rethrow(&guard, payload);
        }
    }

    fn forwarded(&self, guard: &Guard<'_>, event: &Event) -> bool {
        let Some(role) = ProcessRole::current() else {
            return false;
        };
        let agent = guard.borrow().forwards.get(&role).cloned();
        agent.is_some_and(|agent| agent.forward_event(event))
    }

    /// Walks the work-list until every pending posting is finished.
    fn drain(&self, guard: &Guard<'_>) {
        loop {
            let step = {
                let mut st = guard.borrow_mut();
                let Some(front) = st.postings.front_mut() else {
                    return;
                };
                let step = front.next_step();
                match step {
                    Some(step) => step,
                    None => {
                        st.postings.pop_front();
                        continue;
                    }
                }
            };

            match step {
                Step::Trap { posting, event, entry } => {
                    if !guard.borrow().trappers.verify(entry.id, &event) {
                        continue;
                    }
                    if self.trap(guard, &entry, &event) {
                        tracing::trace!(event = %event.name(), trapper = entry.sub.name(), "event trapped");
                        let mut st = guard.borrow_mut();
                        if let Some(p) = st.postings.iter_mut().find(|p| p.id == posting) {
                            p.trapped = true;
                        }
                    }
                }
                Step::Deliver { event, entry } => {
                    if !guard.borrow().listeners.verify(entry.id, &event) {
                        continue;
                    }
                    self.deliver(guard, FaultSite::Listener, &entry, &event);
                }
            }
        }
    }

    fn trap(&self, guard: &Guard<'_>, entry: &Entry<dyn Trapper>, event: &Event) -> bool {
        tracing::trace!(event = %event.name(), trapper = entry.sub.name(), "trap");
        guard.borrow_mut().depth += 1;
        let result = panic::catch_unwind(AssertUnwindSafe(|| entry.sub.trap_event(self, event)));
        guard.borrow_mut().depth -= 1;
        match result {
            Ok(trapped) => trapped,
            Err(payload) => {
                self.fault(guard, FaultSite::Trapper, entry.id, entry.sub.name(), event, payload);
                false
            }
        }
    }

    /// Calls one listener under the fault guard.
    pub(crate) fn deliver(
        &self,
        guard: &Guard<'_>,
        site: FaultSite,
        entry: &Entry<dyn Listener>,
        event: &Event,
    ) {
        tracing::trace!(event = %event.name(), listener = entry.sub.name(), site = site.as_label(), "deliver");
        guard.borrow_mut().depth += 1;
        let result = panic::catch_unwind(AssertUnwindSafe(|| entry.sub.process_event(self, event)));
        guard.borrow_mut().depth -= 1;
        if let Err(payload) = result {
            self.fault(guard, site, entry.id, entry.sub.name(), event, payload);
        }
    }

    /// Reports a caught panic to the fault hook and acts on its verdict.
    fn fault(
        &self,
        guard: &Guard<'_>,
        site: FaultSite,
        id: SubscriberId,
        subscriber: &str,
        event: &Event,
        payload: Box<dyn Any + Send>,
    ) {
        if payload.is::<Propagated>() {
            Self::rethrow(guard, payload);
        }

        let hook = guard.borrow().fault_hook.clone();
        let message = format!(
            "occurred while processing {} by {}: {}",
            event.name(),
            subscriber,
            panic_message(&*payload)
        );
        let action = {
            let fault = Fault {
                site,
                event,
                subscriber,
                id,
                message,
                panic: Some(&*payload),
            };
            hook(&fault)
        };

        if action == FaultAction::Propagate {
            Self::rethrow(guard, Box::new(Propagated(payload)));
        }
    }

    /// Keeps unwinding towards the outermost router frame.
    ///
    /// Inner frames wrap any payload as [`Propagated`] so enclosing `fault()`
    /// calls pass it through instead of blaming their own subscriber. Only
    /// the outermost frame abandons the work-list and resumes the raw payload.
    fn rethrow(guard: &Guard<'_>, payload: Box<dyn Any + Send>) -> ! {
        let outermost = {
            let mut st = guard.borrow_mut();
            if st.depth == 0 {
                st.postings.clear();
            }
            st.depth == 0
        };
        let payload: Box<dyn Any + Send> = match payload.downcast::<Propagated>() {
            Ok(fatal) if outermost => fatal.0,
            Ok(fatal) => fatal,
            Err(other) if outermost => other,
            Err(other) => Box::new(Propagated(other)),
        };
        panic::resume_unwind(payload)
    }

    /// Fires every timer due at the router clock's current time.
    pub fn process_timers(&self) {
        self.process_timers_at(self.now());
    }

    /// Fires every timer due at `now`.
    ///
    /// Each due timer's event goes to its owner directly, then is broadcast
    /// on the `Timer` generator. A repeating timer fires at most once per
    /// call however late the call is; its next due time stays on the
    /// original period grid.
    pub fn process_timers_at(&self, now: u64) {
        let guard = self.state.lock();
        let batch = guard.borrow_mut().timers.advance_due(now);

        for due in batch {
            let Some(live) = guard.borrow().timers.live(due.serial) else {
                continue;
            };
            let event = Event::new(Generator::Timer, live.source, EventType::Status)
                .with_timestamp(now)
                .with_duration(due.due)
                .with_target(live.id);
            let owner = Entry {
                id: live.id,
                sub: live.owner,
            };
            self.deliver(&guard, FaultSite::Timer, &owner, &event);
            self.post_event(event);
        }

        guard.borrow_mut().timers.sweep();
    }
}
