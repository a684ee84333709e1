//! # Router: the public face of the event engine.
//!
//! One [`Router`] owns the listener and trapper registries, the timer
//! schedule, the in-flight delivery work-list and the deferred queue. All of
//! it sits behind a single re-entrant lock, so:
//!
//! - any thread may post, subscribe or fire timers;
//! - a handler may call back into the router (post, subscribe, unsubscribe,
//!   arm timers) without deadlocking;
//! - one top-level delivery, including everything it triggers, runs at a
//!   time process-wide.
//!
//! ## Architecture
//! ```text
//! post_event ──► dispatch (trappers ─► listeners) ──► handlers ──┐
//!      ▲                                                           │ re-entrant calls
//!      ├──────────── notifier (activate/status/deactivate) ◄── add_* / remove_*
//!      └──────────── process_timers (owner first, then broadcast)
//!
//! queue_event (any thread) ──► EventQueue ──► process_queue / TimerDriver
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::core::builder::RouterBuilder;
use crate::core::clock::Clock;
use crate::core::config::RouterConfig;
use crate::core::dispatch::Posting;
use crate::core::registry::{Entry, Filter, SubscriptionMap};
use crate::core::timers::{TIMER_CANCEL, TimerInfo, TimerSet};
use crate::error::RouterError;
use crate::events::{Event, EventQueue, EventType, Generator, SourceId};
use crate::forwarding::{ForwardingAgent, ProcessRole};
use crate::policies::FaultHook;
use crate::subscribers::{Listener, SubscriberId, Trapper};

pub(crate) type Guard<'a> = ReentrantMutexGuard<'a, RefCell<State>>;

/// Everything protected by the router lock.
pub(crate) struct State {
    pub(crate) listeners: SubscriptionMap<dyn Listener>,
    pub(crate) trappers: SubscriptionMap<dyn Trapper>,
    pub(crate) timers: TimerSet,
    /// In-flight deliveries, front = currently being walked.
    pub(crate) postings: VecDeque<Posting>,
    pub(crate) next_posting: u64,
    /// Nesting of active `post_event` frames and subscriber calls.
    pub(crate) depth: usize,
    pub(crate) forwards: HashMap<ProcessRole, Arc<dyn ForwardingAgent>>,
    pub(crate) fault_hook: FaultHook,
}

impl State {
    /// True if `generator` has at least one trapper or listener.
    pub(crate) fn has_subscribers(&self, generator: Generator) -> bool {
        let filter = Filter::Generator(generator);
        self.listeners.has_mapping(filter) || self.trappers.has_mapping(filter)
    }
}

/// Synchronous, re-entrant event router.
///
/// Build one with [`Router::builder`] and share it as `Arc<Router>`; handlers
/// receive `&Router` for re-entrant calls.
pub struct Router {
    pub(crate) state: ReentrantMutex<RefCell<State>>,
    queue: Arc<EventQueue>,
    clock: Arc<dyn Clock>,
    cfg: RouterConfig,
}

impl Router {
    /// Starts building a router with the given configuration.
    pub fn builder(cfg: RouterConfig) -> RouterBuilder {
        RouterBuilder::new(cfg)
    }

    pub(crate) fn new_internal(cfg: RouterConfig, clock: Arc<dyn Clock>, fault_hook: FaultHook) -> Self {
        let queue = Arc::new(EventQueue::new(cfg.queue_limit()));
        Self {
            state: ReentrantMutex::new(RefCell::new(State {
                listeners: SubscriptionMap::new(),
                trappers: SubscriptionMap::new(),
                timers: TimerSet::new(),
                postings: VecDeque::new(),
                next_posting: 0,
                depth: 0,
                forwards: HashMap::new(),
                fault_hook,
            })),
            queue,
            clock,
            cfg,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.cfg
    }

    /// Current router time (ms).
    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Deferred queue shared with [`QueueForwarder`](crate::QueueForwarder)s.
    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    // ---- posting ----

    /// Creates an event stamped with the router clock instead of the process
    /// clock [`Event::new`] uses. Pass it to [`post_event`](Self::post_event)
    /// or [`queue_event`](Self::queue_event) after adding any builder fields.
    pub fn event(&self, generator: Generator, source: SourceId, kind: EventType) -> Event {
        Event::new(generator, source, kind).with_timestamp(self.now())
    }

    /// Creates and posts an event stamped with the router clock.
    pub fn post(&self, generator: Generator, source: SourceId, kind: EventType) {
        self.post_event(self.event(generator, source, kind));
    }

    /// Creates and posts an event with an explicit timestamp.
    pub fn post_at(&self, generator: Generator, source: SourceId, kind: EventType, timestamp: u64) {
        self.post_event(Event::new(generator, source, kind).with_timestamp(timestamp));
    }

    /// Queues an event for later dispatch. Safe to call from any thread
    /// without taking the router lock.
    pub fn queue_event(&self, event: Event) -> Result<(), RouterError> {
        self.queue.push(event).inspect_err(|err| {
            tracing::warn!(reason = err.as_label(), "deferred event dropped");
        })
    }

    /// Like [`queue_event`](Self::queue_event), but first drops queued events
    /// from the same generator and source.
    pub fn requeue_event(&self, event: Event) -> Result<(), RouterError> {
        self.queue.replace(event).inspect_err(|err| {
            tracing::warn!(reason = err.as_label(), "deferred event dropped");
        })
    }

    /// Posts everything currently queued, in FIFO order. Returns how many.
    pub fn process_queue(&self) -> usize {
        let events = self.queue.drain();
        let n = events.len();
        for event in events {
            self.post_event(event);
        }
        n
    }

    // ---- listeners ----

    /// Subscribes `listener` to the events covered by `filter`.
    ///
    /// Subscribing twice delivers twice.
    pub fn add_listener(&self, listener: Arc<dyn Listener>, filter: impl Into<Filter>) {
        let filter = filter.into();
        let guard = self.state.lock();
        let had = {
            let mut st = guard.borrow_mut();
            let had = st.has_subscribers(filter.generator());
            st.listeners.add(Entry::new(listener), filter);
            had
        };
        self.subscribed(filter.generator(), had);
    }

    /// Removes `id`'s listener subscriptions covered by `filter`.
    ///
    /// Returns `false` (and announces nothing) if there was nothing to remove.
    pub fn remove_listener(&self, id: SubscriberId, filter: impl Into<Filter>) -> bool {
        let filter = filter.into();
        let guard = self.state.lock();
        let removed = guard.borrow_mut().listeners.remove(id, filter);
        if removed {
            self.unsubscribed(filter.generator());
        }
        removed
    }

    /// Removes every listener subscription of `id`.
    pub fn remove_listener_all(&self, id: SubscriberId) -> bool {
        let guard = self.state.lock();
        let touched = guard.borrow_mut().listeners.remove_everywhere(id);
        for g in &touched {
            self.unsubscribed(*g);
        }
        !touched.is_empty()
    }

    /// Removes every listener subscription and every timer of `id`.
    ///
    /// Trapper subscriptions are left alone.
    pub fn remove(&self, id: SubscriberId) {
        let guard = self.state.lock();
        self.remove_listener_all(id);
        let timers = guard.borrow_mut().timers.remove_owner(id);
        if timers > 0 {
            tracing::debug!(?id, timers, "timers removed with listener");
        }
    }

    /// True if any trapper or listener would see at least some events matching `filter`.
    pub fn has_listeners(&self, filter: impl Into<Filter>) -> bool {
        let filter = filter.into();
        let guard = self.state.lock();
        let st = guard.borrow();
        st.listeners.has_mapping(filter) || st.trappers.has_mapping(filter)
    }

    /// True if listener `id` would receive `event`.
    pub fn is_listening(&self, id: SubscriberId, event: &Event) -> bool {
        self.state.lock().borrow().listeners.verify(id, event)
    }

    /// True if listener `id` receives at least some events matching `filter`.
    pub fn is_listening_any(&self, id: SubscriberId, filter: impl Into<Filter>) -> bool {
        self.state.lock().borrow().listeners.verify_any(id, filter.into())
    }

    /// True if listener `id` receives every event matching `filter`.
    pub fn is_listening_all(&self, id: SubscriberId, filter: impl Into<Filter>) -> bool {
        self.state.lock().borrow().listeners.verify_all(id, filter.into())
    }

    // ---- trappers ----

    /// Subscribes `trapper` to the events covered by `filter`.
    pub fn add_trapper(&self, trapper: Arc<dyn Trapper>, filter: impl Into<Filter>) {
        let filter = filter.into();
        let guard = self.state.lock();
        let had = {
            let mut st = guard.borrow_mut();
            let had = st.has_subscribers(filter.generator());
            st.trappers.add(Entry::new(trapper), filter);
            had
        };
        self.subscribed(filter.generator(), had);
    }

    /// Subscribes `trapper` to every generator.
    pub fn add_trapper_all(&self, trapper: Arc<dyn Trapper>) {
        let _guard = self.state.lock();
        for g in Generator::ALL {
            self.add_trapper(Arc::clone(&trapper), *g);
        }
    }

    /// Removes `id`'s trapper subscriptions covered by `filter`.
    pub fn remove_trapper(&self, id: SubscriberId, filter: impl Into<Filter>) -> bool {
        let filter = filter.into();
        let guard = self.state.lock();
        let removed = guard.borrow_mut().trappers.remove(id, filter);
        if removed {
            self.unsubscribed(filter.generator());
        }
        removed
    }

    /// Removes every trapper subscription of `id`.
    pub fn remove_trapper_all(&self, id: SubscriberId) -> bool {
        let guard = self.state.lock();
        let touched = guard.borrow_mut().trappers.remove_everywhere(id);
        for g in &touched {
            self.unsubscribed(*g);
        }
        !touched.is_empty()
    }

    /// True if trapper `id` would be consulted for `event`.
    pub fn is_trapping(&self, id: SubscriberId, event: &Event) -> bool {
        self.state.lock().borrow().trappers.verify(id, event)
    }

    /// True if trapper `id` sees at least some events matching `filter`.
    pub fn is_trapping_any(&self, id: SubscriberId, filter: impl Into<Filter>) -> bool {
        self.state.lock().borrow().trappers.verify_any(id, filter.into())
    }

    /// True if trapper `id` sees every event matching `filter`.
    pub fn is_trapping_all(&self, id: SubscriberId, filter: impl Into<Filter>) -> bool {
        self.state.lock().borrow().trappers.verify_all(id, filter.into())
    }

    // ---- timers ----

    /// Arms a timer for `owner` that fires `delay_ms` from now.
    ///
    /// Re-adding an existing `(owner, source)` pair re-arms it. A delay of
    /// [`TIMER_CANCEL`] removes the timer instead.
    pub fn add_timer(&self, owner: Arc<dyn Listener>, source: SourceId, delay_ms: u64, repeat: bool) {
        let id = SubscriberId::of(&owner);
        if delay_ms == TIMER_CANCEL {
            self.remove_timer(id, source);
            return;
        }
        let now = self.now();
        let guard = self.state.lock();
        let created = guard
            .borrow_mut()
            .timers
            .upsert(owner, source, delay_ms, repeat, now);
        tracing::debug!(?id, source, delay_ms, repeat, created, "timer armed");
    }

    /// Arms a timer for a listener the router already knows (subscribed or
    /// owning another timer). Handy inside a handler, which only has `&self`.
    ///
    /// Returns `false` if `id` is unknown.
    pub fn add_timer_by_id(&self, id: SubscriberId, source: SourceId, delay_ms: u64, repeat: bool) -> bool {
        if delay_ms == TIMER_CANCEL {
            return self.remove_timer(id, source);
        }
        let guard = self.state.lock();
        let owner = {
            let st = guard.borrow();
            st.timers.owner(id).or_else(|| st.listeners.lookup(id))
        };
        match owner {
            Some(owner) => {
                self.add_timer(owner, source, delay_ms, repeat);
                true
            }
            None => false,
        }
    }

    /// Arms a timer using `event`'s source and duration.
    pub fn add_timer_for(&self, owner: Arc<dyn Listener>, event: &Event, repeat: bool) {
        self.add_timer(owner, event.source, event.duration, repeat);
    }

    /// Cancels one timer.
    pub fn remove_timer(&self, id: SubscriberId, source: SourceId) -> bool {
        let removed = self.state.lock().borrow_mut().timers.remove(id, source);
        if removed {
            tracing::debug!(?id, source, "timer removed");
        }
        removed
    }

    /// Cancels the timer that produced `event` (no-op for non-timer events).
    pub fn remove_timer_for(&self, id: SubscriberId, event: &Event) -> bool {
        event.generator == Generator::Timer && self.remove_timer(id, event.source)
    }

    /// Cancels every timer of `id`; returns how many.
    pub fn remove_timers(&self, id: SubscriberId) -> usize {
        self.state.lock().borrow_mut().timers.remove_owner(id)
    }

    /// Cancels all timers.
    pub fn remove_all_timers(&self) {
        self.state.lock().borrow_mut().timers.clear();
    }

    /// Earliest time any timer is due.
    pub fn next_timer(&self) -> Option<u64> {
        self.state.lock().borrow().timers.next_due()
    }

    /// Earliest-due timer of `id`, optionally for one source only.
    pub fn next_timer_info(&self, id: SubscriberId, source: Option<SourceId>) -> Option<TimerInfo> {
        self.state.lock().borrow().timers.info(id, source)
    }

    /// Number of scheduled timers.
    pub fn timer_count(&self) -> usize {
        self.state.lock().borrow().timers.len()
    }

    // ---- misc ----

    /// Installs (or with `None`, removes) the forwarding agent for `role`.
    ///
    /// Returns the previously installed agent.
    pub fn set_forwarding_agent(
        &self,
        role: ProcessRole,
        agent: Option<Arc<dyn ForwardingAgent>>,
    ) -> Option<Arc<dyn ForwardingAgent>> {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        match agent {
            Some(agent) => st.forwards.insert(role, agent),
            None => st.forwards.remove(&role),
        }
    }

    /// Replaces the fault hook; returns the previous one.
    pub fn set_fault_hook(&self, hook: FaultHook) -> FaultHook {
        let guard = self.state.lock();
        std::mem::replace(&mut guard.borrow_mut().fault_hook, hook)
    }

    /// Drops every listener, trapper and timer without announcing anything.
    pub fn reset(&self) {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        st.listeners.clear();
        st.trappers.clear();
        st.timers.clear();
        tracing::debug!("router reset");
    }

    /// Generators that currently have listeners (sorted).
    pub fn listened_generators(&self) -> Vec<Generator> {
        self.state.lock().borrow().listeners.generators()
    }
}
