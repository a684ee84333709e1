//! # Timer schedule.
//!
//! Timers are keyed by `(owner, source)` and kept in a `Vec` ordered by next
//! due time. Re-adding an existing key re-arms it in place; the entry is moved
//! with a rotate so the order holds without a full sort.
//!
//! ## Firing a batch
//! ```text
//! advance_due(now)
//!   ├─► split: [due .. | not due ..]
//!   ├─► due repeating:     next += k*delay (first slot after now)
//!   ├─► due non-repeating: next = DEAD
//!   └─► merge due back into the tail by next
//! for each batch item: live(serial)? ── no ──► skip (removed mid-batch)
//! sweep(): drop everything still DEAD
//! ```
//!
//! A non-repeating timer re-added by its own handler is revived (its `next`
//! leaves `DEAD`), so the sweep keeps it.

use std::sync::Arc;

use crate::events::SourceId;
use crate::subscribers::{Listener, SubscriberId};

/// `delay` value that cancels the timer instead of arming it.
pub const TIMER_CANCEL: u64 = u64::MAX;

/// Marks a fired non-repeating timer awaiting the sweep.
const DEAD: u64 = u64::MAX;

/// Public view of one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerInfo {
    /// Listener that receives the timer.
    pub owner: SubscriberId,
    /// Timer source id, chosen by the owner.
    pub source: SourceId,
    /// Period / delay in ms.
    pub delay_ms: u64,
    /// Re-arms after firing.
    pub repeat: bool,
    /// Absolute due time in ms.
    pub next_ms: u64,
}

struct TimerEntry {
    serial: u64,
    id: SubscriberId,
    owner: Arc<dyn Listener>,
    source: SourceId,
    delay: u64,
    repeat: bool,
    next: u64,
}

impl TimerEntry {
    fn info(&self) -> TimerInfo {
        TimerInfo {
            owner: self.id,
            source: self.source,
            delay_ms: self.delay,
            repeat: self.repeat,
            next_ms: self.next,
        }
    }
}

/// A timer picked for firing: identity plus the time it was due.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Due {
    pub(crate) serial: u64,
    pub(crate) due: u64,
}

/// Owner and source of a still-scheduled timer.
pub(crate) struct Live {
    pub(crate) id: SubscriberId,
    pub(crate) owner: Arc<dyn Listener>,
    pub(crate) source: SourceId,
}

/// Ordered timer schedule.
pub(crate) struct TimerSet {
    entries: Vec<TimerEntry>,
    next_serial: u64,
}

impl TimerSet {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_serial: 0,
        }
    }

    /// Number of armed timers; fired one-shots awaiting the sweep are not counted.
    pub(crate) fn len(&self) -> usize {
        self.entries.partition_point(|e| e.next != DEAD)
    }

    fn position(&self, id: SubscriberId, source: SourceId) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.id == id && e.source == source)
    }

    /// Arms (or re-arms) the `(owner, source)` timer to fire at `now + delay`.
    ///
    /// Returns `true` if a new timer was created.
    pub(crate) fn upsert(
        &mut self,
        owner: Arc<dyn Listener>,
        source: SourceId,
        delay: u64,
        repeat: bool,
        now: u64,
    ) -> bool {
        let id = SubscriberId::of(&owner);
        let next = now.saturating_add(delay).min(DEAD - 1);

        let Some(idx) = self.position(id, source) else {
            let serial = self.next_serial;
            self.next_serial += 1;
            let at = self.entries.partition_point(|e| e.next <= next);
            self.entries.insert(
                at,
                TimerEntry {
                    serial,
                    id,
                    owner,
                    source,
                    delay,
                    repeat,
                    next,
                },
            );
            return true;
        };

        let entry = &mut self.entries[idx];
        entry.delay = delay;
        entry.repeat = repeat;
        entry.next = next;
        self.reposition(idx);
        false
    }

    /// Restores order after `entries[idx].next` changed.
    fn reposition(&mut self, idx: usize) {
        let next = self.entries[idx].next;
        if idx > 0 && self.entries[idx - 1].next > next {
            let at = self.entries[..idx].partition_point(|e| e.next <= next);
            self.entries[at..=idx].rotate_right(1);
        } else if idx + 1 < self.entries.len() && self.entries[idx + 1].next < next {
            let at = idx + 1 + self.entries[idx + 1..].partition_point(|e| e.next < next);
            self.entries[idx..at].rotate_left(1);
        }
    }

    pub(crate) fn remove(&mut self, id: SubscriberId, source: SourceId) -> bool {
        match self.position(id, source) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Removes every timer of `id`; returns how many were dropped.
    pub(crate) fn remove_owner(&mut self, id: SubscriberId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        before - self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Earliest due time among armed timers.
    pub(crate) fn next_due(&self) -> Option<u64> {
        self.entries.first().map(|e| e.next).filter(|n| *n != DEAD)
    }

    /// Earliest-due timer of `id` (optionally restricted to one source).
    pub(crate) fn info(&self, id: SubscriberId, source: Option<SourceId>) -> Option<TimerInfo> {
        self.entries
            .iter()
            .filter(|e| e.next != DEAD)
            .find(|e| e.id == id && source.is_none_or(|s| s == e.source))
            .map(TimerEntry::info)
    }

    /// Finds the listener object registered under `id`, if it owns a timer.
    pub(crate) fn owner(&self, id: SubscriberId) -> Option<Arc<dyn Listener>> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| Arc::clone(&e.owner))
    }

    /// Picks every timer due at `now` and advances them for the next round.
    pub(crate) fn advance_due(&mut self, now: u64) -> Vec<Due> {
        let split = self
            .entries
            .partition_point(|e| e.next <= now && e.next != DEAD);
        if split == 0 {
            return Vec::new();
        }

        let mut batch = Vec::with_capacity(split);
        for e in &mut self.entries[..split] {
            batch.push(Due {
                serial: e.serial,
                due: e.next,
            });
            e.next = if !e.repeat {
                DEAD
            } else if e.delay == 0 {
                now.saturating_add(1).min(DEAD - 1)
            } else {
                // Skip missed periods but stay phase-locked to the original schedule.
                let missed = (now - e.next) / e.delay + 1;
                e.next
                    .saturating_add(missed.saturating_mul(e.delay))
                    .min(DEAD - 1)
            };
        }

        let tail = self.entries.split_off(split);
        let mut head = std::mem::take(&mut self.entries);
        head.sort_by_key(|e| e.next);
        self.entries = merge_by_next(head, tail);
        batch
    }

    /// Owner of a batch item if it is still scheduled.
    pub(crate) fn live(&self, serial: u64) -> Option<Live> {
        self.entries.iter().find(|e| e.serial == serial).map(|e| Live {
            id: e.id,
            owner: Arc::clone(&e.owner),
            source: e.source,
        })
    }

    /// Drops fired non-repeating timers that were not revived.
    pub(crate) fn sweep(&mut self) {
        let keep = self.entries.partition_point(|e| e.next != DEAD);
        self.entries.truncate(keep);
    }

    #[cfg(test)]
    fn is_ordered(&self) -> bool {
        self.entries.windows(2).all(|w| w[0].next <= w[1].next)
    }
}

/// Stable merge of two `next`-ordered runs; ties keep `a` first.
fn merge_by_next(a: Vec<TimerEntry>, b: Vec<TimerEntry>) -> Vec<TimerEntry> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let mut a = a.into_iter().peekable();
    let mut b = b.into_iter().peekable();
    loop {
        let take_a = match (a.peek(), b.peek()) {
            (Some(x), Some(y)) => x.next <= y.next,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_a { a.next() } else { b.next() };
        out.extend(next);
    }
    out
}
