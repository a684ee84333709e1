//! # Subscription registry.
//!
//! One [`SubscriptionMap`] stores listeners, another stores trappers. Both are
//! keyed the same way:
//!
//! ```text
//! Generator ─┬─► all:      [sub, sub, ...]                 (every event of the generator)
//!            └─► filtered: EventType ─► SourceId ─► [sub, ...]
//! ```
//!
//! ## Rules
//! - Buckets keep insertion order; duplicates are allowed and deliver twice.
//! - Empty buckets are pruned immediately, so "has a mapping" is a plain
//!   key lookup.
//! - Subscriptions are cloned out as [`Entry`] snapshots for delivery; the
//!   liveness re-check ([`SubscriptionMap::verify`]) is what makes mid-cascade
//!   removal take effect.

use std::collections::HashMap;
use std::sync::Arc;

use crate::events::{Event, EventType, Generator, SourceId};
use crate::subscribers::SubscriberId;

/// Which events a subscription covers.
///
/// Built from a generator, a `(generator, source)` pair, a
/// `(generator, source, type)` triple, or an existing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    /// Every event of a generator.
    Generator(Generator),
    /// Every type from one source.
    Source(Generator, SourceId),
    /// One exact (generator, source, type).
    Exact(Generator, SourceId, EventType),
}

impl Filter {
    /// Generator this filter belongs to.
    pub fn generator(&self) -> Generator {
        match *self {
            Filter::Generator(g) | Filter::Source(g, _) | Filter::Exact(g, _, _) => g,
        }
    }
}

impl From<Generator> for Filter {
    fn from(g: Generator) -> Self {
        Filter::Generator(g)
    }
}

impl From<(Generator, SourceId)> for Filter {
    fn from((g, sid): (Generator, SourceId)) -> Self {
        Filter::Source(g, sid)
    }
}

impl From<(Generator, SourceId, EventType)> for Filter {
    fn from((g, sid, ty): (Generator, SourceId, EventType)) -> Self {
        Filter::Exact(g, sid, ty)
    }
}

impl From<&Event> for Filter {
    fn from(e: &Event) -> Self {
        Filter::Exact(e.generator, e.source, e.kind)
    }
}

/// One stored subscription.
pub(crate) struct Entry<T: ?Sized> {
    pub(crate) id: SubscriberId,
    pub(crate) sub: Arc<T>,
}

impl<T: ?Sized> Entry<T> {
    pub(crate) fn new(sub: Arc<T>) -> Self {
        Self {
            id: SubscriberId::of(&sub),
            sub,
        }
    }
}

impl<T: ?Sized> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            sub: Arc::clone(&self.sub),
        }
    }
}

struct Category<T: ?Sized> {
    all: Vec<Entry<T>>,
    filtered: HashMap<EventType, HashMap<SourceId, Vec<Entry<T>>>>,
}

impl<T: ?Sized> Category<T> {
    fn new() -> Self {
        Self {
            all: Vec::new(),
            filtered: HashMap::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.all.is_empty() && self.filtered.is_empty()
    }

    fn bucket(&self, sid: SourceId, ty: EventType) -> &[Entry<T>] {
        self.filtered
            .get(&ty)
            .and_then(|by_src| by_src.get(&sid))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Removes `id` from one filtered bucket, pruning empties.
    fn remove_filtered(&mut self, id: SubscriberId, sid: SourceId, ty: EventType) -> bool {
        let Some(by_src) = self.filtered.get_mut(&ty) else {
            return false;
        };
        let Some(list) = by_src.get_mut(&sid) else {
            return false;
        };
        let before = list.len();
        list.retain(|e| e.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            by_src.remove(&sid);
        }
        if by_src.is_empty() {
            self.filtered.remove(&ty);
        }
        removed
    }

    /// Removes `id` from the all-list and every filtered bucket.
    fn remove_everywhere(&mut self, id: SubscriberId) -> bool {
        let before = self.all.len();
        self.all.retain(|e| e.id != id);
        let mut removed = self.all.len() != before;

        self.filtered.retain(|_, by_src| {
            by_src.retain(|_, list| {
                let n = list.len();
                list.retain(|e| e.id != id);
                removed |= list.len() != n;
                !list.is_empty()
            });
            !by_src.is_empty()
        });
        removed
    }

    fn in_all(&self, id: SubscriberId) -> bool {
        self.all.iter().any(|e| e.id == id)
    }
}

/// Category-indexed store of subscriptions of one kind.
pub(crate) struct SubscriptionMap<T: ?Sized> {
    categories: HashMap<Generator, Category<T>>,
}

impl<T: ?Sized> SubscriptionMap<T> {
    pub(crate) fn new() -> Self {
        Self {
            categories: HashMap::new(),
        }
    }

    /// Appends a subscription covering `filter`.
    pub(crate) fn add(&mut self, entry: Entry<T>, filter: Filter) {
        let cat = self
            .categories
            .entry(filter.generator())
            .or_insert_with(Category::new);
        match filter {
            Filter::Generator(_) => cat.all.push(entry),
            Filter::Source(_, sid) => {
                for ty in EventType::ALL {
                    cat.filtered
                        .entry(ty)
                        .or_default()
                        .entry(sid)
                        .or_default()
                        .push(entry.clone());
                }
            }
            Filter::Exact(_, sid, ty) => cat
                .filtered
                .entry(ty)
                .or_default()
                .entry(sid)
                .or_default()
                .push(entry),
        }
    }

    /// Removes every matching subscription of `id` covered by `filter`.
    ///
    /// A generator-wide removal also drops the subscriber's source-specific
    /// buckets in that generator.
    pub(crate) fn remove(&mut self, id: SubscriberId, filter: Filter) -> bool {
        let g = filter.generator();
        let Some(cat) = self.categories.get_mut(&g) else {
            return false;
        };
        let removed = match filter {
            Filter::Generator(_) => cat.remove_everywhere(id),
            Filter::Source(_, sid) => EventType::ALL
                .iter()
                .fold(false, |acc, ty| cat.remove_filtered(id, sid, *ty) | acc),
            Filter::Exact(_, sid, ty) => cat.remove_filtered(id, sid, ty),
        };
        if cat.is_empty() {
            self.categories.remove(&g);
        }
        removed
    }

    /// Removes `id` from every generator; returns the generators it was
    /// actually removed from.
    pub(crate) fn remove_everywhere(&mut self, id: SubscriberId) -> Vec<Generator> {
        let mut touched = Vec::new();
        self.categories.retain(|g, cat| {
            if cat.remove_everywhere(id) {
                touched.push(*g);
            }
            !cat.is_empty()
        });
        touched.sort();
        touched
    }

    /// Generators that currently have at least one subscription.
    pub(crate) fn generators(&self) -> Vec<Generator> {
        let mut gens: Vec<_> = self.categories.keys().copied().collect();
        gens.sort();
        gens
    }

    pub(crate) fn clear(&mut self) {
        self.categories.clear();
    }

    /// Finds the subscriber object registered under `id`, anywhere.
    pub(crate) fn lookup(&self, id: SubscriberId) -> Option<Arc<T>> {
        self.categories
            .values()
            .flat_map(|cat| {
                cat.all
                    .iter()
                    .chain(cat.filtered.values().flat_map(|s| s.values().flatten()))
            })
            .find(|e| e.id == id)
            .map(|e| Arc::clone(&e.sub))
    }

    /// True if anything would receive at least some event matching `filter`.
    pub(crate) fn has_mapping(&self, filter: Filter) -> bool {
        let Some(cat) = self.categories.get(&filter.generator()) else {
            return false;
        };
        match filter {
            Filter::Generator(_) => true,
            Filter::Source(_, sid) => {
                !cat.all.is_empty()
                    || cat.filtered.values().any(|by_src| by_src.contains_key(&sid))
            }
            Filter::Exact(_, sid, ty) => !cat.all.is_empty() || !cat.bucket(sid, ty).is_empty(),
        }
    }

    /// Snapshot of everything `event` is delivered to: the source-specific
    /// bucket first, then the generator-wide list.
    pub(crate) fn matching(&self, event: &Event) -> Vec<Entry<T>> {
        let Some(cat) = self.categories.get(&event.generator) else {
            return Vec::new();
        };
        let bucket = cat.bucket(event.source, event.kind);
        let mut out = Vec::with_capacity(bucket.len() + cat.all.len());
        out.extend(bucket.iter().cloned());
        out.extend(cat.all.iter().cloned());
        out
    }

    /// True if `id` would still receive `event`.
    pub(crate) fn verify(&self, id: SubscriberId, event: &Event) -> bool {
        let Some(cat) = self.categories.get(&event.generator) else {
            return false;
        };
        cat.in_all(id) || cat.bucket(event.source, event.kind).iter().any(|e| e.id == id)
    }

    /// True if `id` receives at least some events matching `filter`.
    pub(crate) fn verify_any(&self, id: SubscriberId, filter: Filter) -> bool {
        let Some(cat) = self.categories.get(&filter.generator()) else {
            return false;
        };
        if cat.in_all(id) {
            return true;
        }
        match filter {
            Filter::Generator(_) => cat
                .filtered
                .values()
                .flat_map(|by_src| by_src.values())
                .any(|list| list.iter().any(|e| e.id == id)),
            Filter::Source(_, sid) => EventType::ALL
                .iter()
                .any(|ty| cat.bucket(sid, *ty).iter().any(|e| e.id == id)),
            Filter::Exact(_, sid, ty) => cat.bucket(sid, ty).iter().any(|e| e.id == id),
        }
    }

    /// True if `id` receives every event matching `filter`.
    pub(crate) fn verify_all(&self, id: SubscriberId, filter: Filter) -> bool {
        let Some(cat) = self.categories.get(&filter.generator()) else {
            return false;
        };
        if cat.in_all(id) {
            return true;
        }
        match filter {
            // Source buckets can never cover unseen sources.
            Filter::Generator(_) => false,
            Filter::Source(_, sid) => EventType::ALL
                .iter()
                .all(|ty| cat.bucket(sid, *ty).iter().any(|e| e.id == id)),
            Filter::Exact(_, sid, ty) => cat.bucket(sid, ty).iter().any(|e| e.id == id),
        }
    }

    /// True if no empty bucket or empty category is stored.
    #[cfg(test)]
    pub(crate) fn is_pruned(&self) -> bool {
        self.categories.values().all(|cat| {
            !cat.is_empty()
                && cat
                    .filtered
                    .values()
                    .all(|by_src| !by_src.is_empty() && by_src.values().all(|l| !l.is_empty()))
        })
    }
}
