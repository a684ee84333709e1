//! # Closure-backed subscribers (`ListenerFn`, `TrapperFn`)
//!
//! Wrap a closure so small components (and tests) don't need a dedicated type.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use erouter::{Event, Listener, ListenerFn, Router, Trapper, TrapperFn};
//!
//! let l = ListenerFn::arc("printer", |_r: &Router, ev: &Event| println!("{}", ev.name()));
//! let t = TrapperFn::arc("mute", |_r: &Router, _ev: &Event| true);
//!
//! assert_eq!(l.name(), "printer");
//! assert_eq!(t.name(), "mute");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::core::Router;
use crate::events::Event;
use crate::subscribers::{Listener, Trapper};

/// Function-backed listener.
pub struct ListenerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ListenerFn<F>
where
    F: Fn(&Router, &Event) + Send + Sync + 'static,
{
    /// Creates a new function-backed listener.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    /// Creates the listener and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F> Listener for ListenerFn<F>
where
    F: Fn(&Router, &Event) + Send + Sync + 'static,
{
    fn process_event(&self, router: &Router, event: &Event) {
        (self.f)(router, event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for ListenerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerFn").field("name", &self.name).finish()
    }
}

/// Function-backed trapper.
pub struct TrapperFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TrapperFn<F>
where
    F: Fn(&Router, &Event) -> bool + Send + Sync + 'static,
{
    /// Creates a new function-backed trapper.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    /// Creates the trapper and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F> Trapper for TrapperFn<F>
where
    F: Fn(&Router, &Event) -> bool + Send + Sync + 'static,
{
    fn trap_event(&self, router: &Router, event: &Event) -> bool {
        (self.f)(router, event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for TrapperFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrapperFn").field("name", &self.name).finish()
    }
}
