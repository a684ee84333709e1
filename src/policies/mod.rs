//! Fault policies.
//!
//! This module groups the knobs that decide **what happens** when a
//! subscriber fails during delivery.
//!
//! ## Contents
//! - [`FaultHook`] the installed callback (one per router)
//! - [`Fault`] / [`FaultSite`] the context handed to it
//! - [`FaultAction`] its decision (continue / propagate)
//!
//! ## Quick wiring
//! ```text
//! RouterBuilder::with_fault_hook(hook)
//!      └─► core::dispatch wraps every subscriber call in catch_unwind
//!           └─► on panic: hook(&Fault) → Continue | Propagate
//! ```
//!
//! ## Defaults
//! - [`log_and_continue`]: `error!` log, other subscribers unaffected.

mod fault;

pub(crate) use fault::panic_message;
pub use fault::{Fault, FaultAction, FaultHook, FaultSite, log_and_continue};
