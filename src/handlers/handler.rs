//! # Function-backed handlers (`Handler`)
//!
//! [`Handler`] wraps a closure `F: Fn(&Event) -> HandlerResult` behind an `Rc`.
//! Cloning a handler is cheap and keeps its identity: every clone carries the same
//! process-unique id, which is what `unsubscribe_from` compares.
//!
//! Handlers needing mutable state should keep it in `Cell`/`RefCell` inside the closure.
//!
//! ## Example
//! ```rust
//! use eventspace::{Flow, Handler};
//!
//! let h = Handler::named("audit", |ev| {
//!     let _ = ev.event_name();
//!     Ok(Flow::Continue)
//! });
//! let same = h.clone();
//!
//! assert_eq!(h, same);
//! assert_eq!(h.name(), "audit");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use futures::future::{FutureExt, LocalBoxFuture};

use crate::error::EventError;
use crate::events::Event;

/// Global counter for handler identities.
static HANDLER_SEQ: AtomicU64 = AtomicU64::new(1);

/// Value returned by every handler.
pub type HandlerResult = Result<Flow, EventError>;

type HandlerFn = dyn Fn(&Event) -> HandlerResult;

/// Instruction from a handler to the dispatcher.
pub enum Flow {
    /// Keep going: remaining handlers run and the event keeps bubbling.
    Continue,
    /// Stop: remaining handlers in this bucket are skipped and bubbling ends.
    Stop,
    /// Keep going, but the handler still has an asynchronous tail.
    ///
    /// The event stays on the causal stack until the future completes, so events
    /// spawned from the tail still see it as their `original_event`.
    ///
    /// # Settling
    /// Tails only run inside [`EventSpace::settle_deferred`](crate::EventSpace::settle_deferred),
    /// and the caller must drive it. Until a tail settles, its event stays the
    /// causal top, so every event spawned outside a handler inherits it as
    /// `original_event`. A tail that captures its space keeps that space alive
    /// while it is pending.
    Defer(LocalBoxFuture<'static, ()>),
}

impl Flow {
    /// Wraps a future into [`Flow::Defer`].
    pub fn defer<F>(fut: F) -> Self
    where
        F: Future<Output = ()> + 'static,
    {
        Flow::Defer(fut.boxed_local())
    }

    /// True for [`Flow::Stop`].
    #[inline]
    pub fn is_stop(&self) -> bool {
        matches!(self, Flow::Stop)
    }
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Continue => f.write_str("Continue"),
            Flow::Stop => f.write_str("Stop"),
            Flow::Defer(_) => f.write_str("Defer(..)"),
        }
    }
}

/// Shared, identity-carrying event handler.
#[derive(Clone)]
pub struct Handler {
    id: u64,
    name: Cow<'static, str>,
    f: Rc<HandlerFn>,
}

impl Handler {
    /// Creates an anonymous handler.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Event) -> HandlerResult + 'static,
    {
        Self::named("handler", f)
    }

    /// Creates a handler with a name used in log records.
    pub fn named<F>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&Event) -> HandlerResult + 'static,
    {
        Self::with_id(next_handler_id(), name, f)
    }

    /// Creates a handler with a pre-allocated id.
    ///
    /// Wrappers use this to know their own identity before they exist, so they
    /// can unsubscribe themselves.
    pub(crate) fn with_id<F>(id: u64, name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&Event) -> HandlerResult + 'static,
    {
        Self {
            id,
            name: name.into(),
            f: Rc::new(f),
        }
    }

    /// Identity shared by all clones of this handler.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Name used in log records.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the handler.
    #[inline]
    pub fn call(&self, event: &Event) -> HandlerResult {
        (self.f)(event)
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Handler {}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Allocates a fresh handler id.
pub(crate) fn next_handler_id() -> u64 {
    HANDLER_SEQ.fetch_add(1, AtomicOrdering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_identity() {
        let a = Handler::new(|_| Ok(Flow::Continue));
        let b = Handler::new(|_| Ok(Flow::Continue));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_flow_debug_and_stop() {
        assert!(Flow::Stop.is_stop());
        assert!(!Flow::Continue.is_stop());
        assert_eq!(format!("{:?}", Flow::defer(async {})), "Defer(..)");
    }
}
