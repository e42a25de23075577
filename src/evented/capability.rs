//! Capability traits for components that own an [`Evented`].
//!
//! A component embeds an [`Evented`] and opts into what it can do with it:
//! `Subscribable` to listen at its own address, `Bubbling` to raise events from
//! it, `Broadcastable` to fan events out below it. Every method is provided;
//! implementors only say where their `Evented` lives.
//!
//! ```rust
//! use eventspace::{Bubbling, EventSpace, Evented, Flow, Handler, Path, Subscribable};
//!
//! struct Button {
//!     events: Evented,
//! }
//!
//! impl Subscribable for Button {
//!     fn evented(&self) -> &Evented {
//!         &self.events
//!     }
//! }
//! impl Bubbling for Button {}
//!
//! let space = EventSpace::new();
//! let button = Button {
//!     events: Evented::new(&space, Path::parse("/form/ok").unwrap()),
//! };
//! space
//!     .subscribe_to("press", &Path::parse("/form").unwrap(), Handler::new(|_| Ok(Flow::Stop)))
//!     .unwrap();
//!
//! let ev = button.trigger_sync("press").unwrap();
//! assert!(ev.handled());
//! ```

use crate::error::EventError;
use crate::events::{Event, EventCollection};
use crate::evented::Evented;
use crate::handlers::Handler;
use crate::path::Path;

/// Listens for events at its own address.
pub trait Subscribable {
    /// The component's host state.
    fn evented(&self) -> &Evented;

    /// See [`Evented::subscribe_to`].
    fn subscribe_to(&self, event_name: &str, handler: Handler) -> Result<(), EventError> {
        self.evented().subscribe_to(event_name, handler)
    }

    /// See [`Evented::subscribe_to_until_triggered`].
    fn subscribe_to_until_triggered(
        &self,
        event_name: &str,
        handler: Handler,
    ) -> Result<Handler, EventError> {
        self.evented().subscribe_to_until_triggered(event_name, handler)
    }

    /// See [`Evented::delegate_subscription_to`].
    fn delegate_subscription_to(
        &self,
        event_name: &str,
        delegate_path: &Path,
        handler: Handler,
    ) -> Result<Handler, EventError> {
        self.evented()
            .delegate_subscription_to(event_name, delegate_path, handler)
    }

    /// See [`Evented::unsubscribe_from`].
    fn unsubscribe_from(&self, event_name: Option<&str>, handler: Option<&Handler>) {
        self.evented().unsubscribe_from(event_name, handler);
    }

    /// See [`Evented::set_event_path`].
    fn set_event_path(&self, path: Path) -> Result<(), EventError> {
        self.evented().set_event_path(path)
    }

    /// Current address.
    fn event_path(&self) -> Path {
        self.evented().event_path()
    }
}

/// Raises events that bubble from its address toward the root.
pub trait Bubbling: Subscribable {
    /// See [`Evented::trigger_sync`].
    fn trigger_sync(&self, event_name: &str) -> Result<Event, EventError> {
        self.evented().trigger_sync(event_name)
    }
}

/// Fans events out to every subscribed address below it.
pub trait Broadcastable: Subscribable {
    /// See [`Evented::broadcast_sync`].
    fn broadcast_sync(&self, event_name: &str) -> Result<EventCollection, EventError> {
        self.evented().broadcast_sync(event_name)
    }
}

impl Subscribable for Evented {
    fn evented(&self) -> &Evented {
        self
    }
}

impl Bubbling for Evented {}

impl Broadcastable for Evented {}
