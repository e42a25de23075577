//! # Evented host state.
//!
//! An [`Evented`] gives a component one address in an [`EventSpace`] and keeps
//! track of the subscriptions the component installed there, so they can be
//! moved when the component moves and removed when it goes away.
//!
//! ```text
//! Evented { space, path: /list/3 }
//!   subscribe_to("click", h)        ─► space["/list/3"]["click"] += h
//!   set_event_path(/list/4)         ─► unsubscribe @ /list/3, subscribe @ /list/4
//!   drop(evented)                   ─► unsubscribe everything it installed
//! ```
//!
//! ## Rules
//! - Only subscriptions made through the host are tracked; the space itself is
//!   never scanned.
//! - Fired once-subscriptions are forgotten at the next bookkeeping pass.
//! - Delegated subscriptions keep their delegate address relative to the host.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::error::{check_event_name, EventError};
use crate::events::{Event, EventCollection};
use crate::handlers::Handler;
use crate::path::Path;
use crate::space::EventSpace;

struct Subscription {
    event_name: String,
    /// What the caller passed in.
    handler: Handler,
    /// What sits in the registry (the handler itself or a wrapper).
    installed: Handler,
    fired: Option<Rc<Cell<bool>>>,
}

impl Subscription {
    fn is_live(&self) -> bool {
        self.fired.as_ref().map_or(true, |f| !f.get())
    }

    fn matches(&self, event_name: Option<&str>, handler: Option<&Handler>) -> bool {
        event_name.map_or(true, |n| n == self.event_name)
            && handler.map_or(true, |h| *h == self.handler || *h == self.installed)
    }
}

struct HostState {
    space: EventSpace,
    path: Path,
    base: Option<Path>,
    subscriptions: Vec<Subscription>,
}

impl HostState {
    fn prune_fired(&mut self) {
        self.subscriptions.retain(Subscription::is_live);
    }

    fn detach(&self, sub: &Subscription) {
        self.space
            .unsubscribe_from(Some(&sub.event_name), Some(&self.path), Some(&sub.installed));
    }

    fn attach(&self, sub: &Subscription) -> Result<(), EventError> {
        self.space
            .subscribe_to(&sub.event_name, &self.path, sub.installed.clone())
    }
}

/// A component's address in an event space, plus the subscriptions it owns.
pub struct Evented {
    state: RefCell<HostState>,
}

impl Evented {
    /// Host at `path` in `space`.
    pub fn new(space: &EventSpace, path: Path) -> Self {
        Self {
            state: RefCell::new(HostState {
                space: space.clone(),
                path,
                base: None,
                subscriptions: Vec::new(),
            }),
        }
    }

    /// Host confined to addresses at or below `base`.
    ///
    /// # Errors
    /// [`EventError::NotRelative`] if `path` is outside `base`.
    pub fn with_base(space: &EventSpace, base: Path, path: Path) -> Result<Self, EventError> {
        check_within(&base, &path)?;
        let host = Self::new(space, path);
        host.state.borrow_mut().base = Some(base);
        Ok(host)
    }

    /// Current address.
    pub fn event_path(&self) -> Path {
        self.state.borrow().path.clone()
    }

    /// The space subscriptions are installed in.
    pub fn event_space(&self) -> EventSpace {
        self.state.borrow().space.clone()
    }

    /// Fixed base address, if any.
    pub fn base_path(&self) -> Option<Path> {
        self.state.borrow().base.clone()
    }

    /// Number of live subscriptions owned by this host.
    pub fn subscription_count(&self) -> usize {
        let mut state = self.state.borrow_mut();
        state.prune_fired();
        state.subscriptions.len()
    }

    /// Moves the host, carrying every live subscription along.
    ///
    /// # Errors
    /// [`EventError::NotRelative`] if the host has a base address and `path` is
    /// outside it. Nothing moves in that case.
    pub fn set_event_path(&self, path: Path) -> Result<(), EventError> {
        let mut state = self.state.borrow_mut();
        if let Some(base) = &state.base {
            check_within(base, &path)?;
        }
        if state.path == path {
            return Ok(());
        }
        state.prune_fired();
        debug!(
            from = %state.path,
            to = %path,
            subscriptions = state.subscriptions.len(),
            "Evented::set_event_path"
        );

        for sub in &state.subscriptions {
            state.detach(sub);
        }
        state.path = path;
        for sub in &state.subscriptions {
            state.attach(sub)?;
        }
        Ok(())
    }

    /// Moves every live subscription into `space`.
    ///
    /// # Errors
    /// Whatever the new space reports while re-subscribing.
    pub fn set_event_space(&self, space: &EventSpace) -> Result<(), EventError> {
        let mut state = self.state.borrow_mut();
        if state.space.same_as(space) {
            return Ok(());
        }
        state.prune_fired();
        for sub in &state.subscriptions {
            state.detach(sub);
        }
        state.space = space.clone();
        for sub in &state.subscriptions {
            state.attach(sub)?;
        }
        Ok(())
    }

    /// Subscribes `handler` at the host address.
    ///
    /// # Errors
    /// [`EventError::InvalidArgument`] for an empty event name.
    pub fn subscribe_to(&self, event_name: &str, handler: Handler) -> Result<(), EventError> {
        let mut state = self.state.borrow_mut();
        state
            .space
            .subscribe_to(event_name, &state.path, handler.clone())?;
        state.subscriptions.push(Subscription {
            event_name: event_name.to_string(),
            installed: handler.clone(),
            handler,
            fired: None,
        });
        Ok(())
    }

    /// Subscribes `handler` for a single invocation at the host address.
    ///
    /// # Errors
    /// [`EventError::InvalidArgument`] for an empty event name.
    pub fn subscribe_to_until_triggered(
        &self,
        event_name: &str,
        handler: Handler,
    ) -> Result<Handler, EventError> {
        check_event_name(event_name)?;
        let (installed, fired) = crate::space::once_wrapper(event_name, handler.clone());
        let mut state = self.state.borrow_mut();
        state
            .space
            .subscribe_to(event_name, &state.path, installed.clone())?;
        state.subscriptions.push(Subscription {
            event_name: event_name.to_string(),
            handler,
            installed: installed.clone(),
            fired: Some(fired),
        });
        Ok(installed)
    }

    /// Captures `event_name` at the host address on behalf of `delegate_path`.
    ///
    /// # Errors
    /// - [`EventError::InvalidArgument`] for an empty event name
    /// - [`EventError::NotRelative`] if `delegate_path` is outside the host address
    pub fn delegate_subscription_to(
        &self,
        event_name: &str,
        delegate_path: &Path,
        handler: Handler,
    ) -> Result<Handler, EventError> {
        let mut state = self.state.borrow_mut();
        let installed = state.space.delegate_subscription_to(
            event_name,
            &state.path,
            delegate_path,
            handler.clone(),
        )?;
        state.subscriptions.push(Subscription {
            event_name: event_name.to_string(),
            handler,
            installed: installed.clone(),
            fired: None,
        });
        Ok(installed)
    }

    /// Removes subscriptions this host installed.
    ///
    /// `handler` may be either the handler passed in or the wrapper returned by
    /// `subscribe_to_until_triggered` / `delegate_subscription_to`. Omitted
    /// arguments match everything.
    pub fn unsubscribe_from(&self, event_name: Option<&str>, handler: Option<&Handler>) {
        let removed = {
            let mut state = self.state.borrow_mut();
            let subs = std::mem::take(&mut state.subscriptions);
            let (removed, kept): (Vec<_>, Vec<_>) = subs
                .into_iter()
                .partition(|s| s.matches(event_name, handler));
            for sub in &removed {
                state.detach(sub);
            }
            state.subscriptions = kept;
            removed
        };
        drop(removed);
    }

    /// Removes every subscription this host installed.
    pub fn unsubscribe_all(&self) {
        self.unsubscribe_from(None, None);
    }

    /// Spawns an event targeted at the host address.
    ///
    /// # Errors
    /// [`EventError::InvalidArgument`] for an empty event name.
    pub fn spawn_event(&self, event_name: &str) -> Result<Event, EventError> {
        let (space, path) = self.snapshot();
        let event = space.spawn_event(event_name)?;
        event.set_target_path(path);
        Ok(event)
    }

    /// Spawns an event at the host address and bubbles it.
    ///
    /// # Errors
    /// Spawn validation or the first handler error.
    pub fn trigger_sync(&self, event_name: &str) -> Result<Event, EventError> {
        let event = self.spawn_event(event_name)?;
        event.trigger_sync(None)?;
        Ok(event)
    }

    /// Spawns an event at the host address and broadcasts it below the host.
    ///
    /// # Errors
    /// Spawn validation or the first handler error.
    pub fn broadcast_sync(&self, event_name: &str) -> Result<EventCollection, EventError> {
        self.spawn_event(event_name)?.broadcast_sync(None)
    }

    // Handlers may move or re-subscribe the host while an event is in flight,
    // so no borrow is held across dispatch.
    fn snapshot(&self) -> (EventSpace, Path) {
        let state = self.state.borrow();
        (state.space.clone(), state.path.clone())
    }
}

impl Drop for Evented {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for sub in state.subscriptions.iter().filter(|s| s.is_live()) {
            state.detach(sub);
        }
    }
}

impl fmt::Debug for Evented {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Evented")
            .field("path", &state.path)
            .field("base", &state.base)
            .field("subscriptions", &state.subscriptions.len())
            .finish()
    }
}

fn check_within(base: &Path, path: &Path) -> Result<(), EventError> {
    if path.is_relative_to(base) {
        Ok(())
    } else {
        Err(EventError::NotRelative {
            path: path.key(),
            base: base.key(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::Flow;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    fn counter(hits: &Rc<Cell<usize>>) -> Handler {
        let hits = Rc::clone(hits);
        Handler::new(move |_| {
            hits.set(hits.get() + 1);
            Ok(Flow::Continue)
        })
    }

    fn fire(space: &EventSpace, name: &str, at: &str) {
        space.spawn_event(name).unwrap().trigger_sync(Some(&p(at))).unwrap();
    }

    #[test]
    fn test_relocation_moves_subscriptions() {
        let space = EventSpace::new();
        let hits = Rc::new(Cell::new(0));
        let host = Evented::new(&space, p("/list/3"));
        host.subscribe_to("click", counter(&hits)).unwrap();

        host.set_event_path(p("/list/4")).unwrap();
        fire(&space, "click", "/list/3");
        assert_eq!(hits.get(), 0);
        fire(&space, "click", "/list/4");
        assert_eq!(hits.get(), 1);
        assert!(!space.has_subscribers("click", &p("/list/3")));
    }

    #[test]
    fn test_base_path_rejects_outside_moves() {
        let space = EventSpace::new();
        let host = Evented::with_base(&space, p("/list"), p("/list/3")).unwrap();
        host.subscribe_to("click", Handler::new(|_| Ok(Flow::Continue))).unwrap();

        let err = host.set_event_path(p("/menu/1")).unwrap_err();
        assert_eq!(err.as_label(), "path_not_relative");
        assert_eq!(host.event_path(), p("/list/3"));
        assert!(space.has_subscribers("click", &p("/list/3")));

        assert!(Evented::with_base(&space, p("/list"), p("/menu")).is_err());
    }

    #[test]
    fn test_delegate_stays_relative_after_move() {
        let space = EventSpace::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let host = Evented::new(&space, p("/a"));
        host.delegate_subscription_to("click", &p("/a/item"), Handler::new(move |ev| {
            sink.borrow_mut().push(ev.current_path().key());
            Ok(Flow::Continue)
        }))
        .unwrap();

        host.set_event_path(p("/b")).unwrap();
        fire(&space, "click", "/a/item");
        fire(&space, "click", "/b/item/x");

        assert_eq!(*seen.borrow(), ["/b/item"]);
    }

    #[test]
    fn test_once_subscription_is_forgotten_after_firing() {
        let space = EventSpace::new();
        let hits = Rc::new(Cell::new(0));
        let host = Evented::new(&space, p("/a"));
        host.subscribe_to_until_triggered("open", counter(&hits)).unwrap();
        assert_eq!(host.subscription_count(), 1);

        host.trigger_sync("open").unwrap();
        host.trigger_sync("open").unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(host.subscription_count(), 0);

        host.set_event_path(p("/b")).unwrap();
        assert!(space.is_empty());
    }

    #[test]
    fn test_unsubscribe_by_name_or_handler() {
        let space = EventSpace::new();
        let host = Evented::new(&space, p("/a"));
        let h = Handler::new(|_| Ok(Flow::Continue));
        host.subscribe_to("click", h.clone()).unwrap();
        host.subscribe_to("key", Handler::new(|_| Ok(Flow::Continue))).unwrap();
        let once = host
            .subscribe_to_until_triggered("click", Handler::new(|_| Ok(Flow::Continue)))
            .unwrap();

        host.unsubscribe_from(None, Some(&h));
        assert_eq!(space.handler_count("click", &p("/a")), 1);

        host.unsubscribe_from(Some("click"), Some(&once));
        assert!(!space.has_subscribers("click", &p("/a")));

        host.unsubscribe_from(Some("key"), None);
        assert!(space.is_empty());
        assert_eq!(host.subscription_count(), 0);
    }

    #[test]
    fn test_drop_removes_subscriptions() {
        let space = EventSpace::new();
        {
            let host = Evented::new(&space, p("/a"));
            host.subscribe_to("click", Handler::new(|_| Ok(Flow::Continue))).unwrap();
            assert!(!space.is_empty());
        }
        assert!(space.is_empty());
    }

    #[test]
    fn test_set_event_space_moves_subscriptions() {
        let first = EventSpace::new();
        let second = EventSpace::new();
        let hits = Rc::new(Cell::new(0));
        let host = Evented::new(&first, p("/a"));
        host.subscribe_to("click", counter(&hits)).unwrap();

        host.set_event_space(&second).unwrap();
        assert!(first.is_empty());
        fire(&second, "click", "/a/b");
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_broadcast_from_host_reaches_children() {
        let space = EventSpace::new();
        let hits = Rc::new(Cell::new(0));
        let parent = Evented::new(&space, p("/list"));
        let child = Evented::new(&space, p("/list/1"));
        child.subscribe_to("refresh", counter(&hits)).unwrap();

        let collection = parent.broadcast_sync("refresh").unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(collection.main().original_path(), p("/list"));
    }

    #[test]
    fn test_handler_may_move_its_host_mid_dispatch() {
        let space = EventSpace::new();
        let host = Rc::new(Evented::new(&space, p("/a")));
        let weak = Rc::downgrade(&host);
        host.subscribe_to("move", Handler::new(move |_| {
            if let Some(host) = weak.upgrade() {
                host.set_event_path(Path::parse("/b")?)?;
            }
            Ok(Flow::Continue)
        }))
        .unwrap();

        host.trigger_sync("move").unwrap();
        assert_eq!(host.event_path(), p("/b"));
        assert!(space.has_subscribers("move", &p("/b")));
    }
}
