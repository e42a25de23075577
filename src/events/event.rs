//! # One occurrence of a named event.
//!
//! [`Event`] is a cheap reference-counted handle: `Clone` gives another handle to
//! the **same** occurrence, so handlers, the causal stack and `original_event`
//! links all observe the same flags and payload. Use [`Event::duplicate`] for an
//! independent copy.
//!
//! Events are only created by an [`EventSpace`]; they start targeted at the root,
//! with staged payload merged in and `original_event` taken from the causal stack.
//!
//! ## Bubbling
//! ```text
//! trigger_sync(/a/b)
//!   call_handlers @ /a/b ──► invoked > 0 → handled
//!   call_handlers @ /a      (stopped → done)
//!   call_handlers @ /
//! ```
//!
//! ## Ordering guarantees
//! Each event has a process-wide sequence number (`seq`) that increases
//! monotonically. Duplicates keep the sequence number of their source.
//!
//! ## Example
//! ```rust
//! use eventspace::{EventSpace, Flow, Handler, Path};
//!
//! let space = EventSpace::new();
//! let target = Path::parse("/doc/1").unwrap();
//! space
//!     .subscribe_to("save", &Path::parse("/doc").unwrap(), Handler::new(|ev| {
//!         assert_eq!(ev.payload_item("force"), Some(serde_json::json!(true)));
//!         Ok(Flow::Continue)
//!     }))
//!     .unwrap();
//!
//! let ev = space.spawn_event("save").unwrap();
//! ev.set_payload_item("force", true);
//! ev.trigger_sync(Some(&target)).unwrap();
//!
//! assert!(ev.handled());
//! assert_eq!(ev.original_path(), target);
//! ```

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::EventError;
use crate::events::EventCollection;
use crate::path::Path;
use crate::space::{EventSpace, HandlerCall};

/// Payload carried by every event.
pub type Payload = Map<String, Value>;

/// Kind tag of events spawned without an explicit kind.
pub const DEFAULT_KIND: &str = "event";

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

struct EventInner {
    seq: u64,
    event_name: String,
    kind: &'static str,
    space: EventSpace,

    can_bubble: Cell<bool>,
    default_prevented: Cell<bool>,
    handled: Cell<bool>,
    propagation_stopped: Cell<bool>,

    original_event: RefCell<Option<Event>>,
    sender: RefCell<Option<Rc<dyn Any>>>,
    payload: RefCell<Payload>,

    current_path: RefCell<Path>,
    original_path: RefCell<Path>,
    broadcast_path: RefCell<Option<Path>>,
}

/// Handle to one event occurrence.
#[derive(Clone)]
pub struct Event {
    inner: Rc<EventInner>,
}

impl Event {
    /// Bare event targeted at the root; the space adds staging and causality.
    pub(crate) fn new_in(space: &EventSpace, event_name: &str, kind: &'static str) -> Self {
        Self::from_parts(
            EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            space.clone(),
            event_name.to_string(),
            kind,
        )
    }

    fn from_parts(seq: u64, space: EventSpace, event_name: String, kind: &'static str) -> Self {
        Self {
            inner: Rc::new(EventInner {
                seq,
                event_name,
                kind,
                space,
                can_bubble: Cell::new(true),
                default_prevented: Cell::new(false),
                handled: Cell::new(false),
                propagation_stopped: Cell::new(false),
                original_event: RefCell::new(None),
                sender: RefCell::new(None),
                payload: RefCell::new(Payload::new()),
                current_path: RefCell::new(Path::root()),
                original_path: RefCell::new(Path::root()),
                broadcast_path: RefCell::new(None),
            }),
        }
    }

    // ---- identity ----

    /// Sequence number (monotonic, process-wide).
    #[inline]
    pub fn seq(&self) -> u64 {
        self.inner.seq
    }

    /// Event name.
    #[inline]
    pub fn event_name(&self) -> &str {
        &self.inner.event_name
    }

    /// Kind tag used by [`Event::get_original_event_by_type`].
    #[inline]
    pub fn kind(&self) -> &'static str {
        self.inner.kind
    }

    /// The space that spawned this event.
    #[inline]
    pub fn space(&self) -> &EventSpace {
        &self.inner.space
    }

    /// True if both handles point at the same occurrence.
    #[inline]
    pub fn same_as(&self, other: &Event) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ---- flags ----

    /// Whether `trigger_sync` walks toward the root.
    pub fn can_bubble(&self) -> bool {
        self.inner.can_bubble.get()
    }

    /// Enables or disables bubbling.
    pub fn set_can_bubble(&self, can_bubble: bool) {
        self.inner.can_bubble.set(can_bubble);
    }

    /// Marks the default action as prevented.
    pub fn prevent_default(&self) {
        self.inner.default_prevented.set(true);
    }

    /// True once any handler called [`Event::prevent_default`].
    pub fn default_prevented(&self) -> bool {
        self.inner.default_prevented.get()
    }

    /// True once any dispatch step invoked at least one handler.
    pub fn handled(&self) -> bool {
        self.inner.handled.get()
    }

    /// True when a handler returned [`Flow::Stop`](crate::Flow::Stop).
    pub fn propagation_stopped(&self) -> bool {
        self.inner.propagation_stopped.get()
    }

    // ---- causality ----

    /// The event that was being handled when this one was spawned.
    pub fn original_event(&self) -> Option<Event> {
        self.inner.original_event.borrow().clone()
    }

    /// Replaces the causal predecessor.
    pub fn set_original_event(&self, original: Option<Event>) {
        *self.inner.original_event.borrow_mut() = original;
    }

    /// First predecessor (starting with the immediate one) named `event_name`.
    pub fn get_original_event_by_name(&self, event_name: &str) -> Option<Event> {
        self.find_original(|ev| ev.event_name() == event_name)
    }

    /// First predecessor (starting with the immediate one) of kind `kind`.
    pub fn get_original_event_by_type(&self, kind: &str) -> Option<Event> {
        self.find_original(|ev| ev.kind() == kind)
    }

    fn find_original(&self, pred: impl Fn(&Event) -> bool) -> Option<Event> {
        let mut cursor = self.original_event();
        while let Some(ev) = cursor {
            if pred(&ev) {
                return Some(ev);
            }
            cursor = ev.original_event();
        }
        None
    }

    // ---- sender ----

    /// Opaque reference to whoever produced the event.
    pub fn sender(&self) -> Option<Rc<dyn Any>> {
        self.inner.sender.borrow().clone()
    }

    /// Sender downcast to a concrete type.
    pub fn sender_as<T: Any>(&self) -> Option<Rc<T>> {
        self.sender().and_then(|s| s.downcast::<T>().ok())
    }

    /// Sets the sender.
    pub fn set_sender(&self, sender: Rc<dyn Any>) {
        *self.inner.sender.borrow_mut() = Some(sender);
    }

    // ---- payload ----

    /// Copy of the whole payload.
    pub fn payload(&self) -> Payload {
        self.inner.payload.borrow().clone()
    }

    /// One payload item.
    pub fn payload_item(&self, key: &str) -> Option<Value> {
        self.inner.payload.borrow().get(key).cloned()
    }

    /// Runs `f` against the payload without copying it.
    ///
    /// `f` must not mutate this event's payload.
    pub fn with_payload<R>(&self, f: impl FnOnce(&Payload) -> R) -> R {
        f(&self.inner.payload.borrow())
    }

    /// Sets one payload item.
    pub fn set_payload_item(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner
            .payload
            .borrow_mut()
            .insert(key.into(), value.into());
    }

    /// Merges several items into the payload; existing keys are overwritten.
    pub fn set_payload_items<I, K, V>(&self, items: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut payload = self.inner.payload.borrow_mut();
        for (k, v) in items {
            payload.insert(k.into(), v.into());
        }
    }

    fn replace_payload(&self, payload: Payload) {
        *self.inner.payload.borrow_mut() = payload;
    }

    // ---- paths ----

    /// Address the event is currently being dispatched at.
    pub fn current_path(&self) -> Path {
        self.inner.current_path.borrow().clone()
    }

    /// Address the event was triggered at.
    pub fn original_path(&self) -> Path {
        self.inner.original_path.borrow().clone()
    }

    /// Root of the broadcast this event belongs to, if any.
    pub fn broadcast_path(&self) -> Option<Path> {
        self.inner.broadcast_path.borrow().clone()
    }

    /// Sets both the original and the current path.
    pub fn set_target_path(&self, path: Path) {
        *self.inner.original_path.borrow_mut() = path.clone();
        *self.inner.current_path.borrow_mut() = path;
    }

    /// Marks the event as a member of a broadcast rooted at `path`.
    pub fn set_broadcast_path(&self, path: Path) {
        *self.inner.broadcast_path.borrow_mut() = Some(path);
    }

    pub(crate) fn set_current_path(&self, path: Path) {
        *self.inner.current_path.borrow_mut() = path;
    }

    // ---- copies ----

    /// Independent copy of this event (same name, kind, `seq` and space).
    #[must_use]
    pub fn duplicate(&self) -> Event {
        let copy = Self::from_parts(
            self.inner.seq,
            self.inner.space.clone(),
            self.inner.event_name.clone(),
            self.inner.kind,
        );
        self.copy_state_into(&copy);
        copy
    }

    fn copy_state_into(&self, copy: &Event) {
        let (src, dst) = (&self.inner, &copy.inner);
        dst.can_bubble.set(src.can_bubble.get());
        dst.default_prevented.set(src.default_prevented.get());
        dst.handled.set(src.handled.get());
        dst.propagation_stopped.set(src.propagation_stopped.get());
        *dst.original_event.borrow_mut() = src.original_event.borrow().clone();
        *dst.sender.borrow_mut() = src.sender.borrow().clone();
        *dst.payload.borrow_mut() = src.payload.borrow().clone();
        *dst.current_path.borrow_mut() = src.current_path.borrow().clone();
        *dst.original_path.borrow_mut() = src.original_path.borrow().clone();
        *dst.broadcast_path.borrow_mut() = src.broadcast_path.borrow().clone();
    }

    /// Pulls back what a handler may have changed on a duplicate of this event.
    pub(crate) fn absorb(&self, duplicate: &Event) {
        if duplicate.default_prevented() {
            self.prevent_default();
        }
        self.replace_payload(duplicate.payload());
    }

    /// New event carrying this event's sender, payload and causal predecessor.
    fn spawn_member(&self) -> Event {
        let member = Event::new_in(self.space(), self.event_name(), self.kind());
        *member.inner.sender.borrow_mut() = self.sender();
        member.replace_payload(self.payload());
        member.set_original_event(self.original_event());
        member
    }

    // ---- dispatch ----

    fn record(&self, call: HandlerCall) {
        if call.invoked > 0 {
            self.inner.handled.set(true);
        }
        if call.stopped {
            self.inner.propagation_stopped.set(true);
        }
    }

    /// Dispatches the event, bubbling toward the root.
    ///
    /// With `Some(target)` the original and current path are reset first.
    /// Non-bubbling events and events targeted at a query are dispatched once,
    /// at their current path.
    ///
    /// # Errors
    /// - the first error returned by a handler (remaining levels are skipped)
    /// - [`EventError::DispatchDepthExceeded`] when nested too deeply
    pub fn trigger_sync(&self, target: Option<&Path>) -> Result<(), EventError> {
        if let Some(target) = target {
            self.set_target_path(target.clone());
        }
        let space = self.space().clone();
        let _guard = space.enter_dispatch(self.event_name())?;

        if !self.can_bubble() || self.original_path().is_query() {
            let call = space.call_handlers(self)?;
            self.record(call);
            return Ok(());
        }

        loop {
            let call = space.call_handlers(self)?;
            self.record(call);
            if call.stopped {
                debug!(
                    space = %space.config().name,
                    event = self.event_name(),
                    path = %self.current_path(),
                    "Event::trigger_sync: propagation stopped"
                );
                break;
            }
            if self.inner.current_path.borrow_mut().pop().is_none() {
                break;
            }
        }

        if !self.handled() && space.config().warn_unhandled {
            warn!(
                space = %space.config().name,
                event = self.event_name(),
                origin = %self.original_path(),
                "Event::trigger_sync: reached the root unhandled"
            );
        }
        Ok(())
    }

    /// Fans the event out to every subscribed address below `path`.
    ///
    /// `path` defaults to the current path. One non-bubbling member is spawned per
    /// subscribed descendant address, plus one bubbling main member at `path`.
    /// Members inherit this event's sender, payload and original event.
    /// Descendants are dispatched first in address order, then the main member.
    ///
    /// # Errors
    /// The first error returned by any member's dispatch; later members are skipped.
    pub fn broadcast_sync(&self, path: Option<&Path>) -> Result<EventCollection, EventError> {
        let root = path.cloned().unwrap_or_else(|| self.current_path());
        let space = self.space().clone();

        let mut members = Vec::new();
        for target in space.get_paths_relative_to(self.event_name(), &root) {
            if target == root {
                continue;
            }
            let member = self.spawn_member();
            member.set_can_bubble(false);
            member.set_broadcast_path(root.clone());
            member.set_target_path(target.clone());
            members.push((target.key(), member));
        }

        let main = self.spawn_member();
        main.set_broadcast_path(root.clone());
        main.set_target_path(root.clone());

        debug!(
            space = %space.config().name,
            event = self.event_name(),
            path = %root,
            members = members.len(),
            "Event::broadcast_sync"
        );

        let collection = EventCollection::new(self.event_name(), main, members);
        for (_, member) in collection.members() {
            member.trigger_sync(None)?;
        }
        collection.main().trigger_sync(None)?;
        Ok(collection)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("seq", &self.inner.seq)
            .field("event_name", &self.inner.event_name)
            .field("kind", &self.inner.kind)
            .field("current_path", &*self.inner.current_path.borrow())
            .field("original_path", &*self.inner.original_path.borrow())
            .field("broadcast_path", &*self.inner.broadcast_path.borrow())
            .field("handled", &self.inner.handled.get())
            .field("default_prevented", &self.inner.default_prevented.get())
            .finish()
    }
}
