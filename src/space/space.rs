//! # Event space: the router.
//!
//! [`EventSpace`] owns the subscription registry and the dispatch loop, and holds
//! the injected side channels ([`PayloadStaging`], [`CausalStack`]).
//!
//! ## Architecture
//! ```text
//! subscribe_to / unsubscribe_from / delegate / until_triggered
//!        │
//!        ▼
//!   Registry (path key → event → [handlers])
//!        ▲
//!        │ snapshot(bucket)
//! Event::trigger_sync ──► call_handlers(ev)
//!                           for h in snapshot:
//!                             entry = causal.push(ev)
//!                             h(ev) ─► Continue → drop(entry)
//!                                   ─► Stop     → drop(entry), return stopped
//!                                   ─► Defer(f) → queue f; drop(entry) when f completes
//!                                   ─► Err(e)   → drop(entry), return Err(e)
//! ```
//!
//! ## Rules
//! - Single-threaded: the space is `!Send`; clones are cheap handles to the same space.
//! - Re-entrancy: handlers may subscribe/unsubscribe during dispatch; a running
//!   bucket is unaffected (snapshot), later triggers see the change.
//! - Validation happens before any registry mutation.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::task::Poll;

use futures::future::{FutureExt, LocalBoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::SpaceConfig;
use crate::error::{check_event_name, EventError};
use crate::events::{Event, Payload, DEFAULT_KIND};
use crate::handlers::{Flow, Handler};
use crate::path::Path;
use crate::space::builder::EventSpaceBuilder;
use crate::space::registry::Registry;
use crate::space::wrappers;
use crate::staging::{CausalEntry, CausalStack, PayloadStaging};

/// Outcome of dispatching one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerCall {
    /// Handlers invoked, including the one that stopped.
    pub invoked: usize,
    /// True when a handler returned [`Flow::Stop`].
    pub stopped: bool,
}

pub(crate) struct SpaceInner {
    config: SpaceConfig,
    registry: RefCell<Registry>,
    staging: PayloadStaging,
    causal: CausalStack,
    deferred: RefCell<Vec<LocalBoxFuture<'static, ()>>>,
    depth: Cell<usize>,
}

/// Hierarchical publish/subscribe router.
#[derive(Clone)]
pub struct EventSpace {
    inner: Rc<SpaceInner>,
}

/// Non-owning handle to an [`EventSpace`], for handlers that need to reach their space.
#[derive(Clone)]
pub struct WeakEventSpace {
    inner: Weak<SpaceInner>,
}

impl WeakEventSpace {
    /// The space, if it is still alive.
    pub fn upgrade(&self) -> Option<EventSpace> {
        self.inner.upgrade().map(|inner| EventSpace { inner })
    }
}

/// Decrements the dispatch depth on drop.
pub(crate) struct DispatchGuard {
    inner: Rc<SpaceInner>,
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        let d = self.inner.depth.get();
        self.inner.depth.set(d.saturating_sub(1));
    }
}

impl EventSpace {
    /// Space with default config and private staging/causal services.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SpaceConfig::default())
    }

    /// Space with the given config and private services.
    #[must_use]
    pub fn with_config(config: SpaceConfig) -> Self {
        Self::builder(config).build()
    }

    /// Builder for injecting shared services.
    pub fn builder(config: SpaceConfig) -> EventSpaceBuilder {
        EventSpaceBuilder::new(config)
    }

    pub(crate) fn from_parts(
        config: SpaceConfig,
        staging: PayloadStaging,
        causal: CausalStack,
    ) -> Self {
        debug!(space = %config.name, "EventSpace::new");
        Self {
            inner: Rc::new(SpaceInner {
                config,
                registry: RefCell::new(Registry::default()),
                staging,
                causal,
                deferred: RefCell::new(Vec::new()),
                depth: Cell::new(0),
            }),
        }
    }

    /// Configuration the space was built with.
    pub fn config(&self) -> &SpaceConfig {
        &self.inner.config
    }

    /// The payload staging store.
    pub fn staging(&self) -> &PayloadStaging {
        &self.inner.staging
    }

    /// The causal event stack.
    pub fn causal_stack(&self) -> &CausalStack {
        &self.inner.causal
    }

    /// Non-owning handle.
    pub fn downgrade(&self) -> WeakEventSpace {
        WeakEventSpace {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// True if both handles refer to the same space.
    pub fn same_as(&self, other: &EventSpace) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ---- subscriptions ----

    /// Appends `handler` to the (`path`, `event_name`) bucket.
    ///
    /// # Errors
    /// [`EventError::InvalidArgument`] for an empty event name.
    pub fn subscribe_to(
        &self,
        event_name: &str,
        path: &Path,
        handler: Handler,
    ) -> Result<(), EventError> {
        check_event_name(event_name)?;
        trace!(
            space = %self.inner.config.name,
            event = event_name,
            path = %path,
            handler = handler.name(),
            "EventSpace::subscribe_to"
        );
        self.inner
            .registry
            .borrow_mut()
            .add(path, event_name, handler);
        Ok(())
    }

    /// Removes subscriptions, widening with every omitted argument.
    ///
    /// | event_name | path | handler | removes                         |
    /// |------------|------|---------|---------------------------------|
    /// | some       | some | some    | that handler from that bucket   |
    /// | some       | some | none    | the whole bucket                |
    /// | none       | some | any     | every bucket at `path`          |
    /// | any        | none | any     | everything                      |
    ///
    /// Removing something absent is a no-op.
    pub fn unsubscribe_from(
        &self,
        event_name: Option<&str>,
        path: Option<&Path>,
        handler: Option<&Handler>,
    ) {
        // Handlers are dropped only after the registry borrow ends: a handler
        // may own an `Evented` whose drop unsubscribes from this same space.
        let removed = {
            let mut registry = self.inner.registry.borrow_mut();
            match (event_name, path, handler) {
                (Some(name), Some(path), Some(h)) => registry
                    .remove_handler(&path.key(), name, h.id())
                    .into_iter()
                    .collect(),
                (Some(name), Some(path), None) => registry.remove_bucket(&path.key(), name),
                (None, Some(path), _) => registry.remove_path(&path.key()),
                (_, None, _) => registry.clear(),
            }
        };
        trace!(
            space = %self.inner.config.name,
            event = event_name.unwrap_or("*"),
            path = %path.map_or_else(|| "*".to_string(), Path::key),
            removed = removed.len(),
            "EventSpace::unsubscribe_from"
        );
        drop(removed);
    }

    /// Removes one handler by identity. Returns true if it was subscribed.
    pub(crate) fn remove_handler(&self, event_name: &str, path: &Path, id: u64) -> bool {
        let removed = self
            .inner
            .registry
            .borrow_mut()
            .remove_handler(&path.key(), event_name, id);
        removed.is_some()
    }

    /// Subscribes `handler` for a single invocation.
    ///
    /// Returns the installed wrapper; pass it to [`EventSpace::unsubscribe_from`]
    /// to cancel before it fires.
    ///
    /// # Errors
    /// [`EventError::InvalidArgument`] for an empty event name.
    pub fn subscribe_to_until_triggered(
        &self,
        event_name: &str,
        path: &Path,
        handler: Handler,
    ) -> Result<Handler, EventError> {
        check_event_name(event_name)?;
        let (wrapper, _) = wrappers::once(event_name, handler);
        self.subscribe_to(event_name, path, wrapper.clone())?;
        Ok(wrapper)
    }

    /// Subscribes at `capture_path`, invoking `handler` only for events aimed at
    /// `delegate_path`.
    ///
    /// The handler fires when the event's original path is at or below
    /// `delegate_path`, or, for broadcast members, when `delegate_path` is at or
    /// below the broadcast root. It receives a duplicate whose current path is
    /// `delegate_path`; prevented defaults and payload changes are copied back.
    ///
    /// Returns the installed wrapper.
    ///
    /// # Errors
    /// - [`EventError::InvalidArgument`] for an empty event name
    /// - [`EventError::NotRelative`] if `delegate_path` is not at or below `capture_path`
    pub fn delegate_subscription_to(
        &self,
        event_name: &str,
        capture_path: &Path,
        delegate_path: &Path,
        handler: Handler,
    ) -> Result<Handler, EventError> {
        check_event_name(event_name)?;
        let relative = delegate_path
            .strip_prefix(capture_path)
            .ok_or_else(|| EventError::NotRelative {
                path: delegate_path.key(),
                base: capture_path.key(),
            })?;
        let wrapper = wrappers::delegate(relative, handler);
        self.subscribe_to(event_name, capture_path, wrapper.clone())?;
        Ok(wrapper)
    }

    // ---- lookups ----

    /// Subscribed paths for `event_name` at or below `path`, in address order.
    pub fn get_paths_relative_to(&self, event_name: &str, path: &Path) -> Vec<Path> {
        self.inner
            .registry
            .borrow()
            .paths_relative_to(event_name, path)
    }

    /// Handlers in the (`path`, `event_name`) bucket.
    pub fn handler_count(&self, event_name: &str, path: &Path) -> usize {
        self.inner
            .registry
            .borrow()
            .handler_count(&path.key(), event_name)
    }

    /// True if the (`path`, `event_name`) bucket has handlers.
    pub fn has_subscribers(&self, event_name: &str, path: &Path) -> bool {
        self.handler_count(event_name, path) > 0
    }

    /// True if nothing is subscribed anywhere.
    pub fn is_empty(&self) -> bool {
        self.inner.registry.borrow().is_empty()
    }

    // ---- events ----

    /// Creates an event of the default kind.
    ///
    /// The event targets the root, carries the payload staged for `event_name`,
    /// and its `original_event` is the newest event on the causal stack.
    ///
    /// # Errors
    /// [`EventError::InvalidArgument`] for an empty event name.
    pub fn spawn_event(&self, event_name: &str) -> Result<Event, EventError> {
        self.spawn_event_of_kind(event_name, DEFAULT_KIND)
    }

    /// Creates an event tagged with `kind`.
    ///
    /// # Errors
    /// [`EventError::InvalidArgument`] for an empty event name.
    pub fn spawn_event_of_kind(
        &self,
        event_name: &str,
        kind: &'static str,
    ) -> Result<Event, EventError> {
        check_event_name(event_name)?;
        let event = Event::new_in(self, event_name, kind);

        let mut payload = Payload::new();
        self.inner.staging.merge_into(event_name, &mut payload);
        if !payload.is_empty() {
            event.set_payload_items(payload);
        }
        event.set_original_event(self.inner.causal.top());

        trace!(
            space = %self.inner.config.name,
            event = event_name,
            seq = event.seq(),
            caused_by = event.original_event().map(|e| e.seq()),
            "EventSpace::spawn_event"
        );
        Ok(event)
    }

    /// Stages a payload item for every future `event_name` event.
    pub fn set_next_payload_item(
        &self,
        event_name: &str,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) {
        self.inner.staging.set_next_payload_item(event_name, key, value);
    }

    /// Stages several payload items for every future `event_name` event.
    pub fn set_next_payload_items<I, K, V>(&self, event_name: &str, items: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.inner.staging.set_next_payload_items(event_name, items);
    }

    /// Removes one staged item.
    pub fn delete_next_payload_item(&self, event_name: &str, key: &str) -> Option<Value> {
        self.inner.staging.delete_next_payload_item(event_name, key)
    }

    /// Removes every staged item for `event_name`.
    pub fn delete_next_payload_items(&self, event_name: &str) -> Option<Payload> {
        self.inner.staging.delete_next_payload_items(event_name)
    }

    // ---- dispatch ----

    /// Invokes the bucket at the event's current path.
    ///
    /// Handlers run over a snapshot of the bucket, in subscription order, each
    /// with the event linked on the causal stack.
    ///
    /// # Errors
    /// The first handler error, with event name and path filled in.
    pub fn call_handlers(&self, event: &Event) -> Result<HandlerCall, EventError> {
        let path = event.current_path();
        let key = path.key();
        let event_name = event.event_name();

        let handlers = self.inner.registry.borrow().snapshot(&key, event_name);
        if handlers.is_empty() {
            return Ok(HandlerCall::default());
        }
        trace!(
            space = %self.inner.config.name,
            event = event_name,
            path = %key,
            handlers = handlers.len(),
            "EventSpace::call_handlers"
        );

        let mut call = HandlerCall::default();
        for handler in handlers {
            let entry = self.inner.causal.push(event);
            call.invoked += 1;
            let flow = handler
                .call(event)
                .map_err(|e| e.with_dispatch_context(event_name, &key))?;

            match flow {
                Flow::Continue => drop(entry),
                Flow::Stop => {
                    drop(entry);
                    call.stopped = true;
                    return Ok(call);
                }
                Flow::Defer(tail) => self.defer(entry, tail),
            }
        }
        Ok(call)
    }

    fn defer(&self, entry: CausalEntry, tail: LocalBoxFuture<'static, ()>) {
        let fut = async move {
            tail.await;
            drop(entry);
        };
        self.inner.deferred.borrow_mut().push(fut.boxed_local());
    }

    /// Deferred handler tails not yet driven to completion.
    pub fn pending_deferred(&self) -> usize {
        self.inner.deferred.borrow().len()
    }

    /// Drives every deferred handler tail to completion.
    ///
    /// Must be awaited after dispatching events whose handlers return
    /// [`Flow::Defer`]: pending tails hold their causal entries, so later spawns
    /// keep linking to the deferred event until this runs.
    ///
    /// Tails queued while settling (by events dispatched from other tails) are
    /// driven too. Resolves once nothing is pending.
    pub async fn settle_deferred(&self) {
        let mut running = FuturesUnordered::new();
        futures::future::poll_fn(|cx| loop {
            let incoming = std::mem::take(&mut *self.inner.deferred.borrow_mut());
            running.extend(incoming);

            match running.poll_next_unpin(cx) {
                Poll::Ready(Some(())) => continue,
                Poll::Ready(None) | Poll::Pending
                    if !self.inner.deferred.borrow().is_empty() =>
                {
                    continue
                }
                Poll::Ready(None) => return Poll::Ready(()),
                Poll::Pending => return Poll::Pending,
            }
        })
        .await;
    }

    /// Enters one level of nested dispatch.
    pub(crate) fn enter_dispatch(&self, event_name: &str) -> Result<DispatchGuard, EventError> {
        let depth = self.inner.depth.get();
        if let Some(limit) = self.inner.config.dispatch_limit() {
            if depth >= limit {
                return Err(EventError::DispatchDepthExceeded {
                    event: event_name.to_string(),
                    limit,
                });
            }
        }
        self.inner.depth.set(depth + 1);
        Ok(DispatchGuard {
            inner: Rc::clone(&self.inner),
        })
    }
}

impl Default for EventSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSpace")
            .field("name", &self.inner.config.name)
            .field("handlers", &self.inner.registry.borrow().handler_total())
            .field("causal", &self.inner.causal)
            .field("pending_deferred", &self.pending_deferred())
            .finish()
    }
}
