//! # eventspace
//!
//! **eventspace** is a hierarchical, path-addressed publish/subscribe event router.
//!
//! Components live at addresses such as `/form/fields/3`. Producers trigger named
//! events at an address; the event bubbles toward the root, invoking every handler
//! subscribed along the way, or is broadcast to every subscribed address below it.
//! Two side channels let decoupled code annotate events it does not spawn itself:
//! a payload staging store and a causal stack that links each event to the one
//! being handled when it was created.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   Evented (component)      Evented (component)        producer code
//!   path=/form/ok            path=/form                      │
//!        │ trigger_sync("press")   │ subscribe_to("press")   │ set_next_payload_item
//!        ▼                         ▼                         ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  EventSpace (router)                                              │
//! │  - Registry: path → event name → [Handler] (FIFO buckets)         │
//! │  - PayloadStaging: event name → items merged on every spawn       │
//! │  - CausalStack: events currently being handled                    │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        │ spawn_event("press") ─► Event { original_event = causal top }
//!        ▼
//!   Event::trigger_sync(/form/ok)
//!        ├─► call_handlers @ /form/ok
//!        ├─► call_handlers @ /form      (Flow::Stop ends here)
//!        └─► call_handlers @ /
//!
//!   Event::broadcast_sync(/form)
//!        ├─► member @ /form/ok     (non-bubbling)
//!        ├─► member @ /form/name   (non-bubbling)
//!        └─► main   @ /form        (bubbles)  ─► EventCollection
//! ```
//!
//! ### Handler lifecycle
//! ```text
//! for handler in snapshot(bucket) {
//!   ├─► entry = causal.push(event)
//!   ├─► handler(event)
//!   │     ├─ Ok(Continue) ─► drop(entry), next handler
//!   │     ├─ Ok(Stop)     ─► drop(entry), stop bubbling
//!   │     ├─ Ok(Defer(f)) ─► entry kept until `f` completes (EventSpace::settle_deferred)
//!   │     └─ Err(e)       ─► drop(entry), return Err(e) to the trigger caller
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                              |
//! |-------------------|---------------------------------------------------------------|-------------------------------------------------|
//! | **Routing**       | Subscribe, unsubscribe, delegate, spawn and dispatch events.  | [`EventSpace`], [`EventSpaceBuilder`]           |
//! | **Events**        | Bubbling and broadcast dispatch, payload, causal chain.       | [`Event`], [`EventCollection`], [`Payload`]     |
//! | **Handlers**      | Identity-carrying closures with explicit flow control.        | [`Handler`], [`Flow`], [`HandlerResult`]        |
//! | **Components**    | Own an address and the subscriptions made from it.            | [`Evented`], [`Subscribable`], [`Bubbling`]     |
//! | **Side channels** | Staged payload and causal linking shared across spaces.       | [`PayloadStaging`], [`CausalStack`]             |
//! | **Addresses**     | Concrete and query paths.                                     | [`Path`], [`PathKind`]                          |
//! | **Errors**        | Typed validation and handler errors.                          | [`EventError`]                                  |
//! | **Configuration** | Dispatch depth limit and diagnostics.                         | [`SpaceConfig`]                                 |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] handler _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use eventspace::{EventSpace, Evented, Flow, Handler, Path};
//!
//! let space = EventSpace::new();
//! let form = Evented::new(&space, Path::parse("/form").unwrap());
//! let ok = Evented::new(&space, Path::parse("/form/ok").unwrap());
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = Rc::clone(&seen);
//! form.subscribe_to("press", Handler::new(move |ev| {
//!     log.borrow_mut().push(ev.original_path().to_string());
//!     Ok(Flow::Stop)
//! }))
//! .unwrap();
//!
//! space.set_next_payload_item("press", "source", "keyboard");
//! let ev = ok.trigger_sync("press").unwrap();
//!
//! assert!(ev.handled());
//! assert_eq!(ev.payload_item("source"), Some(serde_json::json!("keyboard")));
//! assert_eq!(*seen.borrow(), ["/form/ok"]);
//! ```
mod config;
mod error;
mod evented;
mod events;
mod handlers;
mod path;
mod space;
mod staging;

// ---- Public re-exports ----

pub use config::SpaceConfig;
pub use error::EventError;
pub use evented::{Broadcastable, Bubbling, Evented, Subscribable};
pub use events::{Event, EventCollection, Payload, DEFAULT_KIND};
pub use handlers::{Flow, Handler, HandlerResult};
pub use path::{Path, PathKind, WILDCARD};
pub use space::{EventSpace, EventSpaceBuilder, HandlerCall, WeakEventSpace};
pub use staging::{CausalEntry, CausalStack, PayloadStaging};

// Optional: expose a simple built-in logging handler (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use handlers::LogWriter;
