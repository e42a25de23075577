//! Events: the value object and the aggregate produced by broadcasting.
//!
//! This module groups the event **data model** and the two dispatch algorithms
//! that run on it.
//!
//! ## Contents
//! - [`Event`] one occurrence: name, paths, payload, causal predecessor, flags
//! - [`EventCollection`] the sibling events produced by one `broadcast_sync`
//! - [`Payload`] `serde_json` object map carried by every event
//!
//! ## State machine
//! ```text
//! EventSpace::spawn_event ─► Idle ─► trigger_sync ─► Bubbling (0..N levels) ─► Done
//!                              └───► broadcast_sync ─► EventCollection (members each trigger once)
//! ```

mod collection;
mod event;

pub use collection::EventCollection;
pub use event::{Event, Payload, DEFAULT_KIND};
