//! Side channels shared between producers and the code that spawns events.
//!
//! ## Contents
//! - [`PayloadStaging`] event name → payload items merged into every spawned event of that name
//! - [`CausalStack`], [`CausalEntry`] events currently being handled; the newest one becomes
//!   the `original_event` of anything spawned meanwhile
//!
//! Both are cheap-to-clone handles. Clones share state, so one store can be
//! injected into several [`EventSpace`](crate::EventSpace)s.
//!
//! ## Quick wiring
//! ```text
//! set_next_payload_item("save", "user", 7) ─┐
//!                                           ▼
//! EventSpace::spawn_event("save") ── merge staged payload
//!                                 └─ original_event = CausalStack::top()
//!
//! call_handlers(ev) ── push(ev) ─► handler(ev) ─► drop(entry)  (or after Defer settles)
//! ```

mod causal;
mod payload;

pub use causal::{CausalEntry, CausalStack};
pub use payload::PayloadStaging;
