//! # Event handlers.
//!
//! This module provides the callable side of a subscription:
//! - [`Handler`] - shared, identity-carrying wrapper around `Fn(&Event) -> HandlerResult`
//! - [`Flow`] - what a handler asks the dispatcher to do next
//! - [`HandlerResult`] - `Result<Flow, EventError>`
//!
//! ## Flow control
//! ```text
//! Ok(Flow::Continue)   ─► next handler in the bucket, then next bubble level
//! Ok(Flow::Stop)       ─► skip remaining handlers, stop bubbling
//! Ok(Flow::Defer(fut)) ─► like Continue; the causal entry lives until `fut` completes
//! Err(e)               ─► abort dispatch, `e` reaches the caller of trigger_sync
//! ```

mod handler;
#[cfg(feature = "logging")]
mod log;

pub(crate) use handler::next_handler_id;
pub use handler::{Flow, Handler, HandlerResult};
#[cfg(feature = "logging")]
pub use log::LogWriter;
