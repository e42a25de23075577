//! # Subscription registry and dispatch.
//!
//! - [`EventSpace`] the router: subscriptions, event spawning, dispatch
//! - [`EventSpaceBuilder`] injects shared staging/causal services
//! - [`HandlerCall`] outcome of dispatching one (path, event) bucket
//! - [`WeakEventSpace`] non-owning handle for handlers that keep a space around

mod builder;
mod registry;
#[allow(clippy::module_inception)]
mod space;
mod wrappers;

pub use builder::EventSpaceBuilder;
pub use space::{EventSpace, HandlerCall, WeakEventSpace};
pub(crate) use wrappers::once as once_wrapper;
