//! # Components with an address.
//!
//! - [`Evented`] host state: one space, one address, the subscriptions installed from it
//! - [`Subscribable`], [`Bubbling`], [`Broadcastable`] capabilities a component
//!   opts into by exposing its `Evented`

mod capability;
mod host;

pub use capability::{Broadcastable, Bubbling, Subscribable};
pub use host::Evented;
