//! # Event space configuration.
//!
//! Provides [`SpaceConfig`], the settings an [`EventSpace`](crate::EventSpace) is built with.
//!
//! ## Sentinel values
//! - `max_dispatch_depth = 0` → unlimited nesting of `trigger_sync` calls

use std::borrow::Cow;

/// Settings for one event space.
///
/// ## Field semantics
/// - `name`: label attached to every log record emitted by the space
/// - `max_dispatch_depth`: how many `trigger_sync` calls may be nested inside handlers (`0` = unlimited)
/// - `warn_unhandled`: log a warning when a bubbling trigger reaches the root without any handler
///
/// ## Notes
/// All fields are public. Prefer the helper accessors to avoid sprinkling
/// sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct SpaceConfig {
    /// Label used in log records (`space = ...`).
    pub name: Cow<'static, str>,

    /// Maximum nesting of dispatches started from inside handlers.
    ///
    /// - `0` = unlimited
    /// - `n > 0` = the `n + 1`-th nested `trigger_sync` fails with
    ///   [`EventError::DispatchDepthExceeded`](crate::EventError::DispatchDepthExceeded)
    pub max_dispatch_depth: usize,

    /// Emit a `warn!` record when an event bubbles to the root with no handler invoked.
    pub warn_unhandled: bool,
}

impl SpaceConfig {
    /// Returns the nesting limit as an `Option`.
    ///
    /// - `None` → unlimited
    /// - `Some(n)` → at most `n` nested dispatches
    #[inline]
    pub fn dispatch_limit(&self) -> Option<usize> {
        if self.max_dispatch_depth == 0 {
            None
        } else {
            Some(self.max_dispatch_depth)
        }
    }

    /// Returns a copy with a different name.
    #[must_use]
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }
}

impl Default for SpaceConfig {
    /// Default configuration:
    ///
    /// - `name = "eventspace"`
    /// - `max_dispatch_depth = 256`
    /// - `warn_unhandled = false`
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("eventspace"),
            max_dispatch_depth: 256,
            warn_unhandled: false,
        }
    }
}
