//! Error types used by the event space, events and handlers.
//!
//! A single enum, [`EventError`], covers both argument validation (raised before
//! any registry mutation) and failures returned by user handlers, which travel
//! unchanged out of `trigger_sync` / `broadcast_sync` to the original caller.
//!
//! Like the rest of the crate's errors it offers `as_label` / `as_message`
//! helpers for logs and metrics.

use thiserror::Error;

/// # Errors produced by the event space.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// An argument failed validation (empty event name, malformed segment, ...).
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the argument.
        reason: String,
    },

    /// A path was required to be at or below another path but is not.
    #[error("path `{path}` is not relative to `{base}`")]
    NotRelative {
        /// The offending path (stringified).
        path: String,
        /// The path it should have been relative to.
        base: String,
    },

    /// A handler reported a failure.
    ///
    /// Handlers build this with [`EventError::handler`]; the space fills in
    /// `event` and `path` when they are empty.
    #[error("handler for `{event}` at `{path}` failed: {reason}")]
    HandlerFailed {
        /// Name of the event being dispatched.
        event: String,
        /// Address at which the handler was invoked.
        path: String,
        /// The handler's own message.
        reason: String,
    },

    /// Nested dispatch went deeper than [`SpaceConfig::max_dispatch_depth`](crate::SpaceConfig).
    #[error("dispatch of `{event}` exceeded the nesting limit of {limit}")]
    DispatchDepthExceeded {
        /// Name of the event whose dispatch was refused.
        event: String,
        /// The configured limit.
        limit: usize,
    },
}

impl EventError {
    /// Shorthand for [`EventError::InvalidArgument`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        EventError::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Builds a handler failure.
    ///
    /// # Example
    /// ```
    /// use eventspace::EventError;
    ///
    /// let err = EventError::handler("disk full");
    /// assert_eq!(err.as_label(), "handler_failed");
    /// ```
    pub fn handler(reason: impl Into<String>) -> Self {
        EventError::HandlerFailed {
            event: String::new(),
            path: String::new(),
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventspace::EventError;
    ///
    /// let err = EventError::invalid("empty event name");
    /// assert_eq!(err.as_label(), "invalid_argument");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EventError::InvalidArgument { .. } => "invalid_argument",
            EventError::NotRelative { .. } => "path_not_relative",
            EventError::HandlerFailed { .. } => "handler_failed",
            EventError::DispatchDepthExceeded { .. } => "dispatch_depth_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            EventError::InvalidArgument { reason } => format!("invalid argument: {reason}"),
            EventError::NotRelative { path, base } => format!("{path} is outside {base}"),
            EventError::HandlerFailed {
                event,
                path,
                reason,
            } => format!("handler error: event={event} path={path} reason={reason}"),
            EventError::DispatchDepthExceeded { event, limit } => {
                format!("nesting limit {limit} reached while dispatching {event}")
            }
        }
    }

    /// Attaches dispatch context to a handler failure that does not carry it yet.
    pub(crate) fn with_dispatch_context(self, event: &str, path: &str) -> Self {
        match self {
            EventError::HandlerFailed {
                event: ev,
                path: p,
                reason,
            } => EventError::HandlerFailed {
                event: if ev.is_empty() { event.to_string() } else { ev },
                path: if p.is_empty() { path.to_string() } else { p },
                reason,
            },
            other => other,
        }
    }

    /// True when the error was raised by a handler rather than by validation.
    pub fn is_handler_failure(&self) -> bool {
        matches!(self, EventError::HandlerFailed { .. })
    }
}

/// Validates an event name.
pub(crate) fn check_event_name(name: &str) -> Result<(), EventError> {
    if name.is_empty() {
        return Err(EventError::invalid("event name must not be empty"));
    }
    Ok(())
}
