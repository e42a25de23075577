//! # LogWriter: simple event recorder
//!
//! A minimal handler that records every event it sees through `tracing`.
//! Use it for tests or demos; subscribe it at `/` to observe all bubbling traffic.
//!
//! ## Example output (with a fmt subscriber)
//! ```text
//! INFO eventspace: [event] name="save" path=/doc/1 origin=/doc/1 seq=12 handled=false
//! INFO eventspace: [event] name="save" path=/doc origin=/doc/1 seq=12 handled=true
//! INFO eventspace: [broadcast] name="refresh" path=/list/3 under=/list seq=14
//! ```

use tracing::info;

use crate::events::Event;
use crate::handlers::{Flow, Handler};

/// Event recorder handler.
#[derive(Default, Debug, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Builds the handler to subscribe.
    #[must_use]
    pub fn handler(self) -> Handler {
        Handler::named("LogWriter", |e: &Event| {
            match e.broadcast_path() {
                Some(under) => info!(
                    target: "eventspace",
                    "[broadcast] name={:?} path={} under={} seq={}",
                    e.event_name(),
                    e.current_path(),
                    under,
                    e.seq()
                ),
                None => info!(
                    target: "eventspace",
                    "[event] name={:?} path={} origin={} seq={} handled={}",
                    e.event_name(),
                    e.current_path(),
                    e.original_path(),
                    e.seq(),
                    e.handled()
                ),
            }
            Ok(Flow::Continue)
        })
    }
}

impl From<LogWriter> for Handler {
    fn from(w: LogWriter) -> Self {
        w.handler()
    }
}
