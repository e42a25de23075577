//! # Payload staging store.
//!
//! Lets code that does not spawn an event still contribute to its payload.
//! Staged items are keyed by event name and are **read, not consumed**: every
//! event of that name spawned afterwards receives them until they are deleted.
//!
//! ## Example
//! ```rust
//! use eventspace::PayloadStaging;
//! use serde_json::json;
//!
//! let staging = PayloadStaging::new();
//! staging.set_next_payload_item("save", "user", 7);
//!
//! assert_eq!(staging.payload_for("save").unwrap()["user"], json!(7));
//! staging.delete_next_payload_item("save", "user");
//! assert!(staging.payload_for("save").is_none());
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;
use tracing::trace;

use crate::events::Payload;

/// Durable event name → payload items map.
#[derive(Clone, Default, Debug)]
pub struct PayloadStaging {
    items: Rc<RefCell<HashMap<String, Payload>>>,
}

impl PayloadStaging {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages one item for every future `event_name` event.
    pub fn set_next_payload_item(
        &self,
        event_name: &str,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) {
        let key = key.into();
        trace!(event = event_name, key = %key, "PayloadStaging::set_next_payload_item");
        self.items
            .borrow_mut()
            .entry(event_name.to_string())
            .or_default()
            .insert(key, value.into());
    }

    /// Stages several items at once; existing keys are overwritten.
    pub fn set_next_payload_items<I, K, V>(&self, event_name: &str, items: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut store = self.items.borrow_mut();
        let staged = store.entry(event_name.to_string()).or_default();
        for (k, v) in items {
            staged.insert(k.into(), v.into());
        }
    }

    /// Removes one staged item, returning it.
    pub fn delete_next_payload_item(&self, event_name: &str, key: &str) -> Option<Value> {
        let mut store = self.items.borrow_mut();
        let staged = store.get_mut(event_name)?;
        let removed = staged.remove(key);
        if staged.is_empty() {
            store.remove(event_name);
        }
        removed
    }

    /// Removes every staged item for `event_name`, returning them.
    pub fn delete_next_payload_items(&self, event_name: &str) -> Option<Payload> {
        self.items.borrow_mut().remove(event_name)
    }

    /// Copy of the items staged for `event_name`.
    pub fn payload_for(&self, event_name: &str) -> Option<Payload> {
        self.items.borrow().get(event_name).cloned()
    }

    /// True when nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Merges the items staged for `event_name` into `payload`.
    pub(crate) fn merge_into(&self, event_name: &str, payload: &mut Payload) {
        if let Some(staged) = self.items.borrow().get(event_name) {
            for (k, v) in staged {
                payload.insert(k.clone(), v.clone());
            }
        }
    }
}
