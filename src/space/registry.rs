//! # Subscription registry.
//!
//! Path-and-name indexed store of ordered handler lists.
//!
//! ```text
//! BTreeMap<path key, PathEntry>
//!   "/a"    → { "click": [h1, h2], "key": [h3] }
//!   "/a/b"  → { "click": [h4] }
//!   "?/l/*" → { "click": [h5] }
//! ```
//!
//! ## Rules
//! - Handlers in a bucket keep registration order (FIFO).
//! - Empty buckets are removed, and so are path entries without buckets.
//! - Keys are canonical path strings, so every descendant of `/a` sorts into
//!   the contiguous range of keys starting with `/a`.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use crate::handlers::Handler;
use crate::path::Path;

struct PathEntry {
    path: Path,
    buckets: HashMap<String, Vec<Handler>>,
}

/// Ordered handler lists keyed by (path, event name).
#[derive(Default)]
pub(crate) struct Registry {
    paths: BTreeMap<String, PathEntry>,
}

impl Registry {
    /// Appends `handler` to the (path, event) bucket.
    pub(crate) fn add(&mut self, path: &Path, event_name: &str, handler: Handler) {
        self.paths
            .entry(path.key())
            .or_insert_with(|| PathEntry {
                path: path.clone(),
                buckets: HashMap::new(),
            })
            .buckets
            .entry(event_name.to_string())
            .or_default()
            .push(handler);
    }

    /// Removes the first handler with identity `id` and hands it back.
    ///
    /// Removed handlers are returned rather than dropped so the caller can
    /// release its registry borrow first; dropping a handler may run arbitrary
    /// destructors that reach back into the space.
    pub(crate) fn remove_handler(
        &mut self,
        key: &str,
        event_name: &str,
        id: u64,
    ) -> Option<Handler> {
        let entry = self.paths.get_mut(key)?;
        let bucket = entry.buckets.get_mut(event_name)?;
        let pos = bucket.iter().position(|h| h.id() == id)?;
        let removed = bucket.remove(pos);
        if bucket.is_empty() {
            entry.buckets.remove(event_name);
        }
        if entry.buckets.is_empty() {
            self.paths.remove(key);
        }
        Some(removed)
    }

    /// Removes a whole bucket and hands its handlers back.
    pub(crate) fn remove_bucket(&mut self, key: &str, event_name: &str) -> Vec<Handler> {
        let Some(entry) = self.paths.get_mut(key) else {
            return Vec::new();
        };
        let removed = entry.buckets.remove(event_name).unwrap_or_default();
        if entry.buckets.is_empty() {
            self.paths.remove(key);
        }
        removed
    }

    /// Removes every bucket at a path and hands the handlers back.
    pub(crate) fn remove_path(&mut self, key: &str) -> Vec<Handler> {
        self.paths
            .remove(key)
            .map(|e| e.buckets.into_values().flatten().collect())
            .unwrap_or_default()
    }

    /// Removes everything and hands the handlers back.
    pub(crate) fn clear(&mut self) -> Vec<Handler> {
        std::mem::take(&mut self.paths)
            .into_values()
            .flat_map(|e| e.buckets.into_values().flatten())
            .collect()
    }

    /// Copy of a bucket, taken before dispatching it.
    pub(crate) fn snapshot(&self, key: &str, event_name: &str) -> Vec<Handler> {
        self.paths
            .get(key)
            .and_then(|e| e.buckets.get(event_name))
            .cloned()
            .unwrap_or_default()
    }

    /// Handlers in one bucket.
    pub(crate) fn handler_count(&self, key: &str, event_name: &str) -> usize {
        self.paths
            .get(key)
            .and_then(|e| e.buckets.get(event_name))
            .map_or(0, Vec::len)
    }

    /// Handlers across all buckets.
    pub(crate) fn handler_total(&self) -> usize {
        self.paths
            .values()
            .flat_map(|e| e.buckets.values())
            .map(Vec::len)
            .sum()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Subscribed paths for `event_name` equal to or below `path`, in key order.
    pub(crate) fn paths_relative_to(&self, event_name: &str, path: &Path) -> Vec<Path> {
        let prefix = path.key();
        self.paths
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix.as_str()))
            .filter(|(_, entry)| {
                entry.path.is_relative_to(path) && entry.buckets.contains_key(event_name)
            })
            .map(|(_, entry)| entry.path.clone())
            .collect()
    }
}
