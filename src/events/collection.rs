//! # Events produced by one broadcast.
//!
//! An [`EventCollection`] is keyed by the canonical string of each member's
//! address, plus [`EventCollection::MAIN_KEY`] for the bubbling main member
//! spawned at the broadcast root.

use std::collections::BTreeMap;

use crate::events::Event;

/// Sibling events spawned by [`Event::broadcast_sync`].
#[derive(Debug, Clone)]
pub struct EventCollection {
    event_name: String,
    main: Event,
    members: BTreeMap<String, Event>,
}

impl EventCollection {
    /// Reserved key of the main member.
    pub const MAIN_KEY: &'static str = "@main";

    pub(crate) fn new(event_name: &str, main: Event, members: Vec<(String, Event)>) -> Self {
        Self {
            event_name: event_name.to_string(),
            main,
            members: members.into_iter().collect(),
        }
    }

    /// Name shared by every member.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// The bubbling member at the broadcast root.
    pub fn main(&self) -> &Event {
        &self.main
    }

    /// Member by key: a canonical path string or [`Self::MAIN_KEY`].
    pub fn get(&self, key: &str) -> Option<&Event> {
        if key == Self::MAIN_KEY {
            return Some(&self.main);
        }
        self.members.get(key)
    }

    /// Non-main members in address order.
    pub fn members(&self) -> impl Iterator<Item = (&str, &Event)> {
        self.members.iter().map(|(k, ev)| (k.as_str(), ev))
    }

    /// Every member, main last.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Event)> {
        self.members()
            .chain(std::iter::once((Self::MAIN_KEY, &self.main)))
    }

    /// Number of members including main.
    pub fn len(&self) -> usize {
        self.members.len() + 1
    }

    /// Always false: a collection holds at least its main member.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// True if any member invoked a handler.
    pub fn any_handled(&self) -> bool {
        self.iter().any(|(_, ev)| ev.handled())
    }

    /// True if any member had its default prevented.
    pub fn any_default_prevented(&self) -> bool {
        self.iter().any(|(_, ev)| ev.default_prevented())
    }

    /// First member (main last) satisfying `pred`.
    pub fn find(&self, pred: impl Fn(&Event) -> bool) -> Option<&Event> {
        self.iter().map(|(_, ev)| ev).find(|ev| pred(ev))
    }
}
