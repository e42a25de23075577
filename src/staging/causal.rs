//! # Causal event stack.
//!
//! Records which events are currently being handled. Whenever a handler runs,
//! the dispatcher pushes the event it handles; any event spawned while it is
//! linked picks the most recent linked entry as its `original_event`.
//!
//! ## Out-of-order removal
//! Handlers returning [`Flow::Defer`](crate::Flow::Defer) keep their entry until the
//! deferred tail finishes, which may be long after handlers pushed later have
//! returned. The stack is therefore a doubly linked list in an arena, and each
//! push hands back a [`CausalEntry`] that unlinks exactly its own node when
//! dropped.
//!
//! ```text
//! push(A) → a   push(B) → b   push(C) → c
//! [A] ⇄ [B] ⇄ [C]      top() = C
//! drop(b)
//! [A] ⇄ [C]            top() = C
//! drop(c)
//! [A]                  top() = A
//! ```
//!
//! ## Rules
//! - Slots are generation-checked; a stale entry never unlinks a reused slot.
//! - Dropping an entry is the only way to remove a node (always-remove-on-exit).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::events::Event;

struct Node {
    event: Event,
    prev: Option<usize>,
    next: Option<usize>,
}

struct Slot {
    generation: u64,
    node: Option<Node>,
}

#[derive(Default)]
struct Arena {
    slots: Vec<Slot>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl Arena {
    fn push(&mut self, event: Event) -> (usize, u64) {
        let node = Node {
            event,
            prev: self.tail,
            next: None,
        };
        let index = match self.free.pop() {
            Some(i) => {
                let slot = &mut self.slots[i];
                slot.generation += 1;
                slot.node = Some(node);
                i
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        };

        if let Some(t) = self.tail {
            if let Some(n) = self.slots[t].node.as_mut() {
                n.next = Some(index);
            }
        } else {
            self.head = Some(index);
        }
        self.tail = Some(index);
        self.len += 1;
        (index, self.slots[index].generation)
    }

    fn unlink(&mut self, index: usize, generation: u64) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        if slot.generation != generation {
            return false;
        }
        let Some(node) = slot.node.take() else {
            return false;
        };

        match node.prev {
            Some(p) => {
                if let Some(n) = self.slots[p].node.as_mut() {
                    n.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(nx) => {
                if let Some(n) = self.slots[nx].node.as_mut() {
                    n.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }

        self.free.push(index);
        self.len -= 1;
        true
    }

    fn is_linked(&self, index: usize, generation: u64) -> bool {
        self.slots
            .get(index)
            .is_some_and(|s| s.generation == generation && s.node.is_some())
    }

    fn top(&self) -> Option<Event> {
        let t = self.tail?;
        self.slots[t].node.as_ref().map(|n| n.event.clone())
    }

    fn events(&self) -> Vec<Event> {
        let mut out = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while let Some(i) = cursor {
            let Some(node) = self.slots[i].node.as_ref() else {
                break;
            };
            out.push(node.event.clone());
            cursor = node.next;
        }
        out
    }
}

/// Shared stack of events currently being handled.
#[derive(Clone, Default)]
pub struct CausalStack {
    arena: Rc<RefCell<Arena>>,
}

impl CausalStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Links `event` as the newest entry.
    ///
    /// The event stays linked until the returned entry is dropped.
    #[must_use = "dropping the entry unlinks the event immediately"]
    pub fn push(&self, event: &Event) -> CausalEntry {
        let (index, generation) = self.arena.borrow_mut().push(event.clone());
        CausalEntry {
            arena: Rc::clone(&self.arena),
            index,
            generation,
        }
    }

    /// Most recently pushed event that is still linked.
    pub fn top(&self) -> Option<Event> {
        self.arena.borrow().top()
    }

    /// Number of linked events.
    pub fn len(&self) -> usize {
        self.arena.borrow().len
    }

    /// True when nothing is linked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linked events, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.arena.borrow().events()
    }
}

impl fmt::Debug for CausalStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CausalStack")
            .field("len", &self.len())
            .finish()
    }
}

/// Handle to one linked event; unlinks it on drop.
pub struct CausalEntry {
    arena: Rc<RefCell<Arena>>,
    index: usize,
    generation: u64,
}

impl CausalEntry {
    /// True while the entry's event is still on the stack.
    pub fn is_linked(&self) -> bool {
        self.arena.borrow().is_linked(self.index, self.generation)
    }
}

impl Drop for CausalEntry {
    fn drop(&mut self) {
        self.arena.borrow_mut().unlink(self.index, self.generation);
    }
}

impl fmt::Debug for CausalEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CausalEntry")
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventSpace;

    fn events(n: usize) -> Vec<Event> {
        let space = EventSpace::new();
        (0..n)
            .map(|i| space.spawn_event(&format!("e{i}")).unwrap())
            .collect()
    }

    #[test]
    fn test_top_follows_pushes() {
        let evs = events(2);
        let stack = CausalStack::new();
        assert!(stack.top().is_none());

        let _a = stack.push(&evs[0]);
        let b = stack.push(&evs[1]);
        assert!(stack.top().unwrap().same_as(&evs[1]));

        drop(b);
        assert!(stack.top().unwrap().same_as(&evs[0]));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_out_of_order_removal() {
        let evs = events(3);
        let stack = CausalStack::new();
        let a = stack.push(&evs[0]);
        let b = stack.push(&evs[1]);
        let c = stack.push(&evs[2]);

        drop(b);
        let names: Vec<_> = stack.events().iter().map(|e| e.event_name().to_string()).collect();
        assert_eq!(names, ["e0", "e2"]);

        drop(c);
        assert!(stack.top().unwrap().same_as(&evs[0]));
        drop(a);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_reused_slot_ignores_stale_entry() {
        let evs = events(2);
        let stack = CausalStack::new();

        let a = stack.push(&evs[0]);
        let (index, generation) = (a.index, a.generation);
        drop(a);

        let b = stack.push(&evs[1]);
        assert_eq!(b.index, index);
        assert!(!stack.arena.borrow_mut().unlink(index, generation));
        assert!(b.is_linked());
        assert_eq!(stack.len(), 1);
    }
}
