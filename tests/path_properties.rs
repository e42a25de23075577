//! Property-based tests for path relations.
//!
//! Uses proptest to validate:
//! - Canonical strings round-trip through the parser
//! - Every prefix of a path is one of its ancestors
//! - Bubbling from a path visits exactly its ancestors, once each
//! - `strip_prefix` and `join` are inverse

use std::cell::RefCell;
use std::rc::Rc;

use eventspace::{EventSpace, Flow, Handler, Path};
use proptest::prelude::*;

fn segments() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z0-9]{1,4}", 0..6)
}

proptest! {
    /// Property: parse(to_string(p)) == p
    #[test]
    fn prop_canonical_round_trip(segs in segments()) {
        let path = Path::new(segs.clone()).unwrap();
        prop_assert_eq!(Path::parse(&path.to_string()).unwrap(), path.clone());

        let query = Path::query(segs).unwrap();
        prop_assert_eq!(Path::parse(&query.to_string()).unwrap(), query);
    }

    /// Property: each prefix is an ancestor, and nothing else of the same length is
    #[test]
    fn prop_prefixes_are_ancestors(segs in segments(), other in "[A-Z]{1,3}") {
        let path = Path::new(segs.clone()).unwrap();
        for n in 0..=segs.len() {
            let prefix = Path::new(segs[..n].to_vec()).unwrap();
            prop_assert!(path.is_relative_to(&prefix));
            prop_assert!(prefix.is_root_of(&path));

            if n > 0 {
                let mut changed = segs[..n].to_vec();
                changed[n - 1] = other.clone();
                prop_assert!(!path.is_relative_to(&Path::new(changed).unwrap()));
            }
        }
    }

    /// Property: strip_prefix then join gives the original path back
    #[test]
    fn prop_strip_then_join(segs in segments(), cut in 0usize..6) {
        let path = Path::new(segs.clone()).unwrap();
        let cut = cut.min(segs.len());
        let base = Path::new(segs[..cut].to_vec()).unwrap();

        let rest = path.strip_prefix(&base).unwrap();
        prop_assert_eq!(rest.len(), segs.len() - cut);
        prop_assert_eq!(base.join(&rest), path);
    }

    /// Property: a bubbling trigger reaches every ancestor exactly once, leaf first
    #[test]
    fn prop_bubbling_visits_ancestors_once(segs in segments()) {
        let space = EventSpace::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for n in 0..=segs.len() {
            let at = Path::new(segs[..n].to_vec()).unwrap();
            let seen = Rc::clone(&seen);
            space
                .subscribe_to("e", &at, Handler::new(move |_| {
                    seen.borrow_mut().push(n);
                    Ok(Flow::Continue)
                }))
                .unwrap();
        }

        let target = Path::new(segs.clone()).unwrap();
        space.spawn_event("e").unwrap().trigger_sync(Some(&target)).unwrap();

        let expected: Vec<usize> = (0..=segs.len()).rev().collect();
        prop_assert_eq!(&*seen.borrow(), &expected);
    }
}
