//! Deferred handler tails keep their event on the causal stack until they settle.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use eventspace::{Event, EventSpace, Flow, Handler, Path};
use tokio::sync::oneshot;

#[tokio::test(flavor = "current_thread")]
async fn deferred_tail_links_events_spawned_after_a_gap() {
    let space = EventSpace::new();
    let spawned: Rc<RefCell<Option<Event>>> = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&spawned);

    space
        .subscribe_to("load", &Path::root(), Handler::new(move |ev| {
            let space = ev.space().clone();
            let slot = Rc::clone(&slot);
            Ok(Flow::defer(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                if let Ok(next) = space.spawn_event("loaded") {
                    *slot.borrow_mut() = Some(next);
                }
            }))
        }))
        .unwrap();

    let load = space.spawn_event("load").unwrap();
    load.trigger_sync(Some(&Path::parse("/doc").unwrap())).unwrap();

    assert_eq!(space.pending_deferred(), 1);
    assert!(space.causal_stack().top().unwrap().same_as(&load));
    assert!(space.spawn_event("meanwhile").unwrap().original_event().is_some());

    space.settle_deferred().await;

    let loaded = spawned.borrow_mut().take().unwrap();
    assert!(loaded.original_event().unwrap().same_as(&load));
    assert!(space.causal_stack().is_empty());
    assert_eq!(space.pending_deferred(), 0);
}

#[tokio::test(flavor = "current_thread")]
async fn bubbling_does_not_wait_for_deferred_tails() {
    let space = EventSpace::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    let (tx, rx) = oneshot::channel::<()>();
    let rx = Rc::new(RefCell::new(Some(rx)));

    let tail_order = Rc::clone(&order);
    space
        .subscribe_to("e", &Path::parse("/a").unwrap(), Handler::new(move |_| {
            let order = Rc::clone(&tail_order);
            let rx = rx.borrow_mut().take();
            Ok(Flow::defer(async move {
                if let Some(rx) = rx {
                    let _ = rx.await;
                }
                order.borrow_mut().push("tail");
            }))
        }))
        .unwrap();
    let root_order = Rc::clone(&order);
    space
        .subscribe_to("e", &Path::root(), Handler::new(move |_| {
            root_order.borrow_mut().push("root");
            Ok(Flow::Continue)
        }))
        .unwrap();

    let ev = space.spawn_event("e").unwrap();
    ev.trigger_sync(Some(&Path::parse("/a").unwrap())).unwrap();
    assert_eq!(*order.borrow(), ["root"]);
    assert_eq!(space.causal_stack().len(), 1);

    tx.send(()).unwrap();
    space.settle_deferred().await;

    assert_eq!(*order.borrow(), ["root", "tail"]);
    assert!(space.causal_stack().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn tails_queued_while_settling_are_driven_too() {
    let space = EventSpace::new();
    let finished = Rc::new(RefCell::new(Vec::new()));

    let log = Rc::clone(&finished);
    space
        .subscribe_to("second", &Path::root(), Handler::new(move |_| {
            let log = Rc::clone(&log);
            Ok(Flow::defer(async move {
                log.borrow_mut().push("second");
            }))
        }))
        .unwrap();
    let log = Rc::clone(&finished);
    space
        .subscribe_to("first", &Path::root(), Handler::new(move |ev| {
            let space = ev.space().clone();
            let log = Rc::clone(&log);
            Ok(Flow::defer(async move {
                tokio::task::yield_now().await;
                if let Ok(next) = space.spawn_event("second") {
                    let _ = next.trigger_sync(None);
                }
                log.borrow_mut().push("first");
            }))
        }))
        .unwrap();

    space.spawn_event("first").unwrap().trigger_sync(None).unwrap();
    space.settle_deferred().await;

    assert_eq!(*finished.borrow(), ["first", "second"]);
    assert_eq!(space.pending_deferred(), 0);
    assert!(space.causal_stack().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn unsettled_tail_stays_causal_top_until_settled() {
    let space = EventSpace::new();
    space
        .subscribe_to("load", &Path::root(), Handler::new(|_| Ok(Flow::defer(async {}))))
        .unwrap();

    let load = space.spawn_event("load").unwrap();
    load.trigger_sync(None).unwrap();

    for name in ["later", "much_later"] {
        let ev = space.spawn_event(name).unwrap();
        assert!(ev.original_event().unwrap().same_as(&load));
    }

    space.settle_deferred().await;
    assert!(space.spawn_event("after").unwrap().original_event().is_none());
    assert_eq!(space.pending_deferred(), 0);
}
