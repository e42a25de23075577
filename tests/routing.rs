//! End-to-end routing: bubbling, broadcast, delegation, staging and hosts.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use eventspace::{
    EventCollection, EventError, EventSpace, Evented, Flow, Handler, Path, SpaceConfig,
};
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn p(s: &str) -> Path {
    Path::parse(s).unwrap()
}

type Log = Rc<RefCell<Vec<String>>>;

fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn tagged(log: &Log, tag: &str) -> Handler {
    let log = Rc::clone(log);
    let tag = tag.to_string();
    Handler::named(tag.clone(), move |_| {
        log.borrow_mut().push(tag.clone());
        Ok(Flow::Continue)
    })
}

#[test]
fn bubbling_visits_each_ancestor_once_in_order() {
    init_tracing();
    let space = EventSpace::new();
    let seen = log();
    space.subscribe_to("e", &p("/"), tagged(&seen, "h3")).unwrap();
    space.subscribe_to("e", &p("/a"), tagged(&seen, "h2")).unwrap();
    space.subscribe_to("e", &p("/a/b"), tagged(&seen, "h1")).unwrap();
    space.subscribe_to("e", &p("/a/c"), tagged(&seen, "sibling")).unwrap();
    space.subscribe_to("other", &p("/a"), tagged(&seen, "other")).unwrap();

    let ev = space.spawn_event("e").unwrap();
    ev.trigger_sync(Some(&p("/a/b"))).unwrap();

    assert_eq!(*seen.borrow(), ["h1", "h2", "h3"]);
    assert!(ev.handled());
}

#[test]
fn handlers_in_one_bucket_fire_in_subscription_order() {
    let space = EventSpace::new();
    let seen = log();
    for tag in ["first", "second", "third"] {
        space.subscribe_to("e", &p("/a"), tagged(&seen, tag)).unwrap();
    }

    space.spawn_event("e").unwrap().trigger_sync(Some(&p("/a"))).unwrap();
    assert_eq!(*seen.borrow(), ["first", "second", "third"]);
}

#[test]
fn stop_at_leaf_prevents_ancestors() {
    let space = EventSpace::new();
    let seen = log();
    space.subscribe_to("e", &p("/"), tagged(&seen, "root")).unwrap();
    space.subscribe_to("e", &p("/a"), tagged(&seen, "a")).unwrap();
    space
        .subscribe_to("e", &p("/a/b"), Handler::new(|_| Ok(Flow::Stop)))
        .unwrap();

    let ev = space.spawn_event("e").unwrap();
    ev.trigger_sync(Some(&p("/a/b"))).unwrap();

    assert!(seen.borrow().is_empty());
    assert!(ev.handled());
    assert!(ev.propagation_stopped());
}

#[test]
fn query_subscription_only_sees_query_triggers() {
    let space = EventSpace::new();
    let seen = log();
    space.subscribe_to("e", &p("?/list/*"), tagged(&seen, "query")).unwrap();
    space.subscribe_to("e", &p("/"), tagged(&seen, "root")).unwrap();

    space.spawn_event("e").unwrap().trigger_sync(Some(&p("?/list/*"))).unwrap();
    space.spawn_event("e").unwrap().trigger_sync(Some(&p("/list/1"))).unwrap();

    assert_eq!(*seen.borrow(), ["query", "root"]);
}

#[test]
fn broadcast_hits_each_descendant_then_main() {
    let space = EventSpace::new();
    let seen = log();
    space.subscribe_to("refresh", &p("/"), tagged(&seen, "/")).unwrap();
    space.subscribe_to("refresh", &p("/l"), tagged(&seen, "/l")).unwrap();
    space.subscribe_to("refresh", &p("/l/1"), tagged(&seen, "/l/1")).unwrap();
    space.subscribe_to("refresh", &p("/l/2/x"), tagged(&seen, "/l/2/x")).unwrap();
    space.subscribe_to("refresh", &p("/m"), tagged(&seen, "/m")).unwrap();

    let ev = space.spawn_event("refresh").unwrap();
    ev.set_payload_item("force", true);
    let collection = ev.broadcast_sync(Some(&p("/l"))).unwrap();

    assert_eq!(*seen.borrow(), ["/l/1", "/l/2/x", "/l", "/"]);
    let keys: Vec<&str> = collection.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, ["/l/1", "/l/2/x", EventCollection::MAIN_KEY]);
    assert!(collection
        .iter()
        .all(|(_, m)| m.payload_item("force") == Some(json!(true))));
}

#[test]
fn unsubscribe_is_idempotent() {
    let space = EventSpace::new();
    let seen = log();
    let h = tagged(&seen, "h");
    space.subscribe_to("e", &p("/a"), h.clone()).unwrap();
    space.subscribe_to("e", &p("/a"), tagged(&seen, "other")).unwrap();

    space.unsubscribe_from(Some("e"), Some(&p("/a")), Some(&h));
    space.unsubscribe_from(Some("e"), Some(&p("/a")), Some(&h));
    space.unsubscribe_from(Some("missing"), Some(&p("/nowhere")), None);

    space.spawn_event("e").unwrap().trigger_sync(Some(&p("/a"))).unwrap();
    assert_eq!(*seen.borrow(), ["other"]);
}

#[test]
fn staged_payload_persists_until_deleted() {
    let space = EventSpace::new();
    space.set_next_payload_items("foo", [("k", json!(1)), ("j", json!("x"))]);

    for _ in 0..2 {
        let ev = space.spawn_event("foo").unwrap();
        assert_eq!(ev.payload_item("k"), Some(json!(1)));
        assert_eq!(ev.payload_item("j"), Some(json!("x")));
    }

    space.delete_next_payload_items("foo");
    assert!(space.spawn_event("foo").unwrap().payload().is_empty());
}

#[test]
fn nested_spawn_links_causal_chain() {
    let space = EventSpace::new();
    let saved = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&saved);

    space
        .subscribe_to("click", &p("/"), Handler::new(|ev| {
            ev.space().spawn_event("select")?.trigger_sync(None)?;
            Ok(Flow::Continue)
        }))
        .unwrap();
    space
        .subscribe_to("select", &p("/"), Handler::new(move |ev| {
            let save = ev.space().spawn_event("save")?;
            *slot.borrow_mut() = Some(save);
            Ok(Flow::Continue)
        }))
        .unwrap();

    let click = space.spawn_event_of_kind("click", "pointer").unwrap();
    click.trigger_sync(Some(&p("/form"))).unwrap();

    let save = saved.borrow_mut().take().unwrap();
    assert_eq!(save.original_event().unwrap().event_name(), "select");
    assert!(save.get_original_event_by_name("click").unwrap().same_as(&click));
    assert!(save.get_original_event_by_type("pointer").unwrap().same_as(&click));
    assert!(space.causal_stack().is_empty());
}

#[test]
fn delegation_sees_forged_path_and_reports_back() {
    let space = EventSpace::new();
    let seen = log();
    let sink = Rc::clone(&seen);
    space
        .delegate_subscription_to("click", &p("/list"), &p("/list/item"), Handler::new(move |ev| {
            sink.borrow_mut().push(ev.current_path().to_string());
            ev.set_payload_item("handled_by", "delegate");
            ev.prevent_default();
            Ok(Flow::Continue)
        }))
        .unwrap();

    let ev = space.spawn_event("click").unwrap();
    ev.trigger_sync(Some(&p("/list/item/icon"))).unwrap();

    assert_eq!(*seen.borrow(), ["/list/item"]);
    assert!(ev.default_prevented());
    assert_eq!(ev.payload_item("handled_by"), Some(json!("delegate")));
    assert_eq!(ev.current_path(), Path::root());
}

#[test]
fn handler_errors_reach_the_caller() {
    let space = EventSpace::new();
    let seen = log();
    space.subscribe_to("e", &p("/a"), tagged(&seen, "before")).unwrap();
    space
        .subscribe_to("e", &p("/a"), Handler::new(|_| Err(EventError::handler("nope"))))
        .unwrap();
    space.subscribe_to("e", &p("/a"), tagged(&seen, "after")).unwrap();

    let err = space
        .spawn_event("e")
        .unwrap()
        .trigger_sync(Some(&p("/a/b")))
        .unwrap_err();

    assert!(err.is_handler_failure());
    assert_eq!(*seen.borrow(), ["before"]);
}

#[test]
fn hosts_follow_relocation_without_leaks() {
    let space = EventSpace::with_config(SpaceConfig::default().named("ui"));
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    let item = Evented::with_base(&space, p("/list"), p("/list/1")).unwrap();
    item.subscribe_to("refresh", Handler::new(move |_| {
        counter.set(counter.get() + 1);
        Ok(Flow::Continue)
    }))
    .unwrap();

    item.set_event_path(p("/list/7")).unwrap();
    let parent = Evented::new(&space, p("/list"));
    let collection = parent.broadcast_sync("refresh").unwrap();

    assert_eq!(hits.get(), 1);
    assert!(collection.get("/list/7").is_some());
    assert!(collection.get("/list/1").is_none());

    drop(item);
    assert!(space.is_empty());
}

#[test]
fn broadcast_error_skips_remaining_members() {
    let space = EventSpace::new();
    let seen = log();
    space.subscribe_to("refresh", &p("/l"), tagged(&seen, "main")).unwrap();
    space.subscribe_to("refresh", &p("/l/1"), tagged(&seen, "/l/1")).unwrap();
    space
        .subscribe_to("refresh", &p("/l/2"), Handler::new(|_| Err(EventError::handler("stale"))))
        .unwrap();
    space.subscribe_to("refresh", &p("/l/3"), tagged(&seen, "/l/3")).unwrap();

    let err = space
        .spawn_event("refresh")
        .unwrap()
        .broadcast_sync(Some(&p("/l")))
        .unwrap_err();

    assert_eq!(
        err,
        EventError::HandlerFailed {
            event: "refresh".into(),
            path: "/l/2".into(),
            reason: "stale".into(),
        }
    );
    assert_eq!(*seen.borrow(), ["/l/1"]);
    assert!(space.causal_stack().is_empty());
}

#[test]
fn error_mid_bucket_keeps_prior_effects() {
    let space = EventSpace::new();
    let seen = log();
    let first = Rc::clone(&seen);
    space
        .subscribe_to("save", &p("/doc"), Handler::new(move |ev| {
            first.borrow_mut().push("first".into());
            ev.set_payload_item("saved", true);
            ev.prevent_default();
            Ok(Flow::Continue)
        }))
        .unwrap();
    space
        .subscribe_to("save", &p("/doc"), Handler::new(|_| Err(EventError::handler("disk full"))))
        .unwrap();
    space.subscribe_to("save", &p("/doc"), tagged(&seen, "third")).unwrap();
    space.subscribe_to("save", &p("/"), tagged(&seen, "root")).unwrap();

    let ev = space.spawn_event("save").unwrap();
    let err = ev.trigger_sync(Some(&p("/doc"))).unwrap_err();

    assert!(err.is_handler_failure());
    assert_eq!(*seen.borrow(), ["first"]);
    assert_eq!(ev.payload_item("saved"), Some(json!(true)));
    assert!(ev.default_prevented());
    assert_eq!(ev.current_path(), p("/doc"));
    assert!(space.causal_stack().is_empty());
}
