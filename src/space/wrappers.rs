//! Handler wrappers installed by `subscribe_to_until_triggered` and
//! `delegate_subscription_to`.
//!
//! Both read the event's current path at call time instead of capturing the
//! subscription path, so an installed wrapper keeps working when it is moved to
//! another address.

use std::cell::Cell;
use std::rc::Rc;

use crate::handlers::{next_handler_id, Flow, Handler};
use crate::path::Path;

/// Wraps `handler` so it runs once, then unsubscribes itself.
///
/// Returns the wrapper and its fired flag.
pub(crate) fn once(event_name: &str, handler: Handler) -> (Handler, Rc<Cell<bool>>) {
    let id = next_handler_id();
    let fired = Rc::new(Cell::new(false));
    let flag = Rc::clone(&fired);
    let name = event_name.to_string();
    let label = format!("once({})", handler.name());

    let wrapper = Handler::with_id(id, label, move |ev| {
        if flag.replace(true) {
            return Ok(Flow::Continue);
        }
        ev.space().remove_handler(&name, &ev.current_path(), id);
        handler.call(ev)
    });
    (wrapper, fired)
}

/// Wraps `handler` so it only sees events aimed at `relative` below the
/// subscription address.
pub(crate) fn delegate(relative: Path, handler: Handler) -> Handler {
    let label = format!("delegate({})", handler.name());
    Handler::named(label, move |ev| {
        let delegate = ev.current_path().join(&relative);
        let targeted = ev.original_path().is_relative_to(&delegate)
            || ev
                .broadcast_path()
                .is_some_and(|root| delegate.is_relative_to(&root));
        if !targeted {
            return Ok(Flow::Continue);
        }

        let dup = ev.duplicate();
        dup.set_current_path(delegate);
        let flow = handler.call(&dup);
        ev.absorb(&dup);
        flow
    })
}
