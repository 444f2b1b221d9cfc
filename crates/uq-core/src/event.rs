//! Valueless, fire-once notifications such as command buttons.

use std::cell::RefCell;
use std::rc::Rc;

use crate::cell::{Listener, Notifier};
use crate::combine::Listenable;

/// Host-side command trigger (a button).
#[derive(Clone, Default)]
pub struct Trigger {
    handlers: Rc<RefCell<Vec<Rc<dyn Fn()>>>>,
}

impl Trigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self) {
        let handlers = self.handlers.borrow().clone();
        for handler in handlers {
            handler();
        }
    }

    pub fn on_fire(&self, handler: Rc<dyn Fn()>) {
        self.handlers.borrow_mut().push(handler);
    }
}

/// A stream of unit notifications with no stored value and no replay.
#[derive(Clone)]
pub struct EventSource {
    listen: Notifier,
}

impl EventSource {
    pub fn make(listen: Notifier) -> Self {
        Self { listen }
    }

    pub fn from_trigger(trigger: &Trigger) -> Self {
        let trigger = trigger.clone();
        Self::make(Rc::new(move |handler| trigger.on_fire(handler)))
    }

    pub fn subscribe(&self, listener: impl Fn() + 'static) {
        (self.listen)(Rc::new(listener));
    }
}

impl Listenable for EventSource {
    type Item = ();

    fn listen(&self, listener: Listener<()>) {
        (self.listen)(Rc::new(move || listener(())));
    }
}
