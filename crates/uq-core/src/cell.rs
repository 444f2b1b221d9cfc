//! Observable value cells.
//!
//! A [`ValueCell`] wraps a value owned by something else (a form field, a
//! checkbox) behind `get`/`set`/`subscribe`. The cell never caches: every
//! read goes back to the owner, so a setter that coerces or clamps is always
//! observed faithfully.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::combine::Listenable;

/// Live read of the underlying value.
pub type Getter<T> = Rc<dyn Fn() -> T>;
/// Write-through to the underlying value.
pub type Setter<T> = Rc<dyn Fn(T)>;
/// Registers a change handler with the external owner of a value.
pub type Notifier = Rc<dyn Fn(Rc<dyn Fn()>)>;
/// Receives every value delivered by a cell or combinator.
pub type Listener<T> = Rc<dyn Fn(T)>;

/// An in-memory bound input.
///
/// `assign` is a programmatic write and stays silent; `edit` models a user
/// edit and fires every change handler afterwards.
pub struct Field<T> {
    inner: Rc<FieldInner<T>>,
}

struct FieldInner<T> {
    value: RefCell<T>,
    handlers: RefCell<Vec<Rc<dyn Fn()>>>,
}

impl<T: Clone + 'static> Field<T> {
    /// A field holding `value` with no change handlers.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(FieldInner {
                value: RefCell::new(value),
                handlers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Current contents.
    pub fn value(&self) -> T {
        self.inner.value.borrow().clone()
    }

    pub fn assign(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
    }

    pub fn edit(&self, value: T) {
        self.assign(value);
        let handlers = self.inner.handlers.borrow().clone();
        for handler in handlers {
            handler();
        }
    }

    /// Register `handler` to run after every `edit`, never after `assign`.
    pub fn on_change(&self, handler: Rc<dyn Fn()>) {
        self.inner.handlers.borrow_mut().push(handler);
    }
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Default + 'static> Default for Field<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// A mutable, externally backed value with replay-on-subscribe semantics.
///
/// Handles are cheap clones of shared single-threaded state. Once
/// subscribed, the external owner keeps the cell alive through its change
/// handler, the same way a bound input keeps its listeners.
pub struct ValueCell<T> {
    inner: Rc<CellInner<T>>,
}

struct CellInner<T> {
    get: Getter<T>,
    set: Setter<T>,
    listen: Notifier,
    listeners: RefCell<Vec<Listener<T>>>,
    listening: Cell<bool>,
    // Set for mapped cells: their writes come back through the source cell.
    relayed: bool,
}

impl<T: Clone + 'static> CellInner<T> {
    fn notify(&self) {
        let value = (self.get)();
        let listeners = self.listeners.borrow().clone();
        for listener in listeners {
            listener(value.clone());
        }
    }
}

impl<T: Clone + 'static> ValueCell<T> {
    /// Wrap a getter, setter and external change notifier.
    ///
    /// Nothing is registered with `listen` until the first subscriber
    /// arrives.
    pub fn make(get: Getter<T>, set: Setter<T>, listen: Notifier) -> Self {
        Self::build(get, set, listen, false)
    }

    fn build(get: Getter<T>, set: Setter<T>, listen: Notifier, relayed: bool) -> Self {
        Self {
            inner: Rc::new(CellInner {
                get,
                set,
                listen,
                listeners: RefCell::new(Vec::new()),
                listening: Cell::new(false),
                relayed,
            }),
        }
    }

    /// Bind to `field`: reads and writes go to the field, user edits notify.
    pub fn from_field(field: &Field<T>) -> Self {
        let reader = field.clone();
        let writer = field.clone();
        let source = field.clone();
        Self::make(
            Rc::new(move || reader.value()),
            Rc::new(move |value| writer.assign(value)),
            Rc::new(move |handler| source.on_change(handler)),
        )
    }

    /// Live read through the getter; never cached.
    pub fn get(&self) -> T {
        (self.inner.get)()
    }

    /// Write through, then notify every listener with the re-read value.
    pub fn set(&self, value: T) {
        (self.inner.set)(value);
        if !self.inner.relayed {
            self.inner.notify();
        }
    }

    /// Register `listener` and immediately hand it the current value.
    pub fn subscribe(&self, listener: impl Fn(T) + 'static) {
        self.listen(Rc::new(listener));
    }

    /// Derive a cell over the same external value.
    ///
    /// `getter` receives the raw read accessor and `setter` receives this
    /// cell's `set`; each returns the transformed accessor. The new cell
    /// follows this cell's notifications: user edits, `set` on either cell,
    /// each delivered once to both.
    pub fn map<U: Clone + 'static>(
        &self,
        getter: impl FnOnce(Getter<T>) -> Getter<U>,
        setter: impl FnOnce(Setter<T>) -> Setter<U>,
    ) -> ValueCell<U> {
        let this = self.clone();
        let set_through: Setter<T> = Rc::new(move |value| this.set(value));
        let source = self.clone();
        ValueCell::build(
            getter(Rc::clone(&self.inner.get)),
            setter(set_through),
            Rc::new(move |handler: Rc<dyn Fn()>| source.relay(handler)),
            true,
        )
    }

    /// Run `handler` after every notification of this cell, without replay.
    fn relay(&self, handler: Rc<dyn Fn()>) {
        self.inner
            .listeners
            .borrow_mut()
            .push(Rc::new(move |_: T| handler()));
        self.attach();
    }

    fn attach(&self) {
        if self.inner.listening.replace(true) {
            return;
        }
        let inner = Rc::clone(&self.inner);
        (self.inner.listen)(Rc::new(move || inner.notify()));
    }
}

impl<T> Clone for ValueCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Listenable for ValueCell<T> {
    type Item = T;

    fn listen(&self, listener: Listener<T>) {
        self.inner.listeners.borrow_mut().push(Rc::clone(&listener));
        listener(self.get());
        self.attach();
    }
}
