//! Latest-values combinator.
//!
//! [`combine_latest`] joins a tuple of sources into one stream of tuples.
//! Nothing is emitted until every source has reported at least once; after
//! that, every report from any source emits a fresh copy of the full tuple,
//! including sources whose value did not change.
//!
//! Delivery is synchronous. A listener that writes into one of its own
//! combinator's inputs re-enters the combinator and receives a nested
//! emission before the outer one finishes; such a write loop never settles.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::cell::Listener;

/// Anything that delivers values to registered listeners.
pub trait Listenable {
    type Item: Clone + 'static;

    fn listen(&self, listener: Listener<Self::Item>);
}

/// A tuple of [`Listenable`] sources that can be joined.
pub trait Sources: Sized + 'static {
    /// Latest value per source, `None` until the source first reports.
    type Slots: Default;
    type Output: Clone + 'static;
    const LEN: usize;

    /// Subscribe to every source in tuple order. Each handler stores its
    /// value into `slots` and then calls `report` with its index.
    fn attach(self, slots: Rc<RefCell<Self::Slots>>, report: Rc<dyn Fn(usize)>);

    fn snapshot(slots: &Self::Slots) -> Option<Self::Output>;
}

macro_rules! impl_sources {
    ($len:expr; $($idx:tt $S:ident $v:ident),+) => {
        impl<$($S),+> Sources for ($($S,)+)
        where
            $($S: Listenable + 'static),+
        {
            type Slots = ($(Option<<$S as Listenable>::Item>,)+);
            type Output = ($(<$S as Listenable>::Item,)+);
            const LEN: usize = $len;

            fn attach(self, slots: Rc<RefCell<Self::Slots>>, report: Rc<dyn Fn(usize)>) {
                $(
                    let slot = Rc::clone(&slots);
                    let notify = Rc::clone(&report);
                    self.$idx.listen(Rc::new(move |value: <$S as Listenable>::Item| {
                        slot.borrow_mut().$idx = Some(value);
                        notify($idx);
                    }));
                )+
            }

            fn snapshot(slots: &Self::Slots) -> Option<Self::Output> {
                match slots {
                    ($(Some($v),)+) => Some(($($v.clone(),)+)),
                    _ => None,
                }
            }
        }
    };
}

impl_sources!(1; 0 A a);
impl_sources!(2; 0 A a, 1 B b);
impl_sources!(3; 0 A a, 1 B b, 2 C c);
impl_sources!(4; 0 A a, 1 B b, 2 C c, 3 D d);
impl_sources!(5; 0 A a, 1 B b, 2 C c, 3 D d, 4 E e);
impl_sources!(6; 0 A a, 1 B b, 2 C c, 3 D d, 4 E e, 5 F f);

trait Join<T> {
    fn join(self: Rc<Self>, listener: Listener<T>);
}

struct Latest<P: Sources> {
    // Taken on first subscribe; the per-source handlers keep `self` alive.
    sources: RefCell<Option<P>>,
    slots: Rc<RefCell<P::Slots>>,
    pending: RefCell<BTreeSet<usize>>,
    listeners: RefCell<Vec<Listener<P::Output>>>,
    depth: Cell<usize>,
}

impl<P: Sources> Latest<P> {
    fn report(&self, index: usize) {
        let ready = {
            let mut pending = self.pending.borrow_mut();
            pending.remove(&index);
            pending.is_empty()
        };
        if !ready {
            return;
        }
        let Some(snapshot) = P::snapshot(&self.slots.borrow()) else {
            return;
        };

        if self.depth.get() > 0 {
            tracing::warn!(
                index,
                depth = self.depth.get(),
                "combinator input written while its own emission was being delivered"
            );
        }
        self.depth.set(self.depth.get() + 1);
        let listeners = self.listeners.borrow().clone();
        for listener in listeners {
            listener(snapshot.clone());
        }
        self.depth.set(self.depth.get() - 1);
    }
}

impl<P: Sources> Join<P::Output> for Latest<P> {
    fn join(self: Rc<Self>, listener: Listener<P::Output>) {
        self.listeners.borrow_mut().push(listener);
        let sources = self.sources.borrow_mut().take();
        if let Some(sources) = sources {
            let this = Rc::clone(&self);
            sources.attach(Rc::clone(&self.slots), Rc::new(move |index| this.report(index)));
        }
    }
}

/// The joined stream returned by [`combine_latest`].
pub struct Combined<T> {
    inner: Rc<dyn Join<T>>,
}

impl<T: Clone + 'static> Combined<T> {
    pub fn subscribe(&self, listener: impl Fn(T) + 'static) {
        self.listen(Rc::new(listener));
    }
}

impl<T> Clone for Combined<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Listenable for Combined<T> {
    type Item = T;

    fn listen(&self, listener: Listener<T>) {
        Rc::clone(&self.inner).join(listener);
    }
}

/// Join `sources` into a stream of latest-value tuples.
///
/// Sources are wired lazily, once, in tuple order, when the first listener
/// subscribes. The combinator has no teardown.
pub fn combine_latest<P: Sources>(sources: P) -> Combined<P::Output> {
    let latest = Latest {
        sources: RefCell::new(Some(sources)),
        slots: Rc::new(RefCell::new(P::Slots::default())),
        pending: RefCell::new((0..P::LEN).collect()),
        listeners: RefCell::new(Vec::new()),
        depth: Cell::new(0),
    };
    Combined {
        inner: Rc::new(latest),
    }
}
