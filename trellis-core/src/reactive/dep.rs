//! Dependency Sets
//!
//! A [`Dep`] is the subscriber collection for one observable slot. Each
//! subscribed effect appears at most once, and iteration follows the order
//! in which effects first subscribed.
//!
//! A `Dep` holds its subscribers strongly. Effects only keep weak
//! back-references to the sets they belong to, so the two never form an
//! ownership cycle.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::effect::{EffectCore, EffectHandle, EffectId};

/// Ordered, de-duplicated subscriber map.
pub(crate) type Subscribers = IndexMap<EffectId, Rc<EffectCore>>;

/// The set of effects subscribed to one slot.
///
/// Cloning a `Dep` produces another handle to the same set.
#[derive(Clone, Default)]
pub struct Dep {
    inner: Rc<DepInner>,
}

#[derive(Default)]
pub(crate) struct DepInner {
    subscribers: RefCell<Subscribers>,
}

impl DepInner {
    /// Remove a subscriber, keeping the others in subscription order.
    pub(crate) fn unsubscribe(&self, id: EffectId) {
        self.subscribers.borrow_mut().shift_remove(&id);
    }
}

impl Dep {
    /// Create an empty dependency set.
    ///
    /// Derived-value layers use standalone sets with
    /// [`Runtime::track_effects`](super::Runtime::track_effects) and
    /// [`Runtime::trigger_effects`](super::Runtime::trigger_effects).
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_inner(inner: Rc<DepInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<DepInner> {
        Rc::downgrade(&self.inner)
    }

    /// Add `effect` to the set. Returns `false` if it was already present.
    pub(crate) fn subscribe(&self, effect: &Rc<EffectCore>) -> bool {
        let mut subscribers = self.inner.subscribers.borrow_mut();
        if subscribers.contains_key(&effect.id()) {
            return false;
        }
        subscribers.insert(effect.id(), Rc::clone(effect));
        true
    }

    /// Append every subscriber not already in `out`, preserving order.
    pub(crate) fn collect_into(&self, out: &mut Subscribers) {
        for (id, effect) in self.inner.subscribers.borrow().iter() {
            out.entry(*id).or_insert_with(|| Rc::clone(effect));
        }
    }

    /// Number of subscribed effects.
    pub fn len(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Whether no effect is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the effect with the given ID is subscribed.
    pub fn contains(&self, id: EffectId) -> bool {
        self.inner.subscribers.borrow().contains_key(&id)
    }

    /// Snapshot of the subscribers in subscription order.
    pub fn subscribers(&self) -> Vec<EffectHandle> {
        self.inner
            .subscribers
            .borrow()
            .values()
            .map(|effect| EffectHandle::from_core(Rc::clone(effect)))
            .collect()
    }

    /// Whether both handles refer to the same set.
    pub fn ptr_eq(&self, other: &Dep) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Dep {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Dep {}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers = self.inner.subscribers.borrow();
        f.debug_struct("Dep")
            .field("subscribers", &subscribers.keys().collect::<Vec<_>>())
            .finish()
    }
}
