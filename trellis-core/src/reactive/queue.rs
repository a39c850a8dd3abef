//! Effect Queue
//!
//! A ready-made scheduler that defers triggered effects instead of running
//! them in-line. Triggers only enqueue; [`EffectQueue::flush`] runs them.
//!
//! # Algorithm
//!
//! 1. The scheduler returned by [`EffectQueue::scheduler`] enqueues the
//!    triggered effect, unless it is already pending
//! 2. `flush` pops pending effects in the order they were first queued
//! 3. Stopped effects are dropped from the queue without running
//! 4. Effects queued while flushing run in the same flush
//!
//! Several writes between flushes therefore coalesce into a single run per
//! effect.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::trace;

use super::effect::{EffectHandle, EffectId, Scheduler};

/// Coalescing queue of triggered effects.
///
/// Clones share the same queue.
#[derive(Clone, Default)]
pub struct EffectQueue {
    pending: Rc<RefCell<IndexMap<EffectId, EffectHandle>>>,
    flushing: Rc<Cell<bool>>,
}

impl EffectQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// A scheduler that enqueues triggered effects on this queue.
    pub fn scheduler(&self) -> Scheduler {
        let queue = self.clone();
        Rc::new(move |effect: &EffectHandle| {
            queue.enqueue(effect.clone());
        })
    }

    /// Queue `effect`. Returns `false` if it was already pending.
    pub fn enqueue(&self, effect: EffectHandle) -> bool {
        let mut pending = self.pending.borrow_mut();
        if pending.contains_key(&effect.id()) {
            return false;
        }
        trace!(effect = effect.id().raw(), "effect queued");
        pending.insert(effect.id(), effect);
        true
    }

    /// Run pending effects until the queue is empty.
    ///
    /// Returns the number of effects run. A flush started from inside a
    /// flushing effect returns `0` immediately; the outer flush picks up
    /// anything queued meanwhile.
    pub fn flush(&self) -> usize {
        if self.flushing.replace(true) {
            return 0;
        }
        let _flushing = FlushGuard(&self.flushing);

        let mut ran = 0;
        loop {
            let next = self.pending.borrow_mut().shift_remove_index(0);
            let Some((_, effect)) = next else {
                break;
            };
            if effect.is_active() && effect.run() {
                ran += 1;
            }
        }
        ran
    }

    /// Drop every pending effect without running it.
    pub fn clear(&self) {
        self.pending.borrow_mut().clear();
    }

    /// Number of pending effects.
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for EffectQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectQueue")
            .field("pending", &self.len())
            .field("flushing", &self.flushing.get())
            .finish()
    }
}

struct FlushGuard<'a>(&'a Cell<bool>);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
