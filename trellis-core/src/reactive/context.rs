//! Execution Context
//!
//! The execution stack tracks which effects are currently running. The top
//! of the stack is the active effect: the only effect that reads are
//! attributed to.
//!
//! # Implementation
//!
//! Running an effect pushes it onto the stack and force-enables tracking.
//! Both are undone by [`ExecutionFrame`]'s `Drop`, so the stack stays
//! consistent even if the computation panics.
//!
//! This design supports nested effects: an effect that runs another effect
//! resumes being the active effect once the inner run returns.

use std::cell::RefCell;
use std::rc::Rc;

use super::effect::{EffectCore, EffectId};
use super::tracking::TrackingStack;

/// Effects currently running, outermost first.
#[derive(Default)]
pub(crate) struct ExecutionStack {
    frames: Vec<Rc<EffectCore>>,
}

impl ExecutionStack {
    pub(crate) fn contains(&self, id: EffectId) -> bool {
        self.frames.iter().any(|effect| effect.id() == id)
    }

    /// The active effect, if any.
    pub(crate) fn active(&self) -> Option<Rc<EffectCore>> {
        self.frames.last().cloned()
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    fn push(&mut self, effect: Rc<EffectCore>) {
        self.frames.push(effect);
    }

    fn pop(&mut self) -> Option<Rc<EffectCore>> {
        self.frames.pop()
    }
}

/// Guard that pops the execution stack and restores the tracking mode when
/// dropped.
pub(crate) struct ExecutionFrame<'a> {
    stack: &'a RefCell<ExecutionStack>,
    tracking: &'a RefCell<TrackingStack>,
    effect_id: EffectId,
}

impl<'a> ExecutionFrame<'a> {
    /// Make `effect` the active effect until the frame is dropped.
    pub(crate) fn enter(
        stack: &'a RefCell<ExecutionStack>,
        tracking: &'a RefCell<TrackingStack>,
        effect: Rc<EffectCore>,
    ) -> Self {
        let effect_id = effect.id();
        tracking.borrow_mut().enable();
        stack.borrow_mut().push(effect);
        Self {
            stack,
            tracking,
            effect_id,
        }
    }
}

impl Drop for ExecutionFrame<'_> {
    fn drop(&mut self) {
        let popped = self.stack.borrow_mut().pop();
        self.tracking.borrow_mut().reset();

        // Frames are strictly nested.
        if let Some(effect) = popped {
            debug_assert_eq!(
                effect.id(),
                self.effect_id,
                "ExecutionFrame mismatch: expected {:?}, got {:?}",
                self.effect_id,
                effect.id()
            );
        }
    }
}
