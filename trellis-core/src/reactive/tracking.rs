//! Tracking-Enable Stack
//!
//! Collaborators sometimes need to read reactive state without creating a
//! dependency, e.g. for internal bookkeeping. Tracking can be paused (or
//! force-enabled) and later restored to whatever the caller had before,
//! so suspensions nest correctly.

use std::cell::RefCell;

/// Stack of saved tracking modes.
///
/// The current mode is kept separately from the saved ones: `pause` and
/// `enable` save the current mode before replacing it, `reset` restores the
/// most recently saved mode (or `true` when nothing is saved).
#[derive(Debug)]
pub(crate) struct TrackingStack {
    enabled: bool,
    saved: Vec<bool>,
}

impl Default for TrackingStack {
    fn default() -> Self {
        Self {
            enabled: true,
            saved: Vec::new(),
        }
    }
}

impl TrackingStack {
    pub(crate) fn pause(&mut self) {
        self.saved.push(self.enabled);
        self.enabled = false;
    }

    pub(crate) fn enable(&mut self) {
        self.saved.push(self.enabled);
        self.enabled = true;
    }

    pub(crate) fn reset(&mut self) {
        self.enabled = self.saved.pop().unwrap_or(true);
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.saved.len()
    }
}

/// Pauses tracking for its lifetime.
pub(crate) struct UntrackedGuard<'a> {
    stack: &'a RefCell<TrackingStack>,
}

impl<'a> UntrackedGuard<'a> {
    pub(crate) fn enter(stack: &'a RefCell<TrackingStack>) -> Self {
        stack.borrow_mut().pause();
        Self { stack }
    }
}

impl Drop for UntrackedGuard<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().reset();
    }
}
