//! Dependency Store
//!
//! The store maps each observed object to the dependency sets of its slots:
//! `target -> (slot key -> Dep)`.
//!
//! # Weak Association
//!
//! Entries must not keep observed objects alive. Targets are identified by
//! the address of their shared allocation, and each entry keeps a weak
//! liveness probe. Once the target is dropped the probe reports it dead:
//!
//! - looking the target up again (a new allocation at a reused address)
//!   replaces the stale entry with a fresh one;
//! - [`TargetMap::take_dead`] removes every dead entry in one pass.
//!
//! Dead entries are handed back to the caller instead of being dropped in
//! place, so that dropping their subscribers never happens while the store
//! is borrowed.

use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::dep::Dep;
use super::operations::{SlotKey, ITERATE_KEY};

/// Identity of an observed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(usize);

impl TargetId {
    /// Identity of the allocation behind `target`.
    pub fn of<T: ?Sized>(target: &Rc<T>) -> Self {
        Self(Rc::as_ptr(target) as *const () as usize)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

trait Liveness {
    fn is_alive(&self) -> bool;
}

impl<T: ?Sized> Liveness for Weak<T> {
    fn is_alive(&self) -> bool {
        self.strong_count() > 0
    }
}

/// Dependency sets for one observed object.
pub(crate) struct TargetEntry {
    target: Box<dyn Liveness>,
    deps: HashMap<SlotKey, Dep>,
}

impl TargetEntry {
    fn new<T: ?Sized + 'static>(target: &Rc<T>) -> Self {
        Self {
            target: Box::new(Rc::downgrade(target)),
            deps: HashMap::new(),
        }
    }

    fn is_alive(&self) -> bool {
        self.target.is_alive()
    }
}

/// Observed object -> slot key -> dependency set.
pub(crate) struct TargetMap {
    entries: HashMap<TargetId, TargetEntry>,
    inserted_since_sweep: usize,
    sweep_interval: usize,
}

impl TargetMap {
    pub(crate) fn new(capacity: usize, sweep_interval: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            inserted_since_sweep: 0,
            sweep_interval,
        }
    }

    /// Fetch or create the dependency set for `key` on `target`.
    ///
    /// Also returns the stale entry that was replaced, if the address of a
    /// dropped target was reused.
    pub(crate) fn dep_for_tracking<T: ?Sized + 'static>(
        &mut self,
        target: &Rc<T>,
        key: &SlotKey,
    ) -> (Dep, Option<TargetEntry>) {
        let id = TargetId::of(target);
        let mut stale = None;

        if !self.entries.get(&id).is_some_and(TargetEntry::is_alive) {
            stale = self.entries.remove(&id);
            self.inserted_since_sweep += 1;
        }

        let entry = self
            .entries
            .entry(id)
            .or_insert_with(|| TargetEntry::new(target));
        let dep = entry.deps.entry(key.clone()).or_default().clone();
        (dep, stale)
    }

    /// Dependency sets affected by a write to `key` on `id`.
    ///
    /// Structural writes also include the enumeration set. Returns `None`
    /// when the target was never observed.
    pub(crate) fn deps_for_trigger(
        &self,
        id: TargetId,
        key: Option<&SlotKey>,
        structural: bool,
    ) -> Option<SmallVec<[Dep; 2]>> {
        let entry = self.entries.get(&id).filter(|entry| entry.is_alive())?;

        let mut deps = SmallVec::new();
        if let Some(dep) = key.and_then(|key| entry.deps.get(key)) {
            deps.push(dep.clone());
        }
        if structural {
            if let Some(dep) = entry.deps.get(&ITERATE_KEY) {
                deps.push(dep.clone());
            }
        }
        Some(deps)
    }

    /// Look up an existing dependency set without creating it.
    pub(crate) fn get(&self, id: TargetId, key: &SlotKey) -> Option<Dep> {
        self.entries
            .get(&id)
            .filter(|entry| entry.is_alive())
            .and_then(|entry| entry.deps.get(key))
            .cloned()
    }

    pub(crate) fn sweep_due(&self) -> bool {
        self.sweep_interval > 0 && self.inserted_since_sweep >= self.sweep_interval
    }

    /// Remove and return the entries of every dropped target.
    pub(crate) fn take_dead(&mut self) -> Vec<TargetEntry> {
        self.inserted_since_sweep = 0;
        let dead: Vec<TargetId> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_alive())
            .map(|(id, _)| *id)
            .collect();
        dead.iter()
            .filter_map(|id| self.entries.remove(id))
            .collect()
    }

    /// Number of entries, including dead ones not yet purged.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
