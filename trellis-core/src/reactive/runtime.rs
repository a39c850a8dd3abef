//! Reactive Runtime
//!
//! The runtime is the engine context that connects reads, writes and
//! effects. It owns the dependency store, the execution stack and the
//! tracking-enable stack.
//!
//! # How It Works
//!
//! 1. An interception layer reports every read of an observed object with
//!    [`Runtime::track`]. If an effect is running and tracking is enabled,
//!    the effect subscribes to that slot.
//!
//! 2. Writes are reported with [`Runtime::trigger`]. The runtime:
//!    a. Collects the subscribers of the written slot (and of the
//!       enumeration slot for structural writes)
//!    b. Snapshots them, de-duplicated, in subscription order
//!    c. Runs derived effects first, then ordinary effects, each through its
//!       scheduler when it has one
//!
//! 3. Each effect run unsubscribes the effect from everything first, so the
//!    run re-discovers exactly the slots it reads this time.
//!
//! # Threading
//!
//! A runtime is single-threaded and fully synchronous. Triggered effects run
//! in-line on the caller's stack. Independent runtimes share nothing.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use super::context::{ExecutionFrame, ExecutionStack};
use super::dep::{Dep, Subscribers};
use super::effect::{Effect, EffectCore, EffectHandle, EffectKind, EffectOptions};
use super::operations::{SlotKey, TrackOp, TriggerOp};
use super::store::{TargetId, TargetMap};
use super::tracking::{TrackingStack, UntrackedGuard};
use crate::config::RuntimeConfig;
use crate::error::Result;

/// Engine state shared by a runtime and its effects.
pub(crate) struct RuntimeState {
    config: RuntimeConfig,
    store: RefCell<TargetMap>,
    stack: RefCell<ExecutionStack>,
    tracking: RefCell<TrackingStack>,
}

impl RuntimeState {
    fn new(config: RuntimeConfig) -> Self {
        Self {
            store: RefCell::new(TargetMap::new(config.store_capacity, config.sweep_interval)),
            stack: RefCell::default(),
            tracking: RefCell::default(),
            config,
        }
    }

    /// Run `f` as `effect`.
    ///
    /// Skipped (returns `None`) when `effect` is already on the execution
    /// stack. Stopped effects run `f` with tracking paused.
    pub(crate) fn run_effect<T>(&self, effect: &Rc<EffectCore>, f: impl FnOnce() -> T) -> Option<T> {
        if !effect.is_active() {
            let _untracked = UntrackedGuard::enter(&self.tracking);
            return Some(f());
        }

        if self.stack.borrow().contains(effect.id()) {
            trace!(effect = effect.id().raw(), "effect already running, skipping");
            return None;
        }

        effect.cleanup();

        let _frame = ExecutionFrame::enter(&self.stack, &self.tracking, Rc::clone(effect));
        effect.record_run();
        trace!(
            effect = effect.id().raw(),
            depth = self.stack.borrow().depth(),
            "running effect"
        );
        Some(f())
    }

    /// The active effect, if reads are currently being recorded.
    ///
    /// An effect stopped during its own run records nothing for the rest
    /// of that run.
    fn tracking_target(&self) -> Option<Rc<EffectCore>> {
        if !self.tracking.borrow().is_enabled() {
            return None;
        }
        self.stack.borrow().active().filter(|effect| effect.is_active())
    }

    fn sweep_if_due(&self) {
        if !self.store.borrow().sweep_due() {
            return;
        }
        let dead = self.store.borrow_mut().take_dead();
        if !dead.is_empty() {
            debug!(purged = dead.len(), "purged dead targets");
        }
    }
}

/// Handle to a reactive engine.
///
/// Cloning is cheap; clones share the same engine.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use trellis_core::reactive::{EffectOptions, Runtime, TrackOp, TriggerOp};
///
/// let runtime = Runtime::new();
/// let target = Rc::new(Cell::new(0));
/// let seen = Rc::new(Cell::new(-1));
///
/// let effect = {
///     let (rt, target, seen) = (runtime.clone(), target.clone(), seen.clone());
///     runtime.effect(
///         move || {
///             rt.track(&target, TrackOp::Get, "value");
///             seen.set(target.get());
///         },
///         EffectOptions::new(),
///     )
/// };
/// assert_eq!(seen.get(), 0);
///
/// target.set(7);
/// runtime.trigger(&target, TriggerOp::Set, Some("value".into()));
/// assert_eq!(seen.get(), 7);
/// assert_eq!(effect.run_count(), 2);
/// ```
#[derive(Clone)]
pub struct Runtime {
    state: Rc<RuntimeState>,
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RuntimeState::new(RuntimeConfig::default())),
        }
    }

    /// Create a runtime from a validated configuration.
    pub fn with_config(config: RuntimeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: Rc::new(RuntimeState::new(config)),
        })
    }

    /// The configuration this runtime was built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.state.config
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    /// Create an effect running `f`.
    ///
    /// Unless `options.lazy` is set, `f` runs once before this returns.
    pub fn effect<T, F>(&self, f: F, options: EffectOptions) -> Effect<T>
    where
        T: 'static,
        F: Fn() -> T + 'static,
    {
        self.create_effect(Rc::new(f), options)
    }

    /// Create a new effect around the computation of an existing runner.
    ///
    /// The new runner is distinct from `runner` but shares its raw
    /// computation; the runner itself is never wrapped.
    pub fn effect_from<T: 'static>(&self, runner: &Effect<T>, options: EffectOptions) -> Effect<T> {
        self.create_effect(Rc::clone(runner.raw()), options)
    }

    fn create_effect<T: 'static>(&self, raw: Rc<dyn Fn() -> T>, options: EffectOptions) -> Effect<T> {
        let lazy = options.lazy;
        let effect = Effect::new(raw, options, Rc::downgrade(&self.state));
        debug!(
            effect = effect.id().raw(),
            kind = ?effect.options().kind,
            lazy,
            "effect created"
        );
        if !lazy {
            effect.run();
        }
        effect
    }

    /// The effect currently executing, if any.
    pub fn active_effect(&self) -> Option<EffectHandle> {
        self.state.stack.borrow().active().map(EffectHandle::from_core)
    }

    /// Number of effects on the execution stack.
    pub fn depth(&self) -> usize {
        self.state.stack.borrow().depth()
    }

    // ------------------------------------------------------------------
    // Tracking mode
    // ------------------------------------------------------------------

    /// Stop recording dependencies until the matching [`reset_tracking`].
    ///
    /// [`reset_tracking`]: Runtime::reset_tracking
    pub fn pause_tracking(&self) {
        self.state.tracking.borrow_mut().pause();
    }

    /// Record dependencies until the matching [`reset_tracking`], even
    /// inside a paused region.
    ///
    /// [`reset_tracking`]: Runtime::reset_tracking
    pub fn enable_tracking(&self) {
        self.state.tracking.borrow_mut().enable();
    }

    /// Restore the mode in effect before the last pause or enable.
    pub fn reset_tracking(&self) {
        self.state.tracking.borrow_mut().reset();
    }

    /// Whether reads are currently recorded (ignoring whether an effect is
    /// running).
    pub fn is_tracking(&self) -> bool {
        self.state.tracking.borrow().is_enabled()
    }

    /// Run `f` without recording any dependency.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _untracked = UntrackedGuard::enter(&self.state.tracking);
        f()
    }

    // ------------------------------------------------------------------
    // Track / trigger
    // ------------------------------------------------------------------

    /// Record that the active effect read `key` of `target`.
    ///
    /// No-op when no effect is running or tracking is paused.
    pub fn track<T>(&self, target: &Rc<T>, op: TrackOp, key: impl Into<SlotKey>)
    where
        T: ?Sized + 'static,
    {
        let Some(effect) = self.state.tracking_target() else {
            return;
        };

        let key = key.into();
        let (dep, stale) = self.state.store.borrow_mut().dep_for_tracking(target, &key);
        drop(stale);

        if dep.subscribe(&effect) {
            effect.record_dep(&dep);
            trace!(
                effect = effect.id().raw(),
                target = %TargetId::of(target),
                key = %key,
                ?op,
                "tracked"
            );
        }

        self.state.sweep_if_due();
    }

    /// Subscribe the active effect to a standalone dependency set.
    ///
    /// No-op when no effect is running or tracking is paused.
    pub fn track_effects(&self, dep: &Dep) {
        if let Some(effect) = self.state.tracking_target() {
            if dep.subscribe(&effect) {
                effect.record_dep(dep);
            }
        }
    }

    /// Re-run the effects affected by a write to `key` of `target`.
    ///
    /// Add and delete writes also re-run effects that enumerated `target`.
    /// Does nothing if `target` was never tracked.
    pub fn trigger<T>(&self, target: &Rc<T>, op: TriggerOp, key: Option<SlotKey>)
    where
        T: ?Sized + 'static,
    {
        let id = TargetId::of(target);
        let deps = self
            .state
            .store
            .borrow()
            .deps_for_trigger(id, key.as_ref(), op.is_structural());
        let Some(deps) = deps else {
            return;
        };

        let mut effects = Subscribers::new();
        for dep in &deps {
            dep.collect_into(&mut effects);
        }

        trace!(
            target = %id,
            key = ?key,
            ?op,
            effects = effects.len(),
            "trigger"
        );
        self.run_triggered(effects.into_values().collect());
    }

    /// Re-run every subscriber of a standalone dependency set.
    pub fn trigger_effects(&self, dep: &Dep) {
        let mut effects = Subscribers::new();
        dep.collect_into(&mut effects);
        self.run_triggered(effects.into_values().collect());
    }

    /// Re-run a list of effects under the trigger ordering policy.
    ///
    /// The list is used as given; duplicates run more than once.
    pub fn trigger_effect_list(&self, effects: Vec<EffectHandle>) {
        self.run_triggered(effects.into_iter().map(EffectHandle::into_core).collect());
    }

    /// Derived effects first, then ordinary ones, each in snapshot order.
    fn run_triggered(&self, effects: Vec<Rc<EffectCore>>) {
        let (derived, ordinary): (Vec<_>, Vec<_>) = effects
            .into_iter()
            .partition(|effect| effect.kind().is_derived());

        for effect in derived.iter().chain(ordinary.iter()) {
            self.dispatch(effect);
        }
    }

    fn dispatch(&self, effect: &Rc<EffectCore>) {
        // Stopped by an earlier effect of the same pass.
        if !effect.is_active() {
            return;
        }

        match effect.kind() {
            EffectKind::Ordinary { scheduler: Some(scheduler) }
            | EffectKind::Derived { scheduler: Some(scheduler) } => {
                let scheduler = Rc::clone(scheduler);
                scheduler(&EffectHandle::from_core(Rc::clone(effect)));
            }
            EffectKind::Ordinary { scheduler: None } | EffectKind::Derived { scheduler: None } => {
                let job = Rc::clone(effect.job());
                self.state.run_effect(effect, || job());
            }
        }
    }

    // ------------------------------------------------------------------
    // Store
    // ------------------------------------------------------------------

    /// The dependency set for `key` of `target`, if it was ever tracked.
    pub fn dep_for<T>(&self, target: &Rc<T>, key: &SlotKey) -> Option<Dep>
    where
        T: ?Sized,
    {
        self.state.store.borrow().get(TargetId::of(target), key)
    }

    /// Number of observed targets in the store, including dropped targets
    /// not yet purged.
    pub fn target_count(&self) -> usize {
        self.state.store.borrow().len()
    }

    /// Remove the entries of every dropped target. Returns how many were
    /// removed.
    pub fn purge_dead_targets(&self) -> usize {
        let dead = self.state.store.borrow_mut().take_dead();
        debug!(purged = dead.len(), "purged dead targets");
        dead.len()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("targets", &self.target_count())
            .field("depth", &self.depth())
            .field("tracking", &self.is_tracking())
            .finish()
    }
}
