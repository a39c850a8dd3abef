//! Effect Implementation
//!
//! An Effect is a computation that discovers its own dependencies and
//! re-runs when any of them changes.
//!
//! # How Effects Work
//!
//! 1. When created (unless lazy), the effect runs its computation
//!    immediately to establish initial dependencies.
//!
//! 2. Every slot read while the effect is running subscribes the effect to
//!    that slot's dependency set.
//!
//! 3. Before every run, the effect unsubscribes from all of its previous
//!    dependency sets. Branches not taken this time therefore stop
//!    notifying it.
//!
//! 4. When a dependency is triggered, the effect runs again, either directly
//!    or through its scheduler.
//!
//! # Runners and Handles
//!
//! [`Effect<T>`] is the typed runner returned by
//! [`Runtime::effect`](super::Runtime::effect); `run` returns the
//! computation's value. [`EffectHandle`] is the type-erased view of the same
//! effect that dependency sets and schedulers work with.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;
use tracing::{debug, warn};

use super::dep::{Dep, DepInner};
use super::runtime::RuntimeState;

/// Unique identifier for an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    /// Generate a new unique effect ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

/// Callback that decides when a triggered effect runs.
///
/// The scheduler receives the triggered effect and may run it immediately,
/// queue it, or drop the notification.
pub type Scheduler = Rc<dyn Fn(&EffectHandle)>;

/// What an effect represents, which decides its place in the trigger order.
#[derive(Clone)]
pub enum EffectKind {
    /// A plain side effect.
    Ordinary { scheduler: Option<Scheduler> },

    /// An effect that maintains a cached derived value. Derived effects run
    /// before every ordinary effect of the same trigger, so ordinary effects
    /// never observe a stale cache.
    Derived { scheduler: Option<Scheduler> },
}

impl EffectKind {
    /// Whether this is a derived effect.
    pub fn is_derived(&self) -> bool {
        matches!(self, Self::Derived { .. })
    }

    /// The configured scheduler, if any.
    pub fn scheduler(&self) -> Option<&Scheduler> {
        match self {
            Self::Ordinary { scheduler } | Self::Derived { scheduler } => scheduler.as_ref(),
        }
    }

    fn take_scheduler(self) -> Option<Scheduler> {
        match self {
            Self::Ordinary { scheduler } | Self::Derived { scheduler } => scheduler,
        }
    }
}

impl Default for EffectKind {
    fn default() -> Self {
        Self::Ordinary { scheduler: None }
    }
}

impl fmt::Debug for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.is_derived() { "Derived" } else { "Ordinary" };
        f.debug_struct(name)
            .field("scheduler", &self.scheduler().is_some())
            .finish()
    }
}

/// Options for creating an effect.
///
/// ```rust
/// use trellis_core::reactive::EffectOptions;
///
/// let options = EffectOptions::new().lazy().derived();
/// assert!(options.lazy);
/// assert!(options.kind.is_derived());
/// ```
#[derive(Debug, Clone, Default)]
pub struct EffectOptions {
    /// Skip the initial run at creation time.
    pub lazy: bool,

    /// Ordinary or derived, with an optional scheduler.
    pub kind: EffectKind,
}

impl EffectOptions {
    /// Non-lazy ordinary effect without a scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Do not run the effect at creation time.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Mark the effect as derived, keeping any scheduler already set.
    pub fn derived(mut self) -> Self {
        let scheduler = self.kind.take_scheduler();
        self.kind = EffectKind::Derived { scheduler };
        self
    }

    /// Route triggered runs through `scheduler`.
    pub fn scheduler<F>(mut self, scheduler: F) -> Self
    where
        F: Fn(&EffectHandle) + 'static,
    {
        let scheduler: Option<Scheduler> = Some(Rc::new(scheduler));
        self.kind = match self.kind {
            EffectKind::Ordinary { .. } => EffectKind::Ordinary { scheduler },
            EffectKind::Derived { .. } => EffectKind::Derived { scheduler },
        };
        self
    }
}

/// Shared state behind every runner and handle of one effect.
pub(crate) struct EffectCore {
    id: EffectId,

    /// The computation with its result discarded, used by triggered runs.
    job: Rc<dyn Fn()>,

    options: EffectOptions,

    /// Dependency sets this effect currently belongs to.
    deps: RefCell<SmallVec<[Weak<DepInner>; 4]>>,

    active: Cell<bool>,

    run_count: Cell<usize>,

    runtime: Weak<RuntimeState>,
}

impl EffectCore {
    pub(crate) fn new(job: Rc<dyn Fn()>, options: EffectOptions, runtime: Weak<RuntimeState>) -> Rc<Self> {
        Rc::new(Self {
            id: EffectId::new(),
            job,
            options,
            deps: RefCell::new(SmallVec::new()),
            active: Cell::new(true),
            run_count: Cell::new(0),
            runtime,
        })
    }

    /// A core not attached to any runtime, for unit tests.
    #[cfg(test)]
    pub(crate) fn detached(options: EffectOptions) -> Rc<Self> {
        Self::new(Rc::new(|| {}), options, Weak::new())
    }

    pub(crate) fn id(&self) -> EffectId {
        self.id
    }

    pub(crate) fn kind(&self) -> &EffectKind {
        &self.options.kind
    }

    pub(crate) fn job(&self) -> &Rc<dyn Fn()> {
        &self.job
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.get()
    }

    pub(crate) fn record_run(&self) {
        self.run_count.set(self.run_count.get() + 1);
    }

    /// Remember that this effect now belongs to `dep`.
    pub(crate) fn record_dep(&self, dep: &Dep) {
        self.deps.borrow_mut().push(dep.downgrade());
    }

    /// Leave every dependency set and forget them.
    pub(crate) fn cleanup(&self) {
        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        for dep in deps.iter().filter_map(Weak::upgrade) {
            dep.unsubscribe(self.id);
        }
    }

    fn live_deps(&self) -> Vec<Dep> {
        self.deps
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .map(Dep::from_inner)
            .collect()
    }

    fn stop(&self) {
        if self.active.replace(false) {
            self.cleanup();
            debug!(effect = self.id.raw(), "effect stopped");
        }
    }

    /// Run `f` as this effect, under its runtime when the runtime is alive.
    fn execute<T>(self: &Rc<Self>, f: impl FnOnce() -> T) -> Option<T> {
        match self.runtime.upgrade() {
            Some(runtime) => runtime.run_effect(self, f),
            None => {
                warn!(effect = self.id.raw(), "runtime dropped, running effect untracked");
                Some(f())
            }
        }
    }
}

/// A typed effect runner.
///
/// Cloning a runner produces another handle to the same effect.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use trellis_core::reactive::{EffectOptions, Runtime};
///
/// let runtime = Runtime::new();
/// let calls = Rc::new(Cell::new(0));
///
/// let counter = calls.clone();
/// let effect = runtime.effect(move || { counter.set(counter.get() + 1); 42 }, EffectOptions::new());
///
/// assert_eq!(calls.get(), 1);
/// assert_eq!(effect.run(), Some(42));
/// assert_eq!(effect.run_count(), 2);
/// ```
pub struct Effect<T: 'static> {
    core: Rc<EffectCore>,
    raw: Rc<dyn Fn() -> T>,
}

impl<T: 'static> Effect<T> {
    pub(crate) fn new(raw: Rc<dyn Fn() -> T>, options: EffectOptions, runtime: Weak<RuntimeState>) -> Self {
        let computation = Rc::clone(&raw);
        let job: Rc<dyn Fn()> = Rc::new(move || {
            computation();
        });
        Self {
            core: EffectCore::new(job, options, runtime),
            raw,
        }
    }

    /// Run the computation, re-discovering its dependencies.
    ///
    /// Returns `None` without running anything when this effect is already
    /// executing further up the current call chain. A stopped effect runs
    /// its computation without tracking.
    pub fn run(&self) -> Option<T> {
        self.core.execute(|| (self.raw)())
    }

    /// The computation this runner wraps.
    pub fn raw(&self) -> &Rc<dyn Fn() -> T> {
        &self.raw
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> EffectId {
        self.core.id
    }

    /// The options the effect was created with.
    pub fn options(&self) -> &EffectOptions {
        &self.core.options
    }

    /// Dependency sets the effect is currently subscribed to.
    pub fn deps(&self) -> Vec<Dep> {
        self.core.live_deps()
    }

    /// Number of times the computation has been executed.
    pub fn run_count(&self) -> usize {
        self.core.run_count.get()
    }

    /// Unsubscribe from every dependency and stop reacting to triggers.
    pub fn stop(&self) {
        self.core.stop();
    }

    /// Whether the effect still reacts to triggers.
    pub fn is_active(&self) -> bool {
        self.core.is_active()
    }

    /// Type-erased handle to this effect.
    pub fn handle(&self) -> EffectHandle {
        EffectHandle::from_core(Rc::clone(&self.core))
    }
}

impl<T: 'static> Clone for Effect<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
            raw: Rc::clone(&self.raw),
        }
    }
}

impl<T: 'static> fmt::Debug for Effect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.core.id)
            .field("kind", &self.core.options.kind)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.core.deps.borrow().len())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Type-erased handle to an effect, as seen by dependency sets and
/// schedulers.
#[derive(Clone)]
pub struct EffectHandle {
    core: Rc<EffectCore>,
}

impl EffectHandle {
    pub(crate) fn from_core(core: Rc<EffectCore>) -> Self {
        Self { core }
    }

    pub(crate) fn into_core(self) -> Rc<EffectCore> {
        self.core
    }

    /// Run the effect, discarding the computation's value.
    ///
    /// Returns `false` if the run was skipped because the effect is already
    /// executing further up the current call chain.
    pub fn run(&self) -> bool {
        let job = Rc::clone(&self.core.job);
        self.core.execute(|| job()).is_some()
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> EffectId {
        self.core.id
    }

    /// Ordinary or derived, with the configured scheduler.
    pub fn kind(&self) -> &EffectKind {
        &self.core.options.kind
    }

    /// Dependency sets the effect is currently subscribed to.
    pub fn deps(&self) -> Vec<Dep> {
        self.core.live_deps()
    }

    /// Number of times the computation has been executed.
    pub fn run_count(&self) -> usize {
        self.core.run_count.get()
    }

    /// Unsubscribe from every dependency and stop reacting to triggers.
    pub fn stop(&self) {
        self.core.stop();
    }

    /// Whether the effect still reacts to triggers.
    pub fn is_active(&self) -> bool {
        self.core.is_active()
    }
}

impl PartialEq for EffectHandle {
    fn eq(&self, other: &Self) -> bool {
        self.core.id == other.core.id
    }
}

impl Eq for EffectHandle {}

impl fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectHandle")
            .field("id", &self.core.id)
            .field("kind", &self.core.options.kind)
            .field("active", &self.core.is_active())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
