//! Reactive Engine
//!
//! This module implements dependency tracking: effects discover which slots
//! of which observed objects they read, and re-run when those slots are
//! written.
//!
//! # Concepts
//!
//! ## Effects
//!
//! An Effect wraps a computation. While it runs, every read reported through
//! [`Runtime::track`] subscribes it to the read slot. Before each run it
//! drops all previous subscriptions, so its dependencies always match the
//! branch it took last.
//!
//! ## Dependency Sets
//!
//! A [`Dep`] holds the effects subscribed to one slot, in subscription
//! order. The runtime keeps one per tracked slot, weakly associated with
//! the observed object.
//!
//! ## Track and Trigger
//!
//! Interception layers call [`Runtime::track`] on reads and
//! [`Runtime::trigger`] on writes. Triggering runs derived effects before
//! ordinary ones so that cached values are fresh when ordinary effects
//! read them.
//!
//! # Implementation Notes
//!
//! The engine is an explicit [`Runtime`] value rather than global state.
//! The active effect is the top of an execution stack; an effect already
//! on the stack is never re-entered, which stops self-triggering effects
//! from recursing.

mod context;
mod dep;
mod effect;
mod operations;
mod queue;
mod runtime;
mod store;
mod tracking;

pub use dep::Dep;
pub use effect::{Effect, EffectHandle, EffectId, EffectKind, EffectOptions, Scheduler};
pub use operations::{SlotKey, TrackOp, TriggerOp, ITERATE_KEY};
pub use queue::EffectQueue;
pub use runtime::Runtime;
pub use store::TargetId;
