//! Trellis Core
//!
//! This crate provides the dependency-tracking engine of the Trellis
//! reactive state library. It implements:
//!
//! - Effects that discover their own dependencies
//! - A weakly-held store of per-slot dependency sets
//! - The track/trigger protocol used by object-interception layers
//! - Trigger ordering (derived effects before ordinary effects)
//!
//! The crate does not intercept reads and writes itself. A collaborator
//! wraps observed objects and reports accesses to a [`reactive::Runtime`].
//!
//! # Architecture
//!
//! - `reactive`: effects, dependency sets, the store and the runtime
//! - `config`: runtime tunables
//! - `shared`: change detection helpers for interception layers
//! - `error`: configuration errors
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use trellis_core::reactive::{EffectOptions, Runtime, TrackOp, TriggerOp};
//!
//! let runtime = Runtime::new();
//! let count = Rc::new(Cell::new(0));
//!
//! // An effect that reads `count`
//! let log = Rc::new(Cell::new(0));
//! let _effect = {
//!     let (rt, count, log) = (runtime.clone(), count.clone(), log.clone());
//!     runtime.effect(
//!         move || {
//!             rt.track(&count, TrackOp::Get, "count");
//!             log.set(count.get() * 2);
//!         },
//!         EffectOptions::new(),
//!     )
//! };
//!
//! // A write re-runs it
//! count.set(5);
//! runtime.trigger(&count, TriggerOp::Set, Some("count".into()));
//! assert_eq!(log.get(), 10);
//! ```

pub mod config;
pub mod error;
pub mod reactive;
pub mod shared;

pub use config::RuntimeConfig;
pub use error::{Error, Result};
