//! Slot keys and operation tags.
//!
//! Interception layers describe every read with a [`TrackOp`] and every
//! write with a [`TriggerOp`]. The slot being read or written is a
//! [`SlotKey`].

use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one observable slot of an observed object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotKey {
    /// The membership/shape of the object rather than any single value.
    ///
    /// Reads that enumerate an object track this key. Writes that add or
    /// remove members trigger it.
    Iterate,

    /// A named property.
    Name(Cow<'static, str>),

    /// A positional element.
    Index(usize),

    /// An opaque key that cannot collide with names or indices.
    Symbol(u64),
}

/// The reserved enumeration key.
pub const ITERATE_KEY: SlotKey = SlotKey::Iterate;

impl SlotKey {
    /// Create a new symbol key, distinct from every other key.
    pub fn unique_symbol() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self::Symbol(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Whether this is the enumeration sentinel.
    pub fn is_iterate(&self) -> bool {
        matches!(self, Self::Iterate)
    }
}

impl From<&'static str> for SlotKey {
    fn from(name: &'static str) -> Self {
        Self::Name(Cow::Borrowed(name))
    }
}

impl From<String> for SlotKey {
    fn from(name: String) -> Self {
        Self::Name(Cow::Owned(name))
    }
}

impl From<usize> for SlotKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&SlotKey> for SlotKey {
    fn from(key: &SlotKey) -> Self {
        key.clone()
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iterate => f.write_str("<iterate>"),
            Self::Name(name) => f.write_str(name),
            Self::Index(index) => write!(f, "[{index}]"),
            Self::Symbol(id) => write!(f, "Symbol({id})"),
        }
    }
}

/// Kind of read reported to [`Runtime::track`](super::Runtime::track).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackOp {
    /// A value read.
    Get,
    /// A membership test.
    Has,
    /// An enumeration of the object's members.
    Iterate,
}

/// Kind of write reported to [`Runtime::trigger`](super::Runtime::trigger).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerOp {
    /// An existing member changed value.
    Set,
    /// A new member was inserted.
    Add,
    /// A member was removed.
    Delete,
}

impl TriggerOp {
    /// Whether the write changes the object's membership, which also
    /// invalidates readers of [`ITERATE_KEY`].
    pub fn is_structural(self) -> bool {
        matches!(self, Self::Add | Self::Delete)
    }
}
