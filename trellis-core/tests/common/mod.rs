//! Minimal interception layer for the integration tests.
//!
//! A [`Record`] is a keyed bag of values with an optional parent record.
//! Reads fall through to the parent when a key is missing, like property
//! lookup along a prototype chain. Every access is reported to the runtime.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use trellis_core::reactive::{Runtime, SlotKey, TrackOp, TriggerOp, ITERATE_KEY};
use trellis_core::shared::{has_changed, SameValue};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Str(String),
    Bool(bool),
    Object(Record),
}

impl SameValue for Value {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Num(a), Value::Num(b)) => a.same_value(b),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Num(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Num(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Object(value)
    }
}

/// Storage behind a record. This is the observed target.
#[derive(Default)]
pub struct Fields {
    values: RefCell<IndexMap<SlotKey, Value>>,
    parent: RefCell<Option<Record>>,
}

#[derive(Clone)]
pub struct Record {
    runtime: Runtime,
    target: Rc<Fields>,
}

impl Record {
    pub fn new(runtime: &Runtime) -> Self {
        Self {
            runtime: runtime.clone(),
            target: Rc::new(Fields::default()),
        }
    }

    pub fn from_pairs<K, V>(runtime: &Runtime, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<SlotKey>,
        V: Into<Value>,
    {
        let record = Self::new(runtime);
        record.target.values.borrow_mut().extend(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into())),
        );
        record
    }

    pub fn target(&self) -> &Rc<Fields> {
        &self.target
    }

    pub fn set_parent(&self, parent: &Record) {
        *self.target.parent.borrow_mut() = Some(parent.clone());
    }

    fn parent(&self) -> Option<Record> {
        self.target.parent.borrow().clone()
    }

    pub fn get(&self, key: impl Into<SlotKey>) -> Option<Value> {
        let key = key.into();
        self.runtime.track(&self.target, TrackOp::Get, key.clone());
        let own = self.target.values.borrow().get(&key).cloned();
        match own {
            Some(value) => Some(value),
            None => self.parent().and_then(|parent| parent.get(key)),
        }
    }

    /// Numeric read; missing keys read as `NaN`.
    pub fn num(&self, key: impl Into<SlotKey>) -> f64 {
        match self.get(key) {
            Some(Value::Num(n)) => n,
            None => f64::NAN,
            Some(other) => panic!("expected a number, got {other:?}"),
        }
    }

    pub fn str(&self, key: impl Into<SlotKey>) -> Option<String> {
        match self.get(key) {
            Some(Value::Str(s)) => Some(s),
            None => None,
            Some(other) => panic!("expected a string, got {other:?}"),
        }
    }

    pub fn flag(&self, key: impl Into<SlotKey>) -> bool {
        matches!(self.get(key), Some(Value::Bool(true)))
    }

    pub fn object(&self, key: impl Into<SlotKey>) -> Record {
        match self.get(key) {
            Some(Value::Object(record)) => record,
            other => panic!("expected an object, got {other:?}"),
        }
    }

    pub fn has(&self, key: impl Into<SlotKey>) -> bool {
        let key = key.into();
        self.runtime.track(&self.target, TrackOp::Has, key.clone());
        if self.target.values.borrow().contains_key(&key) {
            return true;
        }
        self.parent().is_some_and(|parent| parent.has(key))
    }

    pub fn keys(&self) -> Vec<SlotKey> {
        self.runtime.track(&self.target, TrackOp::Iterate, ITERATE_KEY);
        self.target.values.borrow().keys().cloned().collect()
    }

    pub fn set(&self, key: impl Into<SlotKey>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let old = self
            .target
            .values
            .borrow_mut()
            .insert(key.clone(), value.clone());
        match old {
            None => self.runtime.trigger(&self.target, TriggerOp::Add, Some(key)),
            Some(old) if has_changed(&value, &old) => {
                self.runtime.trigger(&self.target, TriggerOp::Set, Some(key))
            }
            Some(_) => {}
        }
    }

    pub fn delete(&self, key: impl Into<SlotKey>) -> bool {
        let key = key.into();
        let removed = self.target.values.borrow_mut().shift_remove(&key);
        if removed.is_some() {
            self.runtime.trigger(&self.target, TriggerOp::Delete, Some(key));
        }
        removed.is_some()
    }

    /// Read without reporting to the runtime.
    pub fn raw_get(&self, key: impl Into<SlotKey>) -> Option<Value> {
        self.target.values.borrow().get(&key.into()).cloned()
    }

    /// Numeric read without reporting to the runtime.
    pub fn raw_num(&self, key: impl Into<SlotKey>) -> f64 {
        match self.raw_get(key) {
            Some(Value::Num(n)) => n,
            _ => f64::NAN,
        }
    }

    /// Write without reporting to the runtime.
    pub fn raw_set(&self, key: impl Into<SlotKey>, value: impl Into<Value>) {
        self.target
            .values
            .borrow_mut()
            .insert(key.into(), value.into());
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.target, &other.target)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.target.values.borrow().iter().map(|(k, v)| (k.to_string(), v.clone())))
            .finish()
    }
}

/// Call counter for effect bodies.
#[derive(Clone, Default)]
pub struct Spy(Rc<Cell<usize>>);

impl Spy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&self) {
        self.0.set(self.0.get() + 1);
    }

    pub fn calls(&self) -> usize {
        self.0.get()
    }

    pub fn reset(&self) {
        self.0.set(0);
    }
}
