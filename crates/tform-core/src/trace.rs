//! Access tracing for accessor handles
//!
//! An [`AccessObserver`] attached to an [`Accessor`] sees every key read made
//! through that handle and through every handle derived from it. Handles
//! that were not derived from the traced one are never observed, so two rules
//! evaluated against the same record keep separate key sets.
//!
//! Copyright (c) 2025 Tform Contributors
//! Licensed under the Apache-2.0 license

use crate::accessor::Accessor;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashSet};

/// Receives the keys read through a traced accessor
pub trait AccessObserver {
    /// Called once per key read, before the read is resolved
    fn record_key(&self, key: &str);
}

/// Attach `observer` to `handle`
///
/// Reads keep their usual semantics; the only effect is that `observer`
/// receives each key read on the returned handle and its descendants.
/// Resolving a handle to its value is not a read.
pub fn trace<'a>(handle: Accessor<'a>, observer: &'a dyn AccessObserver) -> Accessor<'a> {
    handle.traced(observer)
}

/// Key set collector used by the engine for provenance tracking
#[derive(Debug, Default)]
pub struct KeyTracer {
    keys: RefCell<BTreeSet<String>>,
}

impl KeyTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing key set, typically the keys a field has read
    /// on earlier records
    pub fn seeded(keys: BTreeSet<String>) -> Self {
        Self {
            keys: RefCell::new(keys),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.borrow().contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.borrow().is_empty()
    }

    /// Snapshot of the keys recorded so far
    pub fn keys(&self) -> BTreeSet<String> {
        self.keys.borrow().clone()
    }

    pub fn into_keys(self) -> BTreeSet<String> {
        self.keys.into_inner()
    }
}

impl AccessObserver for KeyTracer {
    fn record_key(&self, key: &str) {
        let mut keys = self.keys.borrow_mut();
        if !keys.contains(key) {
            keys.insert(key.to_owned());
        }
    }
}

impl AccessObserver for RefCell<BTreeSet<String>> {
    fn record_key(&self, key: &str) {
        self.borrow_mut().insert(key.to_owned());
    }
}

impl AccessObserver for RefCell<HashSet<String>> {
    fn record_key(&self, key: &str) {
        self.borrow_mut().insert(key.to_owned());
    }
}
