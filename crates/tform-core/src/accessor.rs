//! Null-safe record accessor
//!
//! [`Accessor`] is a small `Copy` handle over a value reachable from a record
//! root. Any key or index can be read from any handle: when the underlying
//! value is absent or is not a container, the read yields another absent
//! handle instead of failing. The null check is deferred to the moment a
//! value is finally resolved, either with [`Accessor::value`] (absent stays
//! `None`) or with one of the fallback forms such as [`Accessor::value_or`].
//!
//! ```
//! use serde_json::json;
//! use tform_core::Accessor;
//!
//! let record = json!({"a": "hello", "b": {"d": "world"}});
//! let x = Accessor::new(&record);
//!
//! assert_eq!(x.get("a").as_str(), Some("hello"));
//! assert_eq!(x.get("b").get("d").as_str(), Some("world"));
//! assert_eq!(x.get("b").get("z").value(), None);
//! assert_eq!(x.get("b").get("z").value_or("default"), json!("default"));
//! assert_eq!(x.get("y").get("z").get("a").get("b").value(), None);
//! ```
//!
//! A JSON `null` is a present value: only absence triggers a fallback.
//!
//! Copyright (c) 2025 Tform Contributors
//! Licensed under the Apache-2.0 license

use crate::path::{FieldPath, PathError, PathStep};
use crate::trace::AccessObserver;
use crate::utility::string_of;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::iter::FusedIterator;

/// Wrap `value` in a fresh, untraced accessor
pub fn wrap(value: &Value) -> Accessor<'_> {
    Accessor::new(value)
}

/// Null-safe handle over a value reachable from a record
#[derive(Clone, Copy, Default)]
pub struct Accessor<'a> {
    value: Option<&'a Value>,
    observer: Option<&'a dyn AccessObserver>,
}

impl<'a> Accessor<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self {
            value: Some(value),
            observer: None,
        }
    }

    /// A handle over nothing
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn from_option(value: Option<&'a Value>) -> Self {
        Self {
            value,
            observer: None,
        }
    }

    /// Attach an observer; see [`crate::trace::trace`]
    pub fn traced(self, observer: &'a dyn AccessObserver) -> Self {
        Self {
            observer: Some(observer),
            ..self
        }
    }

    pub fn is_traced(&self) -> bool {
        self.observer.is_some()
    }

    fn derive(&self, value: Option<&'a Value>) -> Self {
        Self {
            value,
            observer: self.observer,
        }
    }

    // Navigation

    /// Read a named property
    ///
    /// Objects are read by key and arrays by decimal position; every other
    /// value (including absent and `null`) yields an absent handle. The key
    /// is reported to the observer whether or not it resolves.
    pub fn get(&self, key: &str) -> Accessor<'a> {
        if let Some(observer) = self.observer {
            observer.record_key(key);
        }
        let next = match self.value {
            Some(Value::Object(map)) => map.get(key),
            Some(Value::Array(items)) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        self.derive(next)
    }

    /// Read an array position
    pub fn at(&self, index: usize) -> Accessor<'a> {
        let next = match self.value {
            Some(Value::Array(items)) => items.get(index),
            _ => None,
        };
        self.derive(next)
    }

    /// Follow every step of `path`
    pub fn path(&self, path: &FieldPath) -> Accessor<'a> {
        path.steps().iter().fold(*self, |handle, step| match step {
            PathStep::Key(key) => handle.get(key),
            PathStep::Index(index) => handle.at(*index),
        })
    }

    /// Parse `path` and follow it
    pub fn select(&self, path: &str) -> Result<Accessor<'a>, PathError> {
        Ok(self.path(&FieldPath::parse(path)?))
    }

    // Resolution

    /// The underlying value, or `None` when absent
    pub fn value(&self) -> Option<&'a Value> {
        self.value
    }

    /// The underlying value, or `fallback` when absent
    pub fn or(&self, fallback: &'a Value) -> &'a Value {
        self.value.unwrap_or(fallback)
    }

    /// An owned copy of the underlying value, or `fallback` when absent
    pub fn value_or(&self, fallback: impl Into<Value>) -> Value {
        match self.value {
            Some(value) => value.clone(),
            None => fallback.into(),
        }
    }

    pub fn cloned(&self) -> Option<Value> {
        self.value.cloned()
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_absent(&self) -> bool {
        self.value.is_none()
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, Some(Value::Null))
    }

    // Typed resolution. The `*_or` forms fall back when the value is absent
    // or has a different type.

    pub fn as_str(&self) -> Option<&'a str> {
        self.value.and_then(Value::as_str)
    }

    pub fn str_or(&self, fallback: &'a str) -> &'a str {
        self.as_str().unwrap_or(fallback)
    }

    /// Owned string, if the value is a string
    pub fn string(&self) -> Option<String> {
        self.as_str().map(str::to_owned)
    }

    pub fn string_or(&self, fallback: impl Into<String>) -> String {
        self.string().unwrap_or_else(|| fallback.into())
    }

    /// Textual form of any present value; strings are returned unquoted
    pub fn text(&self) -> Option<String> {
        self.value.map(string_of)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.value.and_then(Value::as_i64)
    }

    pub fn i64_or(&self, fallback: i64) -> i64 {
        self.as_i64().unwrap_or(fallback)
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.value.and_then(Value::as_u64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value.and_then(Value::as_f64)
    }

    pub fn f64_or(&self, fallback: f64) -> f64 {
        self.as_f64().unwrap_or(fallback)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value.and_then(Value::as_bool)
    }

    pub fn bool_or(&self, fallback: bool) -> bool {
        self.as_bool().unwrap_or(fallback)
    }

    pub fn as_object(&self) -> Option<&'a Map<String, Value>> {
        self.value.and_then(Value::as_object)
    }

    pub fn as_array(&self) -> Option<&'a Vec<Value>> {
        self.value.and_then(Value::as_array)
    }

    /// Deserialize the underlying value; absent gives `Ok(None)`
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.value.map(T::deserialize).transpose()
    }

    // Containers

    /// Number of elements or entries, for arrays and objects
    pub fn len(&self) -> Option<usize> {
        match self.value {
            Some(Value::Array(items)) => Some(items.len()),
            Some(Value::Object(map)) => Some(map.len()),
            _ => None,
        }
    }

    /// Lazy sequence of element handles; empty unless the value is an array
    ///
    /// Element handles inherit this handle's observer, so `map`/`filter`
    /// callbacks keep null-safe and traced access.
    pub fn elements(&self) -> Elements<'a> {
        let items: &'a [Value] = match self.value {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        };
        Elements {
            inner: items.iter(),
            observer: self.observer,
        }
    }

    /// Lazy sequence of `(key, handle)` pairs; empty unless the value is an
    /// object. Each yielded key counts as a read.
    pub fn entries(&self) -> Entries<'a> {
        Entries {
            inner: self.as_object().map(|map| map.iter()),
            observer: self.observer,
        }
    }
}

impl<'a> From<&'a Value> for Accessor<'a> {
    fn from(value: &'a Value) -> Self {
        Accessor::new(value)
    }
}

impl fmt::Debug for Accessor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("value", &self.value)
            .field("traced", &self.observer.is_some())
            .finish()
    }
}

/// Element handles of an array, see [`Accessor::elements`]
#[derive(Clone)]
pub struct Elements<'a> {
    inner: std::slice::Iter<'a, Value>,
    observer: Option<&'a dyn AccessObserver>,
}

impl<'a> Elements<'a> {
    fn handle(&self, value: &'a Value) -> Accessor<'a> {
        Accessor {
            value: Some(value),
            observer: self.observer,
        }
    }
}

impl<'a> Iterator for Elements<'a> {
    type Item = Accessor<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.inner.next()?;
        Some(self.handle(value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Elements<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let value = self.inner.next_back()?;
        Some(self.handle(value))
    }
}

impl ExactSizeIterator for Elements<'_> {}

impl FusedIterator for Elements<'_> {}

impl fmt::Debug for Elements<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Elements")
            .field("remaining", &self.inner.len())
            .finish()
    }
}

/// Key/handle pairs of an object, see [`Accessor::entries`]
pub struct Entries<'a> {
    inner: Option<serde_json::map::Iter<'a>>,
    observer: Option<&'a dyn AccessObserver>,
}

impl<'a> Iterator for Entries<'a> {
    type Item = (&'a str, Accessor<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = self.inner.as_mut()?.next()?;
        if let Some(observer) = self.observer {
            observer.record_key(key);
        }
        Some((
            key.as_str(),
            Accessor {
                value: Some(value),
                observer: self.observer,
            },
        ))
    }
}

impl fmt::Debug for Entries<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entries").finish_non_exhaustive()
    }
}
