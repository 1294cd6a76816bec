//! Error and provenance sink
//!
//! The sink is owned by one engine and only ever grows: error entries are
//! appended in the order they happen and provenance key sets are unioned
//! across records. Callers read it through the engine's accessors.

use crate::error::TransformError;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

/// Output field name to the input keys it has read, across all records
pub type Provenance = BTreeMap<String, BTreeSet<String>>;

/// One recorded failure
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEntry {
    #[serde(serialize_with = "serialize_display")]
    pub error: TransformError,

    /// Output key of the failed field; `None` for record-level errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Dotted location of the failed field in the rule tree (`name.first`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// 1-based sequence number of the `transform` call
    pub record_no: u64,

    pub record_raw: Value,

    /// Textual form of the identity field, when configured and present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}

impl ErrorEntry {
    pub fn is_record_level(&self) -> bool {
        self.field.is_none()
    }
}

fn serialize_display<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Append-only error list plus provenance map
#[derive(Debug, Clone, Default)]
pub struct ErrorSink {
    errors: Vec<ErrorEntry>,
    provenance: Provenance,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ErrorEntry) {
        self.errors.push(entry);
    }

    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Keys read so far by `field`
    pub fn keys_for(&self, field: &str) -> Option<&BTreeSet<String>> {
        self.provenance.get(field)
    }

    /// Entries recorded against `field`
    pub fn field_errors<'s>(&'s self, field: &'s str) -> impl Iterator<Item = &'s ErrorEntry> {
        self.errors
            .iter()
            .filter(move |entry| entry.field.as_deref() == Some(field))
    }

    /// Entries recorded while transforming record `record_no`
    pub fn record_errors(&self, record_no: u64) -> impl Iterator<Item = &ErrorEntry> {
        self.errors
            .iter()
            .filter(move |entry| entry.record_no == record_no)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Check out the key set of `field`, creating it on first use. Must be
    /// handed back with [`ErrorSink::store_keys`].
    pub(crate) fn take_keys(&mut self, field: &str) -> BTreeSet<String> {
        self.provenance.remove(field).unwrap_or_default()
    }

    pub(crate) fn store_keys(&mut self, field: &str, keys: BTreeSet<String>) {
        self.provenance.insert(field.to_string(), keys);
    }

    /// Fold another sink into this one: errors are appended after ours and
    /// key sets are unioned
    pub fn merge(&mut self, other: ErrorSink) {
        self.errors.extend(other.errors);
        for (field, keys) in other.provenance {
            self.provenance.entry(field).or_default().extend(keys);
        }
    }
}
