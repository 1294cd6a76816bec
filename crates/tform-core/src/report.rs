//! Serializable summary of an engine's errors and provenance
//!
//! Copyright (c) 2025 Tform Contributors
//! Licensed under the Apache-2.0 license

use crate::engine::{ErrorSink, Provenance};
use crate::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Point-in-time summary of a sink
#[derive(Debug, Clone, Serialize)]
pub struct TransformReport {
    /// Number of `transform` calls made
    pub records_processed: u64,
    /// Records with at least one error of any kind
    pub failed_records: usize,
    /// Record-level errors (missing identity)
    pub record_errors: usize,
    /// Field-level errors
    pub field_errors: usize,
    /// Field-level error count per output field name
    pub failures_by_field: BTreeMap<String, usize>,
    pub provenance: Provenance,
    /// RFC 3339 timestamp of when the report was built
    pub generated_at: String,
}

impl TransformReport {
    pub fn from_sink(sink: &ErrorSink, records_processed: u64) -> Self {
        let mut failures_by_field = BTreeMap::new();
        let mut failed = BTreeSet::new();
        let mut record_errors = 0;

        for entry in sink.errors() {
            failed.insert(entry.record_no);
            match &entry.field {
                Some(field) => *failures_by_field.entry(field.clone()).or_insert(0) += 1,
                None => record_errors += 1,
            }
        }

        Self {
            records_processed,
            failed_records: failed.len(),
            record_errors,
            field_errors: sink.errors().len() - record_errors,
            failures_by_field,
            provenance: sink.provenance().clone(),
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// No errors of any kind were recorded
    pub fn is_clean(&self) -> bool {
        self.record_errors == 0 && self.field_errors == 0
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
