//! Rule-driven record transformation engine
//!
//! [`Engine::transform`] walks the rule tree once per record. Every leaf rule
//! gets its own accessor over the whole record, optionally traced so the
//! engine learns which input keys the field reads. A failing leaf only
//! affects its own output key: the error is recorded in the engine's sink,
//! the key is set to `null`, and evaluation moves on to the next key.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use tform_core::{Engine, RuleTree};
//!
//! let rules = RuleTree::builder()
//!     .rule("a", |_| -> anyhow::Result<i64> { anyhow::bail!("oh noes!") })
//!     .rule("b", |x| Ok(x.get("known_field").cloned()))
//!     .build()
//!     .unwrap();
//!
//! let mut engine = Engine::new(rules);
//! let output = engine.transform(&json!({"known_field": 1}));
//!
//! assert_eq!(output, json!({"a": null, "b": 1}));
//! assert_eq!(engine.errors().len(), 1);
//! assert_eq!(engine.errors()[0].field.as_deref(), Some("a"));
//! ```
//!
//! Copyright (c) 2025 Tform Contributors
//! Licensed under the Apache-2.0 license

pub mod config;
pub mod sink;

#[cfg(test)]
mod tests;

pub use config::EngineConfig;
pub use sink::{ErrorEntry, ErrorSink, Provenance};

use crate::accessor::Accessor;
use crate::error::{panic_message, TransformError};
use crate::logging;
use crate::report::TransformReport;
use crate::rules::{field_path, Rule, RuleNode, RuleTree};
use crate::trace::KeyTracer;
use crate::utility::{is_truthy, string_of};
use serde_json::{Map, Value};
use std::panic::{self, AssertUnwindSafe};
use std::thread;

/// Transformation engine owning a rule tree and its error/provenance sink
///
/// One engine is meant to be driven by one caller at a time; `transform`
/// takes `&mut self`. Parallel workers should each own an engine and
/// combine the results with [`ErrorSink::merge`].
#[derive(Debug)]
pub struct Engine {
    rules: RuleTree,
    config: EngineConfig,
    record_count: u64,
    sink: ErrorSink,
}

impl Engine {
    pub fn new(rules: RuleTree) -> Self {
        Self::with_config(rules, EngineConfig::default())
    }

    /// Engine that tags errors with the value of `id_key`
    pub fn with_id_key(rules: RuleTree, id_key: impl Into<String>) -> Self {
        Self::with_config(rules, EngineConfig::default().with_id_key(id_key))
    }

    pub fn with_config(rules: RuleTree, config: EngineConfig) -> Self {
        Self {
            rules,
            config,
            record_count: 0,
            sink: ErrorSink::new(),
        }
    }

    pub fn rules(&self) -> &RuleTree {
        &self.rules
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Transform one record
    ///
    /// Never fails: rule errors and panics are recorded and the affected
    /// output keys are set to `null`. The output always has every key of
    /// the rule tree, in declaration order.
    pub fn transform(&mut self, record: &Value) -> Value {
        self.record_count += 1;
        let record_no = self.record_count;
        let record_id = self.extract_id(record);

        let span = logging::transform_span(record_no, record_id.as_deref());
        let _enter = span.enter();

        let errors_before = self.sink.errors().len();
        self.verify_has_id(record, record_no, record_id.as_deref());

        let mut walk = Walk {
            config: &self.config,
            sink: &mut self.sink,
            record,
            record_no,
            record_id: record_id.as_deref(),
            fields: 0,
        };
        let output = walk.tree(&self.rules, None);
        let fields = walk.fields;

        logging::record_transformed(record_no, fields, self.sink.errors().len() - errors_before);
        Value::Object(output)
    }

    /// Every error recorded so far, oldest first
    pub fn errors(&self) -> &[ErrorEntry] {
        self.sink.errors()
    }

    /// Input keys read per output field, unioned over all records
    pub fn provenance(&self) -> &Provenance {
        self.sink.provenance()
    }

    /// Errors recorded against one output field name
    pub fn field_errors<'s>(&'s self, field: &'s str) -> Vec<&'s ErrorEntry> {
        self.sink.field_errors(field).collect()
    }

    /// Number of `transform` calls so far
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    pub fn sink(&self) -> &ErrorSink {
        &self.sink
    }

    pub fn into_sink(self) -> ErrorSink {
        self.sink
    }

    /// Summary of everything recorded so far
    pub fn report(&self) -> TransformReport {
        TransformReport::from_sink(&self.sink, self.record_count)
    }

    fn extract_id(&self, record: &Value) -> Option<String> {
        let id_key = self.config.id_key.as_deref()?;
        record
            .get(id_key)
            .filter(|value| !value.is_null())
            .map(string_of)
    }

    fn verify_has_id(&mut self, record: &Value, record_no: u64, record_id: Option<&str>) {
        let Some(id_key) = self.config.id_key.as_deref() else {
            return;
        };
        if record.get(id_key).is_some_and(is_truthy) {
            return;
        }

        tracing::warn!(record_no, id_key, "Record is missing its ID key");
        self.sink.push(ErrorEntry {
            error: TransformError::MissingId {
                key: id_key.to_string(),
            },
            field: None,
            path: None,
            record_no,
            record_raw: record.clone(),
            record_id: record_id.map(str::to_owned),
        });
    }
}

/// State of one walk over the rule tree for one record
struct Walk<'e> {
    config: &'e EngineConfig,
    sink: &'e mut ErrorSink,
    record: &'e Value,
    record_no: u64,
    record_id: Option<&'e str>,
    fields: usize,
}

impl Walk<'_> {
    fn tree(&mut self, tree: &RuleTree, prefix: Option<&str>) -> Map<String, Value> {
        let mut output = Map::with_capacity(tree.len());
        for (name, node) in tree.iter() {
            let path = field_path(prefix, name);
            let value = match node {
                RuleNode::Rule(rule) => self.leaf(name, &path, rule),
                RuleNode::Tree(subtree) => Value::Object(self.tree(subtree, Some(&path))),
            };
            output.insert(name.to_string(), value);
        }
        output
    }

    /// Evaluate one leaf; `field` is its key, `path` its dotted location
    fn leaf(&mut self, field: &str, path: &str, rule: &Rule) -> Value {
        self.fields += 1;

        let outcome = if self.config.track_provenance {
            let tracer = KeyTracer::seeded(self.sink.take_keys(field));
            let outcome = invoke(rule, Accessor::new(self.record).traced(&tracer));
            self.sink.store_keys(field, tracer.into_keys());
            outcome
        } else {
            invoke(rule, Accessor::new(self.record))
        };

        let result = match outcome {
            Ok(result) => result.map_err(TransformError::from_rule),
            Err(payload) if !self.config.catch_panics => panic::resume_unwind(payload),
            Err(payload) => Err(TransformError::Panicked {
                message: panic_message(payload.as_ref()),
            }),
        };

        match result {
            Ok(Some(value)) => {
                tracing::trace!(field = path, "Field resolved");
                match value {
                    Value::String(text) if self.config.trim_strings => {
                        Value::String(trimmed(text))
                    }
                    value => value,
                }
            }
            Ok(None) if self.config.require_values => {
                self.fail(
                    field,
                    path,
                    TransformError::UndefinedResult {
                        field: field.to_string(),
                    },
                );
                Value::Null
            }
            Ok(None) => Value::Null,
            Err(error) => {
                self.fail(field, path, error);
                Value::Null
            }
        }
    }

    fn fail(&mut self, field: &str, path: &str, error: TransformError) {
        tracing::warn!(
            field = path,
            record_no = self.record_no,
            record_id = self.record_id.unwrap_or(""),
            error = %error,
            "Field rule failed"
        );
        self.sink.push(ErrorEntry {
            error,
            field: Some(field.to_string()),
            path: Some(path.to_string()),
            record_no: self.record_no,
            record_raw: self.record.clone(),
            record_id: self.record_id.map(str::to_owned),
        });
    }
}

/// Run a rule with panics caught; callers restore provenance before
/// resuming a panic that is not to be recorded
fn invoke(rule: &Rule, record: Accessor<'_>) -> thread::Result<anyhow::Result<Option<Value>>> {
    panic::catch_unwind(AssertUnwindSafe(|| rule.apply(record)))
}

fn trimmed(text: String) -> String {
    let trimmed = text.trim();
    if trimmed.len() == text.len() {
        text
    } else {
        trimmed.to_string()
    }
}
