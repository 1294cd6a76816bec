//! Rule tree model and builder
//!
//! A [`RuleTree`] maps output field names to either a [`Rule`] (a function of
//! the whole input record) or a nested tree that produces a nested output
//! object. Names keep their declaration order, which is also the key order
//! of the output record.
//!
//! ```
//! use tform_core::{split_list, RuleTree};
//!
//! let rules = RuleTree::builder()
//!     .rule("job", |x| Ok(x.get("job").string()))
//!     .tree(
//!         "name",
//!         RuleTree::builder()
//!             .rule("first", |x| {
//!                 Ok(x.get("name").as_str().and_then(|n| n.split(' ').next()).map(str::to_owned))
//!             }),
//!     )
//!     .rule("age", |x| Ok(x.get("age").i64_or(-1)))
//!     .rule("hobbies", |x| Ok(split_list(",", x.get("hobbies").str_or(""))))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(rules.leaf_paths(), vec!["job", "name.first", "age", "hobbies"]);
//! ```
//!
//! Copyright (c) 2025 Tform Contributors
//! Licensed under the Apache-2.0 license

use crate::accessor::Accessor;
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Erased rule signature stored in the tree
pub type RuleFn = dyn Fn(Accessor<'_>) -> anyhow::Result<Option<Value>> + Send + Sync;

/// Conversion from a rule's return value into an optional output value
///
/// `None` (or an absent `Option`) means the rule produced nothing for this
/// record.
pub trait IntoFieldValue {
    fn into_field_value(self) -> Option<Value>;
}

impl IntoFieldValue for Value {
    fn into_field_value(self) -> Option<Value> {
        Some(self)
    }
}

impl<T: IntoFieldValue> IntoFieldValue for Option<T> {
    fn into_field_value(self) -> Option<Value> {
        self.and_then(IntoFieldValue::into_field_value)
    }
}

impl<T: IntoFieldValue> IntoFieldValue for Vec<T> {
    fn into_field_value(self) -> Option<Value> {
        Some(Value::Array(
            self.into_iter()
                .map(|item| item.into_field_value().unwrap_or(Value::Null))
                .collect(),
        ))
    }
}

impl IntoFieldValue for Map<String, Value> {
    fn into_field_value(self) -> Option<Value> {
        Some(Value::Object(self))
    }
}

impl IntoFieldValue for &str {
    fn into_field_value(self) -> Option<Value> {
        Some(Value::String(self.to_owned()))
    }
}

macro_rules! into_field_value_via_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoFieldValue for $ty {
                fn into_field_value(self) -> Option<Value> {
                    Some(Value::from(self))
                }
            }
        )*
    };
}

into_field_value_via_from!(String, bool, i32, i64, u32, u64, usize, f64);

/// A leaf rule: a function from the record accessor to one output value
#[derive(Clone)]
pub struct Rule {
    inner: Arc<RuleFn>,
}

impl Rule {
    pub fn new<F, T>(f: F) -> Self
    where
        F: Fn(Accessor<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
        T: IntoFieldValue,
    {
        Self {
            inner: Arc::new(move |record: Accessor<'_>| {
                f(record).map(IntoFieldValue::into_field_value)
            }),
        }
    }

    /// Evaluate the rule against `record`
    pub fn apply(&self, record: Accessor<'_>) -> anyhow::Result<Option<Value>> {
        (self.inner)(record)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Rule(..)")
    }
}

/// A node of the rule tree
#[derive(Debug, Clone)]
pub enum RuleNode {
    Rule(Rule),
    Tree(RuleTree),
}

/// Ordered mapping from output field name to rule or subtree
#[derive(Debug, Clone, Default)]
pub struct RuleTree {
    entries: Vec<(String, RuleNode)>,
}

impl RuleTree {
    pub fn builder() -> RuleTreeBuilder {
        RuleTreeBuilder::new()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleNode)> {
        self.entries.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn get(&self, name: &str) -> Option<&RuleNode> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, node)| node)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dotted paths of every leaf rule, in evaluation order
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_leaf_paths(None, &mut paths);
        paths
    }

    fn collect_leaf_paths(&self, prefix: Option<&str>, paths: &mut Vec<String>) {
        for (name, node) in &self.entries {
            let path = field_path(prefix, name);
            match node {
                RuleNode::Rule(_) => paths.push(path),
                RuleNode::Tree(tree) => tree.collect_leaf_paths(Some(&path), paths),
            }
        }
    }
}

/// Dotted field path of `name` under `prefix`
pub(crate) fn field_path(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}.{}", prefix, name),
        None => name.to_string(),
    }
}

enum PendingNode {
    Rule(Rule),
    Tree(RuleTreeBuilder),
}

/// Builder for rule trees
///
/// Validation happens in [`RuleTreeBuilder::build`]: names must be non-empty
/// and unique within one level.
#[derive(Default)]
pub struct RuleTreeBuilder {
    entries: Vec<(String, PendingNode)>,
}

impl RuleTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a leaf rule
    pub fn rule<F, T>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Accessor<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
        T: IntoFieldValue,
    {
        self.node(name, PendingNode::Rule(Rule::new(f)))
    }

    /// Add an already constructed rule, e.g. one shared between trees
    pub fn add_rule(self, name: impl Into<String>, rule: Rule) -> Self {
        self.node(name, PendingNode::Rule(rule))
    }

    /// Add a subtree producing a nested output object
    pub fn tree(self, name: impl Into<String>, subtree: RuleTreeBuilder) -> Self {
        self.node(name, PendingNode::Tree(subtree))
    }

    fn node(mut self, name: impl Into<String>, node: PendingNode) -> Self {
        self.entries.push((name.into(), node));
        self
    }

    /// Validate and build the tree
    pub fn build(self) -> Result<RuleTree> {
        self.build_at(None)
    }

    fn build_at(self, prefix: Option<&str>) -> Result<RuleTree> {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(self.entries.len());

        for (name, node) in self.entries {
            let path = field_path(prefix, &name);
            if name.is_empty() {
                return Err(Error::RuleTree {
                    path,
                    message: "rule name must not be empty".to_string(),
                });
            }
            if !seen.insert(name.clone()) {
                return Err(Error::RuleTree {
                    path,
                    message: format!("duplicate rule name '{}'", name),
                });
            }
            let node = match node {
                PendingNode::Rule(rule) => RuleNode::Rule(rule),
                PendingNode::Tree(builder) => RuleNode::Tree(builder.build_at(Some(&path))?),
            };
            entries.push((name, node));
        }

        Ok(RuleTree { entries })
    }
}
