//! Tform Core - rule-driven record transformation
//!
//! This crate turns heterogeneous, possibly incomplete input records into
//! well-shaped output records by applying a declarative tree of field rules.
//!
//! # Main Components
//!
//! - **Accessor**: null-safe handle for navigating partially absent records
//!   without guard clauses ([`Accessor`])
//! - **Tracing**: optional observer recording which input keys a rule reads
//!   ([`trace`], [`KeyTracer`])
//! - **Rules**: ordered, nestable rule trees ([`RuleTree`], [`RuleTreeBuilder`])
//! - **Engine**: walks the rule tree per record, isolates per-field failures
//!   and accumulates errors and provenance ([`Engine`])
//! - **Error Handling**: error types using `thiserror` and `anyhow`
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use tform_core::{split_list, Engine, RuleTree};
//!
//! let rules = RuleTree::builder()
//!     .rule("job", |x| Ok(x.get("job").string()))
//!     .rule("age", |x| Ok(x.get("age").i64_or(-1)))
//!     .rule("hobbies", |x| Ok(split_list(",", x.get("hobbies").str_or(""))))
//!     .build()?;
//!
//! let mut engine = Engine::new(rules);
//! let output = engine.transform(&json!({
//!     "job": "Engineer ",
//!     "hobbies": "Biking, Skating,,",
//! }));
//!
//! assert_eq!(
//!     output,
//!     json!({"job": "Engineer", "age": -1, "hobbies": ["Biking", "Skating"]})
//! );
//! assert!(engine.errors().is_empty());
//! # Ok::<(), tform_core::Error>(())
//! ```

pub mod accessor;
pub mod engine;
pub mod error;
pub mod path;
pub mod report;
pub mod rules;
pub mod trace;
pub mod utility;

mod logging;

// Re-export main types for convenience
pub use accessor::{wrap, Accessor, Elements, Entries};
pub use engine::{Engine, EngineConfig, ErrorEntry, ErrorSink, Provenance};
pub use error::{Error, Result, TransformError};
pub use path::{FieldPath, PathError, PathStep};
pub use report::TransformReport;
pub use rules::{IntoFieldValue, Rule, RuleNode, RuleTree, RuleTreeBuilder};
pub use trace::{trace, AccessObserver, KeyTracer};
pub use utility::{is_truthy, split_list, string_of, wrap_list};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
