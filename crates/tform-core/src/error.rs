//! Error types for the tform core library
//!
//! Two families live here. [`Error`] covers failures the caller sees directly
//! (building a rule tree, loading configuration). [`TransformError`] covers
//! failures the engine records into its error list while transforming a
//! record; those never escape `Engine::transform`.
//!
//! Copyright (c) 2025 Tform Contributors
//! Licensed under the Apache-2.0 license

use std::any::Any;
use std::sync::Arc;
use thiserror::Error;

/// Main error type for tform operations
#[derive(Error, Debug)]
pub enum Error {
    /// Rule tree construction errors
    #[error("Invalid rule tree at '{path}': {message}")]
    RuleTree { path: String, message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// A failure recorded against one record, or one field of one record
#[derive(Error, Debug, Clone)]
pub enum TransformError {
    /// The configured identity field is absent or falsy
    #[error("Missing ID key '{key}'")]
    MissingId { key: String },

    /// The rule function returned an error
    #[error("{message}")]
    Rule {
        message: String,
        cause: Arc<anyhow::Error>,
    },

    /// The rule produced no value while values are required
    #[error("property '{field}' of result is undefined")]
    UndefinedResult { field: String },

    /// The rule function panicked
    #[error("rule panicked: {message}")]
    Panicked { message: String },
}

impl TransformError {
    /// Wrap an error returned by a rule function
    pub fn from_rule(err: anyhow::Error) -> Self {
        TransformError::Rule {
            message: format!("{:#}", err),
            cause: Arc::new(err),
        }
    }

    /// The original error returned by the rule, if this is a rule failure
    pub fn rule_error(&self) -> Option<&anyhow::Error> {
        match self {
            TransformError::Rule { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }

    /// Whether this error concerns the whole record rather than a field
    pub fn is_record_level(&self) -> bool {
        matches!(self, TransformError::MissingId { .. })
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

/// Extract a message from a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    }
}
