//! Engine configuration
//!
//! Values come from, in increasing precedence:
//! - Defaults
//! - A JSON document (string or file)
//! - Environment variables (`TFORM_*`)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one [`Engine`](super::Engine) instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Input field identifying a record; tagged onto every error entry
    pub id_key: Option<String>,

    /// Record which input keys each output field reads
    pub track_provenance: bool,

    /// Trim leading and trailing whitespace from string results
    pub trim_strings: bool,

    /// Record an error when a rule produces no value
    pub require_values: bool,

    /// Convert panics inside rules into field errors
    ///
    /// A caught panic still goes through the process panic hook, so the
    /// default hook prints its message to stderr. Install a quieter hook with
    /// `std::panic::set_hook` if batch output must stay clean.
    pub catch_panics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            id_key: None,
            track_provenance: true,
            trim_strings: true,
            require_values: false,
            catch_panics: true,
        }
    }
}

impl EngineConfig {
    pub fn with_id_key(mut self, id_key: impl Into<String>) -> Self {
        self.id_key = Some(id_key.into());
        self
    }

    pub fn track_provenance(mut self, enabled: bool) -> Self {
        self.track_provenance = enabled;
        self
    }

    pub fn trim_strings(mut self, enabled: bool) -> Self {
        self.trim_strings = enabled;
        self
    }

    pub fn require_values(mut self, enabled: bool) -> Self {
        self.require_values = enabled;
        self
    }

    pub fn catch_panics(mut self, enabled: bool) -> Self {
        self.catch_panics = enabled;
        self
    }

    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::Io {
            message: format!("failed to read {}", path.display()),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| Error::Configuration {
            message: format!("invalid configuration in {}", path.display()),
            source: Some(e.into()),
        })
    }

    /// Apply `TFORM_*` environment overrides
    pub fn merge_with_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable source
    ///
    /// `TFORM_ID_KEY` set to an empty string clears the identity field.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id_key) = lookup("TFORM_ID_KEY") {
            self.id_key = if id_key.is_empty() { None } else { Some(id_key) };
        }
        if let Some(enabled) = flag(&lookup, "TFORM_TRACK_PROVENANCE") {
            self.track_provenance = enabled;
        }
        if let Some(enabled) = flag(&lookup, "TFORM_TRIM_STRINGS") {
            self.trim_strings = enabled;
        }
        if let Some(enabled) = flag(&lookup, "TFORM_REQUIRE_VALUES") {
            self.require_values = enabled;
        }
        if let Some(enabled) = flag(&lookup, "TFORM_CATCH_PANICS") {
            self.catch_panics = enabled;
        }
    }
}

fn flag<F>(lookup: &F, name: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(variable = name, value = %raw, "Invalid boolean override, ignoring");
            None
        }
    }
}
