//! Pipeline configuration
//!
//! A pipeline is described as an ordered list of passes, each with a free-form
//! keyword configuration:
//!
//! ```json
//! {
//!   "passes": [
//!     { "name": "prune", "config": { "keep_types": ["Placeholder"] } },
//!     { "name": "refcnt" }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{OptResult, TransformError};

/// Keyword configuration of one pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PassConfig {
    values: BTreeMap<String, Value>,
}

impl PassConfig {
    /// Empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a keyword
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Raw value of a keyword
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Keywords present, sorted
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reject every keyword not in `allowed`
    pub fn deny_unknown(&self, pass: &str, allowed: &[&str]) -> OptResult<()> {
        match self.keys().find(|key| !allowed.contains(key)) {
            Some(key) => Err(TransformError::invalid_config(
                pass,
                format!("unknown keyword '{}'", key),
            )),
            None => Ok(()),
        }
    }

    /// Boolean keyword
    pub fn get_bool(&self, pass: &str, key: &str) -> OptResult<Option<bool>> {
        self.typed(pass, key, "a boolean", Value::as_bool)
    }

    /// Non-negative integer keyword
    pub fn get_usize(&self, pass: &str, key: &str) -> OptResult<Option<usize>> {
        self.typed(pass, key, "a non-negative integer", |v| {
            v.as_u64().and_then(|n| usize::try_from(n).ok())
        })
    }

    /// String keyword
    pub fn get_str(&self, pass: &str, key: &str) -> OptResult<Option<&str>> {
        self.typed(pass, key, "a string", Value::as_str)
    }

    /// String-list keyword
    pub fn get_strs(&self, pass: &str, key: &str) -> OptResult<Option<Vec<String>>> {
        self.typed(pass, key, "a list of strings", |v| {
            v.as_array()?
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect()
        })
    }

    fn typed<'a, T>(
        &'a self,
        pass: &str,
        key: &str,
        expected: &str,
        convert: impl FnOnce(&'a Value) -> Option<T>,
    ) -> OptResult<Option<T>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(value) => convert(value).map(Some).ok_or_else(|| {
                TransformError::invalid_config(
                    pass,
                    format!("'{}' must be {}, got {}", key, expected, value),
                )
            }),
        }
    }
}

/// One entry of a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassSpec {
    /// Registered pass name
    pub name: String,

    /// Keyword configuration handed to the pass factory
    #[serde(default, skip_serializing_if = "PassConfig::is_empty")]
    pub config: PassConfig,
}

impl PassSpec {
    /// Pass without configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: PassConfig::default(),
        }
    }

    /// Attach a configuration
    pub fn with_config(mut self, config: PassConfig) -> Self {
        self.config = config;
        self
    }
}

/// Ordered list of passes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Passes in execution order
    #[serde(default)]
    pub passes: Vec<PassSpec>,
}

impl PipelineConfig {
    /// Empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline of unconfigured passes
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            passes: names.into_iter().map(PassSpec::new).collect(),
        }
    }

    /// Append a pass
    pub fn with_pass(mut self, spec: PassSpec) -> Self {
        self.passes.push(spec);
        self
    }

    /// Pass names in execution order
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|spec| spec.name.as_str()).collect()
    }

    /// Parse from a JSON document
    pub fn from_json_str(content: &str) -> OptResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> OptResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}
