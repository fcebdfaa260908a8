//! Raw inference request as submitted by the form

use serde::Deserialize;
use std::collections::HashMap;

/// Untrusted feature values keyed by feature name.
///
/// Values are kept verbatim; coercion happens in the validator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RawRequest {
    values: HashMap<String, String>,
}

impl RawRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a raw value
    pub fn with_value(mut self, feature: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(feature.into(), value.into());
        self
    }

    /// Raw value for a feature, if one was submitted
    pub fn get(&self, feature: &str) -> Option<&str> {
        self.values.get(feature).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<HashMap<String, String>> for RawRequest {
    fn from(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

/// Builds a request from form pairs; a repeated key keeps its first value.
impl<K, V> FromIterator<(K, V)> for RawRequest
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut values = HashMap::new();
        for (k, v) in iter {
            values.entry(k.into()).or_insert_with(|| v.into());
        }
        Self { values }
    }
}
