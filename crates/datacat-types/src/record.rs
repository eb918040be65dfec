//! The record model: a mapping from field name to a dynamically typed value.

use serde::{Deserialize, Serialize};
use serde_json::Map;

/// Dynamically typed scalar (or null) held by a record field.
pub type Value = serde_json::Value;

/// One row of tabular data moving through a task.
///
/// Field names are unique within a record. Records flowing through the same
/// stream are not required to share a field set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns the field value unless it is absent or null.
    #[must_use]
    pub fn get_non_null(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|value| !value.is_null())
    }

    /// Sets a field, returning the value it replaced.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Keeps only the fields for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &Value) -> bool) {
        self.0.retain(|field, value| keep(field, value));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl std::ops::Index<&str> for Record {
    type Output = Value;

    /// Panics if the field is absent; use [`Record::get`] otherwise.
    fn index(&self, field: &str) -> &Value {
        &self.0[field]
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
