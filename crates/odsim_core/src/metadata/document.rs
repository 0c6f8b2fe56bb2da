//! Metadata document wrapper.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::merge::merge;
use super::{MetadataError, MetadataResult};

/// Key holding the store identifier of the described resource.
pub const ID_KEY: &str = "@id";

/// JSON-LD descriptor attached to an artifact or a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataDocument(Value);

impl MetadataDocument {
    /// Wrap an already-built JSON value.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// An empty mapping.
    pub fn empty() -> Self {
        Self(Value::Object(serde_json::Map::new()))
    }

    /// Parse a document from JSON text.
    pub fn from_json_str(text: &str) -> MetadataResult<Self> {
        let value = serde_json::from_str(text).map_err(|e| MetadataError::parse("document", e))?;
        Ok(Self(value))
    }

    /// Serialize to compact JSON text.
    pub fn to_json_string(&self) -> MetadataResult<String> {
        serde_json::to_string(&self.0).map_err(MetadataError::Serialize)
    }

    /// Borrow the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwrap into the underlying JSON value.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// The `@id` of the described resource, if present and a string.
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_KEY).and_then(Value::as_str)
    }

    /// Look up a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Replace (not merge) a top-level field.
    ///
    /// Turns a non-mapping document into a mapping first.
    pub fn set_field(&mut self, key: impl Into<String>, value: Value) {
        if !self.0.is_object() {
            self.0 = Value::Object(serde_json::Map::new());
        }
        if let Value::Object(map) = &mut self.0 {
            map.insert(key.into(), value);
        }
    }

    /// Deep-merge `other` into this document. See [`merge`].
    pub fn merge(self, other: MetadataDocument) -> Self {
        Self(merge(self.0, other.0))
    }
}

impl Default for MetadataDocument {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Value> for MetadataDocument {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl fmt::Display for MetadataDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
