//! JSON document wrapper with type/version accessors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A schemaless document: a JSON object with a type and a version field.
///
/// Field names are not fixed; accessors take the configured names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value, returning `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// The document's migration family, if `type_field` holds a string.
    pub fn doc_type(&self, type_field: &str) -> Option<&str> {
        self.0.get(type_field).and_then(Value::as_str)
    }

    /// Schema version; anything other than a non-negative integer reads as 0.
    pub fn version(&self, version_field: &str) -> u64 {
        self.0.get(version_field).and_then(Value::as_u64).unwrap_or(0)
    }

    pub fn set_version(&mut self, version_field: &str, version: u64) {
        self.0.insert(version_field.to_string(), Value::from(version));
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.into_value()
    }
}

impl TryFrom<Value> for Document {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[test]
    fn reads_type_and_version() {
        let d = doc(json!({"type": "article", "version": 2, "title": "hi"}));
        assert_eq!(d.doc_type("type"), Some("article"));
        assert_eq!(d.version("version"), 2);
    }

    #[test]
    fn missing_version_reads_as_zero() {
        let d = doc(json!({"type": "article"}));
        assert_eq!(d.version("version"), 0);
    }

    #[test]
    fn malformed_version_reads_as_zero() {
        assert_eq!(doc(json!({"version": -1})).version("version"), 0);
        assert_eq!(doc(json!({"version": 1.5})).version("version"), 0);
        assert_eq!(doc(json!({"version": "3"})).version("version"), 0);
        assert_eq!(doc(json!({"version": null})).version("version"), 0);
    }

    #[test]
    fn non_string_type_is_absent() {
        assert_eq!(doc(json!({"type": 7})).doc_type("type"), None);
        assert_eq!(doc(json!({})).doc_type("type"), None);
    }

    #[test]
    fn custom_field_names() {
        let d = doc(json!({"kind": "user", "rev": 5}));
        assert_eq!(d.doc_type("kind"), Some("user"));
        assert_eq!(d.version("rev"), 5);
        assert_eq!(d.version("version"), 0);
    }

    #[test]
    fn set_version_overwrites_field() {
        let mut d = doc(json!({"type": "article", "version": 0}));
        d.set_version("version", 4);
        assert_eq!(d.get("version"), Some(&json!(4)));
    }

    #[test]
    fn rejects_non_object_values() {
        assert!(Document::from_value(json!([1, 2])).is_none());
        assert!(Document::try_from(json!("text")).is_err());
    }

    #[test]
    fn serializes_as_plain_object() {
        let d = doc(json!({"type": "article", "version": 1}));
        let text = serde_json::to_string(&d).unwrap();
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, json!({"type": "article", "version": 1}));
    }
}
