//! The metadata JSON document.

use std::str::FromStr;

use mkr_reconcile::{canonical_json, SpecHash};

use crate::error::ResourceError;

/// A JSON object stored verbatim under a `(service, namespace)` key.
///
/// Rendered as compact JSON with sorted keys, so `{ "id": 1 }` and
/// `{"id":1}` produce the same `metadata_json` string.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataDocument(serde_json::Map<String, serde_json::Value>);

impl MetadataDocument {
    /// Parse a `metadata_json` string. The top-level value must be an object.
    pub fn parse(s: &str) -> Result<Self, ResourceError> {
        let value: serde_json::Value = serde_json::from_str(s)
            .map_err(|e| ResourceError::InvalidDocument(format!("not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Wrap an already-decoded value. The value must be an object.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ResourceError> {
        match value {
            serde_json::Value::Object(map) => Ok(Self(map)),
            other => Err(ResourceError::InvalidDocument(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// The document as a JSON value (always an object).
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::Value::Object(self.0.clone())
    }

    /// The document's top-level members.
    pub fn as_map(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.0
    }

    /// Canonical `metadata_json` string.
    pub fn to_json_string(&self) -> String {
        canonical_json(&self.to_value())
    }

    /// Hash used to decide whether an update is needed.
    pub fn spec_hash(&self) -> SpecHash {
        SpecHash::from_json(&self.to_value())
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

impl std::fmt::Display for MetadataDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_json_string())
    }
}

impl FromStr for MetadataDocument {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for MetadataDocument {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_json_string())
    }
}

impl<'de> serde::Deserialize<'de> for MetadataDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_document_renders_compact_sorted() {
        let doc = MetadataDocument::parse(r#"{ "b": [1, 2], "a": { "id": 1 } }"#).unwrap();
        assert_eq!(doc.to_json_string(), r#"{"a":{"id":1},"b":[1,2]}"#);
        assert_eq!(doc.as_map().len(), 2);
    }

    #[test]
    fn test_document_equivalent_text_same_hash() {
        let a = MetadataDocument::parse(r#"{"id":1,"name":"x"}"#).unwrap();
        let b = MetadataDocument::parse("{\n  \"name\": \"x\",\n  \"id\": 1\n}").unwrap();
        assert_eq!(a.spec_hash(), b.spec_hash());
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_document_keeps_numbers_verbatim() {
        let raw = r#"{"big":12345678901234567890123,"id":9007199254740993,"ratio":0.1000000000000000055511}"#;
        let doc = MetadataDocument::parse(raw).unwrap();
        assert_eq!(doc.to_json_string(), raw);
        assert_ne!(
            doc.spec_hash(),
            MetadataDocument::parse(r#"{"big":12345678901234567890124,"id":9007199254740993,"ratio":0.1000000000000000055511}"#)
                .unwrap()
                .spec_hash()
        );
    }

    #[rstest]
    #[case("", "not valid JSON")]
    #[case("{", "not valid JSON")]
    #[case("[1]", "an array")]
    #[case("\"id\"", "a string")]
    #[case("null", "null")]
    fn test_document_rejects_non_objects(#[case] raw: &str, #[case] needle: &str) {
        let err = MetadataDocument::parse(raw).unwrap_err();
        assert!(matches!(err, ResourceError::InvalidDocument(_)));
        assert!(err.to_string().contains(needle), "{err}");
    }

    #[test]
    fn test_document_serializes_as_string() {
        let doc = MetadataDocument::parse(r#"{"id":1}"#).unwrap();
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(json, r#""{\"id\":1}""#);
        let back: MetadataDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
