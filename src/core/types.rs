use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

/// A single metadata value: string, number, or boolean.
///
/// Metadata is a closed sum type rather than free-form JSON so that the
/// filter compiler can type-check operators against operands and fail fast
/// on mismatches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Num(f64),
    Str(String),
}

impl Scalar {
    /// Numeric view for ordering comparisons. `None` for strings/booleans.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Scalar::Num(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Num(n) => write!(f, "{}", n),
            Scalar::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Num(n)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Num(n as f64)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// A metadata field value: a scalar or an ordered list of scalars.
///
/// List values model multi-valued fields such as `author: ["Alice", "Bob"]`;
/// equality and membership operators treat them with containment semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl From<Scalar> for MetaValue {
    fn from(s: Scalar) -> Self {
        MetaValue::Scalar(s)
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Scalar(s.into())
    }
}

impl From<f64> for MetaValue {
    fn from(n: f64) -> Self {
        MetaValue::Scalar(n.into())
    }
}

impl From<i64> for MetaValue {
    fn from(n: i64) -> Self {
        MetaValue::Scalar(n.into())
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        MetaValue::Scalar(b.into())
    }
}

/// Document metadata: string keys mapped to scalar or list values.
pub type Metadata = HashMap<String, MetaValue>;

/// A stored document: stable id, text content, and structured metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Ingest shape accepted by the document store.
///
/// `id` is raw id material, not the final token: the store derives the
/// stored identifier from it (or from `content` when absent). `embedding`
/// may be pre-computed by the caller; otherwise the store embeds `content`.
#[derive(Debug, Clone, Default)]
pub struct DocumentInput {
    pub content: String,
    pub metadata: Metadata,
    pub id: Option<String>,
    pub embedding: Option<Vec<f32>>,
}

impl DocumentInput {
    pub fn new(content: impl Into<String>) -> Self {
        DocumentInput {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// Backend record: a document together with its embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub document: Document,
    pub embedding: Vec<f32>,
}

/// One ranked search hit. Score semantics follow the collection's distance
/// strategy; results are always returned best-first regardless of direction.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub document: Document,
    pub score: f32,
}

/// Derive a deterministic document id from raw material.
///
/// SHA-256 of the material, hex-encoded, truncated to 16 characters and
/// uppercased. Identical material always yields the same token, which is
/// what makes content-addressed re-insertion idempotent.
pub fn derive_id(material: &str) -> String {
    let digest = Sha256::digest(material.as_bytes());
    hex::encode(digest)[..16].to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_derive_id_deterministic() {
        let a = derive_id("I like soccer.");
        let b = derive_id("I like soccer.");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert_eq!(a, a.to_ascii_uppercase());
    }

    #[test]
    fn test_derive_id_distinct_material() {
        assert_ne!(derive_id("hello"), derive_id("hi"));
    }

    #[test]
    fn test_derive_id_known_value() {
        // sha256("1") = 6b86b273ff34fce1...
        assert_eq!(derive_id("1"), "6B86B273FF34FCE1");
    }

    #[test]
    fn test_metadata_from_json() {
        let metadata: Metadata = serde_json::from_value(json!({
            "category": "books",
            "price": 15,
            "in_print": true,
            "author": ["Alice", "Bob"],
        }))
        .unwrap();

        assert_eq!(metadata["category"], MetaValue::from("books"));
        assert_eq!(metadata["price"], MetaValue::from(15.0));
        assert_eq!(metadata["in_print"], MetaValue::from(true));
        assert_eq!(
            metadata["author"],
            MetaValue::List(vec![Scalar::from("Alice"), Scalar::from("Bob")])
        );
    }

    #[test]
    fn test_scalar_numeric_equality() {
        assert_eq!(Scalar::from(20i64), Scalar::from(20.0));
        assert_ne!(Scalar::from(20i64), Scalar::from("20"));
    }
}
