//! Knowledge-base value types and the similarity-search seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::error::IndexError;

/// A unit of text in the knowledge base (a loaded file or one chunk of it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,

    pub content: String,

    /// Provenance, e.g. `source` and `chunk_number`.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            metadata: BTreeMap::new(),
            embedding: None,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// The `source` metadata entry, if any.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").map(String::as_str)
    }
}

/// A search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

/// A similarity-search index over embedded documents.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Add documents. Each must carry an embedding.
    async fn add(&self, documents: Vec<Document>) -> std::result::Result<usize, IndexError>;

    /// The `k` nearest documents, best first.
    async fn search(&self, vector: &[f32], k: usize) -> std::result::Result<Vec<ScoredDocument>, IndexError>;

    /// Number of indexed documents.
    async fn len(&self) -> std::result::Result<usize, IndexError>;

    async fn is_empty(&self) -> std::result::Result<bool, IndexError> {
        Ok(self.len().await? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_metadata_and_embedding() {
        let doc = Document::new("text")
            .with_metadata("source", "notes.txt")
            .with_embedding(vec![1.0, 0.0]);
        assert_eq!(doc.source(), Some("notes.txt"));
        assert_eq!(doc.embedding.as_deref(), Some(&[1.0, 0.0][..]));
    }

    #[test]
    fn embedding_is_omitted_when_absent() {
        let json = serde_json::to_string(&Document::new("x")).unwrap();
        assert!(!json.contains("embedding"));
    }
}
