//! JSON-lines vector index: the knowledge-base collection.
//!
//! Each line is a JSON-encoded [`Document`] with its embedding. Documents are
//! loaded into memory on open and appended to disk on every `add`.
//!
//! Storage location: `~/.intellicore/knowledge/<collection>.jsonl`

use async_trait::async_trait;
use intellicore_core::error::IndexError;
use intellicore_core::knowledge::{Document, ScoredDocument, VectorIndex};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::vector::rank_by_similarity;

/// A brute-force cosine-similarity index, optionally persisted as JSONL.
pub struct FileVectorIndex {
    path: Option<PathBuf>,
    documents: Arc<RwLock<Vec<Document>>>,
}

impl FileVectorIndex {
    /// Open the index at `path`, loading any existing documents.
    ///
    /// A missing file is an empty index; it is created on first `add`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let documents = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = documents.len(), "Vector index loaded");
        Self {
            path: Some(path),
            documents: Arc::new(RwLock::new(documents)),
        }
    }

    /// A non-persistent index.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            documents: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn load_from_disk(path: &PathBuf) -> Vec<Document> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<Document>(line) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted index entry");
                    None
                }
            })
            .collect()
    }

    async fn append_to_disk(&self, documents: &[Document]) -> Result<(), IndexError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| IndexError::Storage(format!("Failed to create index directory: {e}")))?;
        }

        let mut content = String::new();
        for doc in documents {
            let line = serde_json::to_string(doc)
                .map_err(|e| IndexError::Storage(format!("Failed to serialize document: {e}")))?;
            content.push_str(&line);
            content.push('\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| IndexError::Storage(format!("Failed to open index file: {e}")))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| IndexError::Storage(format!("Failed to write index file: {e}")))?;
        file.flush()
            .await
            .map_err(|e| IndexError::Storage(format!("Failed to flush index file: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for FileVectorIndex {
    async fn add(&self, documents: Vec<Document>) -> Result<usize, IndexError> {
        let mut stored = self.documents.write().await;

        let mut dimension = stored
            .first()
            .and_then(|d| d.embedding.as_ref())
            .map(Vec::len);
        for doc in &documents {
            let Some(emb) = &doc.embedding else {
                return Err(IndexError::EmbeddingFailed(format!(
                    "document {} has no embedding",
                    doc.id
                )));
            };
            match dimension {
                Some(expected) if expected != emb.len() => {
                    return Err(IndexError::DimensionMismatch {
                        expected,
                        actual: emb.len(),
                    });
                }
                None => dimension = Some(emb.len()),
                _ => {}
            }
        }

        self.append_to_disk(&documents).await?;
        let added = documents.len();
        stored.extend(documents);
        debug!(added, total = stored.len(), "Documents indexed");
        Ok(added)
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredDocument>, IndexError> {
        let documents = self.documents.read().await;
        Ok(rank_by_similarity(&documents, vector, k))
    }

    async fn len(&self) -> Result<usize, IndexError> {
        Ok(self.documents.read().await.len())
    }
}
