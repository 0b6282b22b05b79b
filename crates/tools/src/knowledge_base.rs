//! Knowledge-base retrieval tool.
//!
//! Embeds the query, takes the `top_k` nearest chunks from the vector index,
//! and returns their text prefixed with the source document.

use async_trait::async_trait;
use intellicore_core::error::ToolError;
use intellicore_core::knowledge::VectorIndex;
use intellicore_core::model::Embedder;
use intellicore_core::tool::Tool;
use std::sync::Arc;
use tracing::debug;

pub const KNOWLEDGE_BASE_TOOL_NAME: &str = "knowledge_base";
pub const KNOWLEDGE_BASE_DESCRIPTION: &str =
    "Useful for when you need to answer questions using the loaded document collection. \
     Input should be a question or search phrase.";
pub const EMPTY_INDEX: &str = "The knowledge base is empty. Please load documents first.";
pub const NOT_INITIALIZED: &str = "The knowledge base has not been initialized.";

const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

pub struct KnowledgeBaseTool {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl KnowledgeBaseTool {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            top_k: 3,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }
}

#[async_trait]
impl Tool for KnowledgeBaseTool {
    fn name(&self) -> &str {
        KNOWLEDGE_BASE_TOOL_NAME
    }

    fn description(&self) -> &str {
        KNOWLEDGE_BASE_DESCRIPTION
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        let index_empty = self
            .index
            .is_empty()
            .await
            .map_err(|e| ToolError::Failed(format!("knowledge base unavailable: {e}")))?;
        if index_empty {
            return Ok(EMPTY_INDEX.to_string());
        }

        let query = input.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidInput("knowledge base query is empty".into()));
        }

        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| ToolError::Failed(format!("embedding failed: {e}")))?;

        let hits = self
            .index
            .search(&vector, self.top_k)
            .await
            .map_err(|e| ToolError::Failed(format!("knowledge base search failed: {e}")))?;
        debug!(query, hits = hits.len(), "Knowledge base searched");

        if hits.is_empty() {
            return Ok("No relevant documents were found in the knowledge base.".to_string());
        }

        Ok(hits
            .iter()
            .map(|hit| {
                let source = hit.document.source().unwrap_or("unknown");
                format!("Source: {}\n{}", source, hit.document.content)
            })
            .collect::<Vec<_>>()
            .join(CHUNK_SEPARATOR))
    }
}
