//! `intellicore ingest`: load, split, embed, and index documents.

use anyhow::{Context, bail};
use intellicore_core::knowledge::{Document, VectorIndex};
use intellicore_core::model::Embedder;
use intellicore_memory::{load_path, split_text};
use std::path::Path;
use tracing::info;

use super::runtime;

pub async fn run(
    path: &Path,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
) -> anyhow::Result<()> {
    let config = runtime::load_config()?;
    let chunk_size = chunk_size.unwrap_or(config.knowledge_base.chunk_size);
    let chunk_overlap = chunk_overlap.unwrap_or(config.knowledge_base.chunk_overlap);

    let backends = intellicore_providers::build_from_config(&config);
    let Some(embedder) = backends.embedder else {
        bail!("No API key configured; embeddings are unavailable");
    };
    let index = runtime::open_index(&config);

    println!("📚 Ingesting {}", path.display());
    let added = ingest(path, chunk_size, chunk_overlap, embedder.as_ref(), index.as_ref()).await?;
    let total = index.len().await.context("Failed to read index size")?;

    println!("✅ Added {added} chunks to '{}' ({total} total)", config.knowledge_base.collection);
    println!("   Index: {}", config.knowledge_base_path().display());
    Ok(())
}

/// Returns the number of chunks added.
pub async fn ingest(
    path: &Path,
    chunk_size: usize,
    chunk_overlap: usize,
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
) -> anyhow::Result<usize> {
    let documents =
        load_path(path).with_context(|| format!("Failed to load {}", path.display()))?;
    if documents.is_empty() {
        println!("   No documents found.");
        return Ok(0);
    }

    let mut embedded: Vec<Document> = Vec::new();
    for doc in &documents {
        let chunks = split_text(doc, chunk_size, chunk_overlap).context("Failed to split text")?;
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = embedder
            .embed_batch(&texts)
            .await
            .with_context(|| format!("Failed to embed {}", doc.source().unwrap_or("?")))?;
        embedded.extend(
            chunks
                .into_iter()
                .zip(vectors)
                .map(|(chunk, vector)| chunk.with_embedding(vector)),
        );
    }
    info!(documents = documents.len(), chunks = embedded.len(), "Documents embedded");

    index.add(embedded).await.context("Failed to add chunks to index")
}
