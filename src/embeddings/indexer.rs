// Indexing of ranked sources for later semantic retrieval

use std::sync::Arc;

use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::RagConfig;
use crate::embeddings::{ContextSnippet, Document, Metadata, TextChunker, VectorStore};
use crate::models::SourceRecord;

/// Sources with less content than this are not worth embedding
const MIN_CONTENT_CHARS: usize = 50;

/// Stable id for a source: hash of its URL, or of the whole content when it has none.
pub fn document_id(source: &SourceRecord) -> String {
    let key = source.url_key().unwrap_or(&source.content);
    hex::encode(Sha256::digest(key.as_bytes()))
}

#[derive(Clone)]
pub struct ContextIndexer {
    store: Arc<dyn VectorStore>,
    chunker: TextChunker,
}

impl ContextIndexer {
    pub fn new(store: Arc<dyn VectorStore>, chunker: TextChunker) -> Self {
        Self { store, chunker }
    }

    pub fn from_config(store: Arc<dyn VectorStore>, config: &RagConfig) -> Self {
        Self::new(store, TextChunker::new(config.chunk_size, config.chunk_overlap))
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    fn documents_for(&self, source: &SourceRecord) -> Vec<Document> {
        let id = document_id(source);
        let mut metadata = Metadata::new();
        metadata.insert("title".into(), json!(source.title));
        metadata.insert("url".into(), json!(source.url_key().unwrap_or("")));
        metadata.insert("source".into(), json!(source.source_name));
        metadata.insert("date".into(), json!(source.published_date));
        metadata.insert("score".into(), json!(source.final_score));

        if source.content.chars().count() <= self.chunker.chunk_size() {
            return vec![Document { id, content: source.content.clone(), metadata }];
        }

        let chunks = self.chunker.split(&source.content);
        let total = chunks.len();
        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let mut chunk_metadata = metadata.clone();
                chunk_metadata.insert("chunk_index".into(), Value::from(i));
                chunk_metadata.insert("total_chunks".into(), Value::from(total));
                Document {
                    id: format!("{}_chunk_{}", id, i),
                    content: chunk,
                    metadata: chunk_metadata,
                }
            })
            .collect()
    }

    /// Push sources into the store. Store failures are logged and count as 0.
    pub async fn index(&self, sources: &[SourceRecord]) -> usize {
        let documents: Vec<Document> = sources
            .iter()
            .filter(|s| s.content.trim().chars().count() >= MIN_CONTENT_CHARS)
            .flat_map(|s| self.documents_for(s))
            .collect();

        if documents.is_empty() {
            return 0;
        }

        match self.store.add(documents).await {
            Ok(added) => {
                info!(added, sources = sources.len(), "Indexed sources");
                added
            }
            Err(e) => {
                warn!(error = %e, "Indexing failed, continuing without RAG context");
                0
            }
        }
    }

    /// Nearest snippets for a topic; empty when the store is unavailable.
    pub async fn retrieve(&self, topic: &str, k: usize) -> Vec<ContextSnippet> {
        match self.store.search(topic, k, None).await {
            Ok(snippets) => snippets,
            Err(e) => {
                warn!(error = %e, "Context retrieval failed");
                Vec::new()
            }
        }
    }
}
