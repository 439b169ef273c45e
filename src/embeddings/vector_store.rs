// Vector store contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::AppResult;

/// Flat metadata attached to each stored document
pub type Metadata = Map<String, Value>;

/// A document (or chunk) ready to be embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// One nearest-neighbour hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnippet {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    /// Smaller is closer
    pub distance: f64,
}

impl ContextSnippet {
    pub fn title(&self) -> &str {
        self.metadata.get("title").and_then(|v| v.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_documents: usize,
    pub collection_name: String,
    pub embedding_model: String,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Upsert documents by id; returns how many were written.
    async fn add(&self, documents: Vec<Document>) -> AppResult<usize>;

    /// Up to `k` documents closest to `query`. With a filter, only documents
    /// whose metadata contains every filter key with an equal value qualify.
    async fn search(&self, query: &str, k: usize, filter: Option<&Metadata>) -> AppResult<Vec<ContextSnippet>>;

    async fn stats(&self) -> AppResult<StoreStats>;

    async fn clear(&self) -> AppResult<()>;

    /// Remove documents added more than `days` days ago; returns the count removed.
    async fn delete_older_than(&self, days: i64) -> AppResult<usize>;
}
