//! In-process vector store.
//!
//! Documents are embedded with a hashed bag-of-words model: lowercase word
//! tokens are hashed into a fixed number of buckets and the counts are
//! L2-normalised, so cosine similarity is a dot product. Distance is
//! `1 - cosine`. When a persist directory is given the collection is kept as a
//! JSON snapshot (`<dir>/<collection>.json`) and reloaded on open.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::embeddings::{ContextSnippet, Document, Metadata, StoreStats, VectorStore};
use crate::types::{AppError, AppResult};

const EMBEDDING_DIM: usize = 512;
const EMBEDDING_MODEL: &str = "hashed-bow-512";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDocument {
    id: String,
    content: String,
    metadata: Metadata,
    added_at: DateTime<Utc>,
    #[serde(skip)]
    embedding: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    collection: String,
    documents: Vec<StoredDocument>,
}

pub fn embed(text: &str) -> Vec<f32> {
    let mut vector = vec![0f32; EMBEDDING_DIM];

    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
    {
        let mut hasher = DefaultHasher::new();
        token.to_lowercase().hash(&mut hasher);
        vector[(hasher.finish() % EMBEDDING_DIM as u64) as usize] += 1.0;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    1.0 - dot as f64
}

fn matches_filter(metadata: &Metadata, filter: Option<&Metadata>) -> bool {
    filter.map_or(true, |f| f.iter().all(|(k, v)| metadata.get(k) == Some(v)))
}

pub struct InMemoryVectorStore {
    collection: String,
    persist_path: Option<PathBuf>,
    documents: RwLock<Vec<StoredDocument>>,
}

impl InMemoryVectorStore {
    /// A store that lives only as long as the process.
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            persist_path: None,
            documents: RwLock::new(Vec::new()),
        }
    }

    /// A store backed by a JSON snapshot under `persist_dir`, loading any
    /// existing snapshot.
    pub async fn open(persist_dir: impl AsRef<Path>, collection: &str) -> AppResult<Self> {
        let path = persist_dir.as_ref().join(format!("{}.json", collection));

        let documents = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes)
                    .map_err(|e| AppError::VectorStore(format!("Corrupt snapshot {}: {}", path.display(), e)))?;
                snapshot
                    .documents
                    .into_iter()
                    .map(|mut d| {
                        d.embedding = embed(&d.content);
                        d
                    })
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(AppError::VectorStore(e.to_string())),
        };

        info!(collection = %collection, documents = documents.len(), "Opened vector store");

        Ok(Self {
            collection: collection.to_string(),
            persist_path: Some(path),
            documents: RwLock::new(documents),
        })
    }

    async fn persist(&self, documents: &[StoredDocument]) -> AppResult<()> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };

        let snapshot = Snapshot {
            collection: self.collection.clone(),
            documents: documents.to_vec(),
        };
        let bytes = serde_json::to_vec(&snapshot).map_err(|e| AppError::VectorStore(e.to_string()))?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::VectorStore(e.to_string()))?;
        }
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| AppError::VectorStore(e.to_string()))?;
        debug!(path = %path.display(), "Persisted vector store snapshot");
        Ok(())
    }

    pub(crate) async fn add_at(&self, documents: Vec<Document>, added_at: DateTime<Utc>) -> AppResult<usize> {
        let mut guard = self.documents.write().await;
        let mut written = 0;

        for doc in documents {
            let mut metadata = doc.metadata;
            metadata.insert("added_at".to_string(), Value::String(added_at.to_rfc3339()));

            let stored = StoredDocument {
                embedding: embed(&doc.content),
                id: doc.id,
                content: doc.content,
                metadata,
                added_at,
            };

            match guard.iter_mut().find(|d| d.id == stored.id) {
                Some(existing) => *existing = stored,
                None => guard.push(stored),
            }
            written += 1;
        }

        self.persist(&guard).await?;
        Ok(written)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, documents: Vec<Document>) -> AppResult<usize> {
        self.add_at(documents, Utc::now()).await
    }

    async fn search(&self, query: &str, k: usize, filter: Option<&Metadata>) -> AppResult<Vec<ContextSnippet>> {
        let query_embedding = embed(query);
        let guard = self.documents.read().await;

        let mut hits: Vec<ContextSnippet> = guard
            .iter()
            .filter(|d| matches_filter(&d.metadata, filter))
            .map(|d| ContextSnippet {
                id: d.id.clone(),
                content: d.content.clone(),
                metadata: d.metadata.clone(),
                distance: cosine_distance(&query_embedding, &d.embedding),
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    async fn stats(&self) -> AppResult<StoreStats> {
        Ok(StoreStats {
            total_documents: self.documents.read().await.len(),
            collection_name: self.collection.clone(),
            embedding_model: EMBEDDING_MODEL.to_string(),
        })
    }

    async fn clear(&self) -> AppResult<()> {
        let mut guard = self.documents.write().await;
        guard.clear();
        self.persist(&guard).await
    }

    async fn delete_older_than(&self, days: i64) -> AppResult<usize> {
        let cutoff = Utc::now() - Duration::days(days);
        let mut guard = self.documents.write().await;
        let before = guard.len();
        guard.retain(|d| d.added_at >= cutoff);
        let removed = before - guard.len();

        if removed > 0 {
            self.persist(&guard).await?;
        }
        info!(removed, days, "Deleted old documents");
        Ok(removed)
    }
}
