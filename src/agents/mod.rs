//! Real-time Agents
//!
//! Fetchers for sources that are queried by topic rather than by generated
//! search query:
//!
//! - **arXiv**: most recent papers matching the topic (Atom feed)
//! - **Wikipedia**: intro extracts of the best matching articles
//! - **News**: NewsAPI articles from the last week (only with an API key)
//!
//! ## Failure model
//!
//! ```text
//!  SourceAggregator::fetch_all(topic)
//!        │
//!        ├── arxiv.fetch ──────┐
//!        ├── wikipedia.fetch ──┼── join_all ──▶ [(name, records)]
//!        └── news.fetch ───────┘
//! ```
//!
//! Every agent fails closed: `try_fetch` reports what went wrong, the provided
//! `fetch` logs it and yields an empty list, so one broken source never takes
//! its siblings down.

pub mod aggregator;
pub mod arxiv;
pub mod news;
pub mod wikipedia;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::warn;

use crate::models::SourceRecord;

pub use aggregator::SourceAggregator;
pub use arxiv::ArxivAgent;
pub use news::NewsAgent;
pub use wikipedia::WikipediaAgent;

/// Errors a single real-time fetch can hit
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Parse(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

#[async_trait]
pub trait RealtimeAgent: Send + Sync {
    /// Registry key, e.g. `arxiv`
    fn name(&self) -> &str;

    async fn try_fetch(&self, topic: &str) -> Result<Vec<SourceRecord>, FetchError>;

    /// Like `try_fetch`, but any failure degrades to an empty list.
    async fn fetch(&self, topic: &str) -> Vec<SourceRecord> {
        match self.try_fetch(topic).await {
            Ok(records) => records,
            Err(e) => {
                warn!(agent = self.name(), error = %e, "Real-time fetch failed");
                Vec::new()
            }
        }
    }
}

/// Shared HTTP client with a per-request timeout
pub(crate) fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("deep-research/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            Client::new()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    #[async_trait]
    impl RealtimeAgent for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn try_fetch(&self, _topic: &str) -> Result<Vec<SourceRecord>, FetchError> {
            Err(FetchError::Parse("truncated body".into()))
        }
    }

    #[tokio::test]
    async fn test_fetch_fails_closed() {
        assert!(Broken.fetch("graphene").await.is_empty());
    }
}
