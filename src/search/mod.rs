//! Search Module
//!
//! Web search backends plus the ranking logic shared by the research pipeline:
//! - Tavily (primary) - Relevance-scored web results with an optional answer summary
//! - SerpAPI (alternative) - Google Light with Google Scholar supplements
//! - Aggregation - flattening and URL deduplication of per-query results
//! - Scoring - composite relevance/credibility/recency ranking

pub mod aggregate;
pub mod scoring;
pub mod serpapi;
pub mod tavily;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::SearchConfig;
use crate::models::SourceRecord;
use crate::types::{AppError, AppResult};

pub use aggregate::{aggregate_results, combine_sources, SourceBatches};
pub use scoring::{CredibilityTables, Scorer};
pub use serpapi::SerpApiClient;
pub use tavily::TavilyClient;

/// Errors that can occur during search operations
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search API key not configured")]
    NoApiKey,

    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse search results: {0}")]
    ParseError(String),

    #[error("No results found for query")]
    NoResults,
}

/// A web search backend
#[async_trait]
pub trait WebSearch: Send + Sync {
    fn name(&self) -> &str;

    /// Default number of results per query
    fn max_results(&self) -> usize;

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceRecord>, SearchError>;
}

/// Run each query in turn, waiting `delay` between successive calls.
///
/// A failing query contributes an empty result list.
pub async fn multi_search(searcher: &dyn WebSearch, queries: &[String], delay: Duration) -> SourceBatches {
    let mut all_results = Vec::with_capacity(queries.len());

    for (i, query) in queries.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let results = match searcher.search(query, searcher.max_results()).await {
            Ok(results) => results,
            Err(SearchError::NoResults) => Vec::new(),
            Err(e) => {
                warn!(backend = searcher.name(), query = %query, error = %e, "Search failed");
                Vec::new()
            }
        };
        info!(backend = searcher.name(), query = %query, count = results.len(), "Search completed");
        all_results.push((query.clone(), results));
    }

    all_results
}

/// Build the configured web search backend; refuses to start without an API key.
pub fn build_web_searcher(config: &SearchConfig) -> AppResult<Box<dyn WebSearch>> {
    match config.provider.as_str() {
        "tavily" => TavilyClient::from_config(config)
            .map(|c| Box::new(c) as Box<dyn WebSearch>)
            .ok_or_else(|| AppError::Configuration("TAVILY_API_KEY not provided".to_string())),
        "serpapi" => SerpApiClient::from_config(config)
            .map(|c| Box::new(c) as Box<dyn WebSearch>)
            .ok_or_else(|| AppError::Configuration("SERPAPI_API_KEY not provided".to_string())),
        other => Err(AppError::Configuration(format!("Unknown search provider: {}", other))),
    }
}

/// Host part of a URL without a leading `www.`
pub(crate) fn domain_of(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
}
