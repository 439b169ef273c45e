//! SerpAPI Client
//!
//! Alternative web search backend using SerpAPI for:
//! - Google Light: Quick general web search (primary for research topics)
//! - Google Scholar: Academic papers appended when enabled
//!
//! SerpAPI does not return relevance scores, so the raw score of each record
//! is derived from its rank within the engine's result list.

use async_trait::async_trait;
use serde_json::Value;
use serpapi_search_rust::serp_api_search::SerpApiSearch;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::models::{Channel, SourceRecord};
use crate::search::{domain_of, SearchError, WebSearch};

/// SerpAPI client for web and scholarly search
pub struct SerpApiClient {
    api_key: String,
    scholar_enabled: bool,
    max_results: usize,
}

impl SerpApiClient {
    /// Create a new SerpAPI client
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            scholar_enabled: true,
            max_results: 10,
        }
    }

    /// Configure client from config
    pub fn from_config(config: &crate::config::SearchConfig) -> Option<Self> {
        if config.serpapi_key.is_empty() {
            return None;
        }

        Some(Self {
            api_key: config.serpapi_key.clone(),
            scholar_enabled: config.scholar_enabled,
            max_results: config.max_results,
        })
    }

    /// Enable/disable Google Scholar
    pub fn with_scholar(mut self, enabled: bool) -> Self {
        self.scholar_enabled = enabled;
        self
    }

    async fn run_engine(&self, engine: &str, query: &str, max_results: usize) -> Result<Value, SearchError> {
        let mut params = HashMap::<String, String>::new();
        params.insert("engine".to_string(), engine.to_string());
        params.insert("q".to_string(), query.to_string());
        params.insert("hl".to_string(), "en".to_string());
        params.insert("num".to_string(), max_results.to_string());
        if engine == "google_light" {
            params.insert("gl".to_string(), "us".to_string());
        }

        let search = SerpApiSearch::google(params, self.api_key.clone());
        let results = search
            .json()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        debug!(engine = %engine, "Raw SerpAPI response received");
        Ok(results)
    }

    /// Search Google Light for quick web results
    pub async fn search_light(&self, query: &str, max_results: usize) -> Result<Vec<SourceRecord>, SearchError> {
        info!(query = %query, "Searching Google Light via SerpAPI");
        let raw = self.run_engine("google_light", query, max_results).await?;
        let results = parse_light_results(&raw, max_results)?;
        info!(count = results.len(), "Google Light search completed");
        Ok(results)
    }

    /// Search Google Scholar for academic papers
    pub async fn search_scholar(&self, query: &str, max_results: usize) -> Result<Vec<SourceRecord>, SearchError> {
        info!(query = %query, "Searching Google Scholar via SerpAPI");
        let raw = self.run_engine("google_scholar", query, max_results).await?;
        let results = parse_scholar_results(&raw, max_results)?;
        info!(count = results.len(), "Google Scholar search completed");
        Ok(results)
    }
}

#[async_trait]
impl WebSearch for SerpApiClient {
    fn name(&self) -> &str {
        "serpapi"
    }

    fn max_results(&self) -> usize {
        self.max_results
    }

    /// Light results first, then Scholar results when enabled.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceRecord>, SearchError> {
        let light = self.search_light(query, max_results).await;

        let scholar = if self.scholar_enabled {
            match self.search_scholar(query, max_results).await {
                Ok(results) => results,
                Err(e) => {
                    warn!(error = %e, "Scholar search failed");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        match light {
            Ok(mut results) => {
                results.extend(scholar);
                Ok(results)
            }
            Err(e) if scholar.is_empty() => Err(e),
            Err(e) => {
                warn!(error = %e, "Light search failed, using Scholar results only");
                Ok(scholar)
            }
        }
    }
}

/// Rank-derived raw score: the top result gets 1.0, the last approaches 0.5.
fn rank_score(rank: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.5;
    }
    1.0 - 0.5 * (rank as f64 / total as f64)
}

fn organic_results(raw: &Value) -> Result<&Vec<Value>, SearchError> {
    let organic = raw.get("organic_results").ok_or(SearchError::NoResults)?;
    let array = organic
        .as_array()
        .ok_or_else(|| SearchError::ParseError("Expected array of results".to_string()))?;
    if array.is_empty() {
        return Err(SearchError::NoResults);
    }
    Ok(array)
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str())
}

pub(crate) fn parse_light_results(raw: &Value, max_results: usize) -> Result<Vec<SourceRecord>, SearchError> {
    let array = organic_results(raw)?;
    let total = array.len().min(max_results);

    Ok(array
        .iter()
        .take(max_results)
        .enumerate()
        .map(|(rank, result)| {
            let link = str_field(result, "link").unwrap_or("").to_string();
            let source = str_field(result, "source")
                .map(String::from)
                .or_else(|| domain_of(&link))
                .unwrap_or_default();

            SourceRecord::new(
                str_field(result, "title").unwrap_or("Untitled"),
                str_field(result, "snippet").unwrap_or(""),
            )
            .with_url(link)
            .with_source_name(source)
            .with_date(str_field(result, "date").unwrap_or(""))
            .with_score(rank_score(rank, total))
            .with_channel(Channel::WebSearch)
        })
        .collect())
}

pub(crate) fn parse_scholar_results(raw: &Value, max_results: usize) -> Result<Vec<SourceRecord>, SearchError> {
    let array = organic_results(raw)?;
    let total = array.len().min(max_results);

    Ok(array
        .iter()
        .take(max_results)
        .enumerate()
        .map(|(rank, result)| {
            // Publication summary is usually "Authors - Venue, Year - host"
            let summary = result
                .get("publication_info")
                .and_then(|p| p.get("summary"))
                .and_then(|v| v.as_str())
                .unwrap_or("");
            let mut parts = summary.split(" - ");
            let authors: Vec<String> = parts
                .next()
                .unwrap_or("")
                .split(',')
                .map(|a| a.trim().trim_end_matches('…').trim().to_string())
                .filter(|a| !a.is_empty())
                .collect();
            let venue = parts.next().map(|v| v.trim().to_string()).unwrap_or_default();

            let year = summary
                .split(|c: char| !c.is_ascii_digit())
                .find(|part| part.len() == 4)
                .and_then(|y| y.parse::<i32>().ok())
                .filter(|&y| (1900..=2100).contains(&y));

            SourceRecord::new(
                str_field(result, "title").unwrap_or("Untitled"),
                str_field(result, "snippet").unwrap_or(""),
            )
            .with_url(str_field(result, "link").unwrap_or(""))
            .with_source_name(venue)
            .with_authors(authors)
            .with_date(year.map(|y| format!("{}-01-01", y)).unwrap_or_default())
            .with_score(rank_score(rank, total))
            .with_channel(Channel::WebSearch)
        })
        .collect())
}
