//! Tavily Client
//!
//! Web search through the Tavily search API. Each result carries a relevance
//! score in [0,1]; when Tavily also returns a generated answer it is surfaced
//! as a leading record flagged `is_summary`, which aggregation drops.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::models::{Channel, SourceRecord};
use crate::search::{domain_of, SearchError, WebSearch};

const TAVILY_API_BASE: &str = "https://api.tavily.com";

/// Fields probed, in order, for a publication date
const DATE_FIELDS: [&str; 4] = ["published_date", "date", "published", "timestamp"];

#[derive(Serialize)]
struct TavilySearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
    include_answer: bool,
    include_raw_content: bool,
}

#[derive(Deserialize)]
struct TavilySearchResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<Value>,
}

pub struct TavilyClient {
    client: Client,
    api_key: String,
    api_base: String,
    max_results: usize,
}

impl TavilyClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_base: TAVILY_API_BASE.to_string(),
            max_results: 10,
        }
    }

    /// Configure client from config
    pub fn from_config(config: &crate::config::SearchConfig) -> Option<Self> {
        if config.tavily_api_key.is_empty() {
            return None;
        }
        Some(Self::new(config.tavily_api_key.clone()).with_max_results(config.max_results))
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    fn parse_result(item: &Value) -> SourceRecord {
        let str_field = |key: &str| item.get(key).and_then(|v| v.as_str()).unwrap_or("").to_string();

        let url = str_field("url");
        let title = item
            .get("title")
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled");

        SourceRecord::new(title, str_field("content"))
            .with_source_name(domain_of(&url).unwrap_or_default())
            .with_url(url)
            .with_score(item.get("score").and_then(|v| v.as_f64()).unwrap_or(0.5))
            .with_date(extract_date(item))
            .with_channel(Channel::WebSearch)
    }
}

/// First non-empty date field of a raw result, else the current time.
fn extract_date(item: &Value) -> String {
    DATE_FIELDS
        .iter()
        .filter_map(|field| item.get(*field))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| Utc::now().to_rfc3339())
}

#[async_trait]
impl WebSearch for TavilyClient {
    fn name(&self) -> &str {
        "tavily"
    }

    fn max_results(&self) -> usize {
        self.max_results
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceRecord>, SearchError> {
        if self.api_key.is_empty() {
            return Err(SearchError::NoApiKey);
        }

        info!(query = %query, "Searching Tavily");

        let body = TavilySearchRequest {
            api_key: &self.api_key,
            query,
            search_depth: "advanced",
            max_results,
            include_answer: true,
            include_raw_content: false,
        };

        let response = self
            .client
            .post(format!("{}/search", self.api_base))
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SearchError::RequestFailed(format!("HTTP {}: {}", status, text)));
        }

        let parsed: TavilySearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::ParseError(e.to_string()))?;

        debug!(count = parsed.results.len(), "Raw Tavily response received");

        let mut results: Vec<SourceRecord> = parsed.results.iter().map(Self::parse_result).collect();

        if let Some(answer) = parsed.answer.filter(|a| !a.trim().is_empty()) {
            let mut summary = SourceRecord::new("AI Summary", answer)
                .with_score(1.0)
                .with_date(Utc::now().to_rfc3339())
                .with_source_name("Tavily");
            summary.is_summary = true;
            results.insert(0, summary);
        }

        Ok(results)
    }
}
