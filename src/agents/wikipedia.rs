//! Wikipedia agent: opensearch for matching articles, then the plain-text
//! intro extract of each.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::agents::{http_client, FetchError, RealtimeAgent};
use crate::models::{Channel, SourceRecord};

const WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/w/api.php";

pub struct WikipediaAgent {
    client: Client,
    base_url: String,
    max_results: usize,
}

/// Titles and URLs from an opensearch reply: `[query, [titles], [descriptions], [urls]]`
fn parse_opensearch(data: &Value) -> Vec<(String, String)> {
    let strings = |idx: usize| -> Vec<String> {
        data.get(idx)
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default()
    };

    strings(1).into_iter().zip(strings(3)).collect()
}

/// Extract of the first page in a `prop=extracts` reply
fn parse_extract(data: &Value) -> Option<String> {
    data.get("query")?
        .get("pages")?
        .as_object()?
        .values()
        .next()?
        .get("extract")?
        .as_str()
        .map(String::from)
}

impl WikipediaAgent {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            base_url: WIKIPEDIA_API_URL.to_string(),
            max_results: 3,
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    async fn get_json(&self, params: &[(&str, &str)]) -> Result<Value, FetchError> {
        let response = self.client.get(&self.base_url).query(params).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        Ok(response.json().await?)
    }

    async fn page_extract(&self, title: &str) -> Result<Option<String>, FetchError> {
        let data = self
            .get_json(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "true"),
                ("explaintext", "true"),
                ("titles", title),
                ("format", "json"),
            ])
            .await?;
        Ok(parse_extract(&data))
    }
}

#[async_trait]
impl RealtimeAgent for WikipediaAgent {
    fn name(&self) -> &str {
        "wikipedia"
    }

    async fn try_fetch(&self, topic: &str) -> Result<Vec<SourceRecord>, FetchError> {
        info!(topic = %topic, "Searching Wikipedia");

        let limit = self.max_results.to_string();
        let data = self
            .get_json(&[
                ("action", "opensearch"),
                ("search", topic),
                ("limit", limit.as_str()),
                ("format", "json"),
            ])
            .await?;

        if !data.is_array() {
            return Err(FetchError::Parse("opensearch reply is not an array".to_string()));
        }

        let mut results = Vec::new();
        for (title, url) in parse_opensearch(&data) {
            // A failed page lookup only loses that page
            let content = match self.page_extract(&title).await {
                Ok(Some(extract)) if !extract.trim().is_empty() => extract,
                Ok(_) => continue,
                Err(e) => {
                    warn!(title = %title, error = %e, "Failed to fetch Wikipedia page");
                    continue;
                }
            };

            results.push(
                SourceRecord::new(title, content)
                    .with_url(url)
                    .with_date(Utc::now().to_rfc3339())
                    .with_source_name("Wikipedia")
                    .with_channel(Channel::Realtime),
            );
        }

        debug!(count = results.len(), "Fetched Wikipedia articles");
        Ok(results)
    }
}
