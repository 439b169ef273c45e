//! arXiv agent: newest submissions matching a topic, parsed from the Atom feed.

use std::time::Duration;

use async_trait::async_trait;
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::agents::{http_client, FetchError, RealtimeAgent};
use crate::models::{Channel, SourceRecord};

const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: Option<String>,
}

/// Collapse the line breaks and indentation arXiv puts inside titles.
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn parse_feed(xml: &str) -> Result<Vec<SourceRecord>, FetchError> {
    let feed: Feed = from_str(xml).map_err(|e| FetchError::Parse(e.to_string()))?;

    Ok(feed
        .entries
        .into_iter()
        .map(|entry| {
            let title = entry
                .title
                .as_deref()
                .map(normalize_whitespace)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".to_string());
            let authors = entry
                .authors
                .into_iter()
                .filter_map(|a| a.name)
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect();

            SourceRecord::new(title, entry.summary.as_deref().map(str::trim).unwrap_or(""))
                .with_url(entry.id.unwrap_or_default().trim())
                .with_date(entry.published.unwrap_or_default().trim())
                .with_authors(authors)
                .with_source_name("arXiv")
                .with_channel(Channel::Realtime)
        })
        .collect())
}

pub struct ArxivAgent {
    client: Client,
    base_url: String,
    max_results: usize,
}

impl ArxivAgent {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            base_url: ARXIV_API_URL.to_string(),
            max_results: 5,
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }
}

#[async_trait]
impl RealtimeAgent for ArxivAgent {
    fn name(&self) -> &str {
        "arxiv"
    }

    async fn try_fetch(&self, topic: &str) -> Result<Vec<SourceRecord>, FetchError> {
        info!(topic = %topic, "Fetching recent arXiv papers");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", format!("all:{}", topic)),
                ("start", "0".to_string()),
                ("max_results", self.max_results.to_string()),
                ("sortBy", "submittedDate".to_string()),
                ("sortOrder", "descending".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let papers = parse_feed(&body)?;
        debug!(count = papers.len(), "Parsed arXiv feed");
        Ok(papers)
    }
}
