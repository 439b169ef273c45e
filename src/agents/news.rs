//! NewsAPI agent: English articles about the topic from the last week.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::agents::{http_client, FetchError, RealtimeAgent};
use crate::models::{Channel, SourceRecord};

const NEWS_API_URL: &str = "https://newsapi.org/v2/everything";
const LOOKBACK_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
    author: Option<String>,
    source: Option<ArticleSource>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

impl From<Article> for SourceRecord {
    fn from(article: Article) -> Self {
        let content = format!(
            "{}\n\n{}",
            article.description.unwrap_or_default(),
            article.content.unwrap_or_default()
        );
        let authors = article
            .author
            .filter(|a| !a.trim().is_empty())
            .map(|a| vec![a])
            .unwrap_or_default();

        SourceRecord::new(article.title.unwrap_or_else(|| "Untitled".to_string()), content)
            .with_url(article.url.unwrap_or_default())
            .with_date(article.published_at.unwrap_or_default())
            .with_source_name(
                article
                    .source
                    .and_then(|s| s.name)
                    .unwrap_or_else(|| "Unknown".to_string()),
            )
            .with_authors(authors)
            .with_channel(Channel::Realtime)
    }
}

pub struct NewsAgent {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    max_results: usize,
}

impl NewsAgent {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: NEWS_API_URL.to_string(),
            max_results: 5,
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }
}

#[async_trait]
impl RealtimeAgent for NewsAgent {
    fn name(&self) -> &str {
        "news"
    }

    async fn try_fetch(&self, topic: &str) -> Result<Vec<SourceRecord>, FetchError> {
        let api_key = self.api_key.as_deref().ok_or(FetchError::NotConfigured("NewsAPI key"))?;

        info!(topic = %topic, "Fetching recent news");

        let from_date = (Utc::now() - chrono::Duration::days(LOOKBACK_DAYS))
            .format("%Y-%m-%d")
            .to_string();
        let page_size = self.max_results.to_string();

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", topic),
                ("from", from_date.as_str()),
                ("sortBy", "publishedAt"),
                ("language", "en"),
                ("pageSize", page_size.as_str()),
                ("apiKey", api_key),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let data: NewsResponse = response.json().await?;
        Ok(data.articles.into_iter().map(SourceRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_key_fails_closed() {
        let agent = NewsAgent::new(None, Duration::from_secs(5));
        assert!(matches!(agent.try_fetch("graphene").await, Err(FetchError::NotConfigured(_))));
        assert!(agent.fetch("graphene").await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_parses_articles() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(mockito::Matcher::UrlEncoded("apiKey".into(), "news-key".into()))
            .with_status(200)
            .with_body(
                json!({"status": "ok", "articles": [{
                    "title": "Graphene battery startup raises funds",
                    "description": "A startup...",
                    "content": "Full text",
                    "url": "https://www.reuters.com/x",
                    "publishedAt": "2024-05-30T08:00:00Z",
                    "author": "Jane Doe",
                    "source": {"id": null, "name": "Reuters"}
                }]})
                .to_string(),
            )
            .create_async()
            .await;

        let agent = NewsAgent::new(Some("news-key".into()), Duration::from_secs(5)).with_base_url(&server.url());
        let articles = agent.try_fetch("graphene").await.unwrap();
        mock.assert_async().await;

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].content, "A startup...\n\nFull text");
        assert_eq!(articles[0].source_name, "Reuters");
        assert_eq!(articles[0].authors, vec!["Jane Doe".to_string()]);
        assert_eq!(articles[0].channel, Channel::Realtime);
    }
}
