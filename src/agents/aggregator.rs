//! Fan-out over the registered real-time agents.

use std::time::Duration;

use futures::future::join_all;
use tracing::{info, warn};

use crate::agents::{ArxivAgent, NewsAgent, RealtimeAgent, WikipediaAgent};
use crate::config::RealtimeConfig;
use crate::models::SourceRecord;
use crate::search::{self, SourceBatches};

/// Real-time agents in registration order
#[derive(Default)]
pub struct SourceAggregator {
    agents: Vec<Box<dyn RealtimeAgent>>,
}

impl SourceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// arXiv and Wikipedia always; news only when a key is configured.
    pub fn from_config(config: &RealtimeConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        let mut aggregator = Self::new()
            .with_agent(ArxivAgent::new(timeout))
            .with_agent(WikipediaAgent::new(timeout));

        if config.news_api_key.is_some() {
            aggregator = aggregator.with_agent(NewsAgent::new(config.news_api_key.clone(), timeout));
        }
        aggregator
    }

    pub fn with_agent(mut self, agent: impl RealtimeAgent + 'static) -> Self {
        self.agents.push(Box::new(agent));
        self
    }

    pub fn agent_names(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.name()).collect()
    }

    /// Query every agent (or only the named ones) concurrently.
    ///
    /// Every selected agent gets an entry, empty when it failed.
    pub async fn fetch_all(&self, topic: &str, only: Option<&[&str]>) -> SourceBatches {
        if let Some(names) = only {
            for name in names {
                if !self.agents.iter().any(|a| a.name() == *name) {
                    warn!(source = %name, "Unknown real-time source");
                }
            }
        }

        let selected: Vec<&dyn RealtimeAgent> = self
            .agents
            .iter()
            .map(|a| a.as_ref())
            .filter(|a| only.map_or(true, |names| names.iter().any(|n| *n == a.name())))
            .collect();

        let fetches = selected.iter().map(|agent| async move {
            let records = agent.fetch(topic).await;
            info!(source = agent.name(), count = records.len(), "Real-time source fetched");
            (agent.name().to_string(), records)
        });

        join_all(fetches).await
    }

    /// Same rules as web search aggregation: dedupe by URL, drop summaries,
    /// order by raw score.
    pub fn aggregate_results(&self, batches: SourceBatches) -> Vec<SourceRecord> {
        search::aggregate_results(batches)
    }

    pub async fn get_academic_sources(&self, topic: &str) -> SourceBatches {
        self.fetch_all(topic, Some(&["arxiv"][..])).await
    }

    pub async fn get_current_events(&self, topic: &str) -> SourceBatches {
        self.fetch_all(topic, Some(&["news"][..])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::FetchError;
    use async_trait::async_trait;

    struct Fixed {
        name: &'static str,
        records: Vec<SourceRecord>,
    }

    #[async_trait]
    impl RealtimeAgent for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn try_fetch(&self, _topic: &str) -> Result<Vec<SourceRecord>, FetchError> {
            Ok(self.records.clone())
        }
    }

    struct Timeout(&'static str);

    #[async_trait]
    impl RealtimeAgent for Timeout {
        fn name(&self) -> &str {
            self.0
        }

        async fn try_fetch(&self, _topic: &str) -> Result<Vec<SourceRecord>, FetchError> {
            Err(FetchError::Status(504))
        }
    }

    #[tokio::test]
    async fn test_all_failures_give_empty_lists() {
        let aggregator = SourceAggregator::new()
            .with_agent(Timeout("arxiv"))
            .with_agent(Timeout("wikipedia"))
            .with_agent(Timeout("news"));

        let batches = aggregator.fetch_all("graphene batteries", None).await;
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|(_, records)| records.is_empty()));
        assert!(aggregator.aggregate_results(batches).is_empty());
    }

    #[tokio::test]
    async fn test_failure_does_not_affect_siblings() {
        let aggregator = SourceAggregator::new()
            .with_agent(Timeout("arxiv"))
            .with_agent(Fixed {
                name: "wikipedia",
                records: vec![SourceRecord::new("Graphene", "text").with_url("https://w/Graphene")],
            });

        let batches = aggregator.fetch_all("graphene", None).await;
        assert_eq!(batches[0].0, "arxiv");
        assert!(batches[0].1.is_empty());
        assert_eq!(batches[1].1.len(), 1);

        let results = aggregator.aggregate_results(batches);
        assert_eq!(results[0].source_query.as_deref(), Some("wikipedia"));
    }

    #[tokio::test]
    async fn test_subset_selection() {
        let aggregator = SourceAggregator::new()
            .with_agent(Fixed { name: "arxiv", records: vec![] })
            .with_agent(Fixed { name: "wikipedia", records: vec![] });

        let batches = aggregator.fetch_all("t", Some(&["wikipedia", "missing"][..])).await;
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].0, "wikipedia");
        assert!(aggregator.get_current_events("t").await.is_empty());
    }

    #[test]
    fn test_news_registered_only_with_key() {
        let config = RealtimeConfig { news_api_key: None, timeout_secs: 10 };
        assert_eq!(SourceAggregator::from_config(&config).agent_names(), vec!["arxiv", "wikipedia"]);

        let config = RealtimeConfig { news_api_key: Some("k".into()), timeout_secs: 10 };
        assert_eq!(SourceAggregator::from_config(&config).agent_names(), vec!["arxiv", "wikipedia", "news"]);
    }
}
