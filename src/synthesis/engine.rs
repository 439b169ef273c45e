//! Research Engine
//!
//! Drives one research run through its fixed stages:
//!
//! ```text
//! START → QUERIES → SEARCH → REALTIME → SCORE → INDEX → ANALYZE
//!       → RETRIEVE → SYNTHESIZE → CITE → BIBLIOGRAPHY → DONE
//! ```
//!
//! Each stage reports progress before doing its work. Source fetching and
//! indexing degrade to empty results on failure; an LLM failure in query
//! generation, analysis or synthesis aborts the run with `AppError::Stage`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{error, info};

use crate::agents::SourceAggregator;
use crate::config::Config;
use crate::embeddings::ContextIndexer;
use crate::llm::{ResearchLlm, SynthesisItem};
use crate::models::{ResearchDepth, ResearchMetadata, ResearchResult, SourceRecord, Stage};
use crate::search::{aggregate_results, combine_sources, multi_search, Scorer, WebSearch};
use crate::synthesis::{CitationManager, ProgressSink};
use crate::types::{AppError, AppResult};

/// Content shorter than this is not sent for LLM analysis
const MIN_ANALYSIS_CHARS: usize = 100;

/// Per-engine limits; depth adjusts the query count per run, never these.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub max_queries: usize,
    pub analyze_limit: usize,
    pub context_results: usize,
    pub search_delay: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_queries: config.research.max_queries,
            analyze_limit: config.research.analyze_limit,
            context_results: config.research.context_results,
            search_delay: Duration::from_millis(config.search.delay_ms),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_queries: 5,
            analyze_limit: 20,
            context_results: 15,
            search_delay: Duration::from_millis(500),
        }
    }
}

fn stage_error(stage: Stage) -> impl FnOnce(AppError) -> AppError {
    move |e| AppError::Stage {
        stage: stage.name().to_string(),
        message: e.to_string(),
    }
}

pub struct ResearchEngine {
    llm: ResearchLlm,
    searcher: Arc<dyn WebSearch>,
    aggregator: SourceAggregator,
    indexer: ContextIndexer,
    scorer: Scorer,
    settings: EngineSettings,
}

impl ResearchEngine {
    pub fn new(
        llm: ResearchLlm,
        searcher: Arc<dyn WebSearch>,
        aggregator: SourceAggregator,
        indexer: ContextIndexer,
        settings: EngineSettings,
    ) -> Self {
        Self {
            llm,
            searcher,
            aggregator,
            indexer,
            scorer: Scorer::default(),
            settings,
        }
    }

    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn llm(&self) -> &ResearchLlm {
        &self.llm
    }

    pub fn indexer(&self) -> &ContextIndexer {
        &self.indexer
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Run the whole pipeline for `topic`, reporting progress through `sink`.
    ///
    /// Citations are numbered by a manager private to this call.
    pub async fn conduct_research(
        &self,
        topic: &str,
        depth: ResearchDepth,
        sink: &ProgressSink,
    ) -> AppResult<ResearchResult> {
        let started = Instant::now();
        info!(topic = %topic, depth = %depth, "Starting research");
        sink.emit(Stage::Start);

        sink.emit(Stage::Queries);
        let num_queries = depth.query_count(self.settings.max_queries);
        let queries = self
            .llm
            .generate_queries(topic, num_queries)
            .await
            .map_err(stage_error(Stage::Queries))?;

        sink.emit(Stage::Search);
        let search_results = multi_search(self.searcher.as_ref(), &queries, self.settings.search_delay).await;
        let web_sources = aggregate_results(search_results);

        sink.emit(Stage::Realtime);
        let realtime_data = self.aggregator.fetch_all(topic, None).await;
        let realtime_sources = self.aggregator.aggregate_results(realtime_data);

        sink.emit(Stage::Score);
        let all_sources = combine_sources(web_sources, realtime_sources);
        let total_sources = all_sources.len();
        let scored = self.scorer.score_and_rank(all_sources, topic, Utc::now());

        sink.emit(Stage::Index);
        self.indexer.index(&scored).await;

        sink.emit(Stage::Analyze);
        let analyzed = self
            .analyze_sources(topic, scored.into_iter().take(self.settings.analyze_limit))
            .await
            .map_err(stage_error(Stage::Analyze))?;

        sink.emit(Stage::Retrieve);
        let context = self.indexer.retrieve(topic, self.settings.context_results).await;

        sink.emit(Stage::Synthesize);
        let items: Vec<SynthesisItem> = analyzed
            .iter()
            .map(|s| SynthesisItem {
                title: s.title.clone(),
                text: s.analysis_summary.clone().unwrap_or_else(|| s.content.clone()),
            })
            .chain(context.into_iter().map(|c| SynthesisItem {
                title: "Context".to_string(),
                text: c.content,
            }))
            .collect();
        let synthesis = self
            .llm
            .synthesize_research(topic, &items)
            .await
            .map_err(stage_error(Stage::Synthesize))?;

        sink.emit(Stage::Cite);
        let mut citations = CitationManager::new();
        let cited_synthesis = citations.insert_citations(&synthesis, &analyzed);

        sink.emit(Stage::Bibliography);
        let bibliography = citations.generate_bibliography();

        sink.emit(Stage::Done);
        info!(
            topic = %topic,
            total_sources,
            analyzed = analyzed.len(),
            citations = citations.citation_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Research complete"
        );

        Ok(ResearchResult {
            topic: topic.to_string(),
            queries,
            metadata: ResearchMetadata {
                total_sources,
                analyzed_sources: analyzed.len(),
                timestamp: Utc::now().to_rfc3339(),
                depth,
            },
            sources: analyzed,
            synthesis: cited_synthesis,
            bibliography,
            citations: citations.export_citations(),
        })
    }

    async fn analyze_sources(
        &self,
        topic: &str,
        sources: impl Iterator<Item = SourceRecord>,
    ) -> AppResult<Vec<SourceRecord>> {
        let mut analyzed = Vec::new();

        for mut source in sources {
            if source.content.chars().count() < MIN_ANALYSIS_CHARS {
                continue;
            }

            let analysis = self.llm.analyze_content(topic, &source.content).await.map_err(|e| {
                error!(title = %source.title, error = %e, "Content analysis failed");
                e
            })?;
            source.analysis_summary = Some(analysis.summary);
            source.relevance = Some(analysis.relevance_score);
            analyzed.push(source);
        }

        Ok(analyzed)
    }
}
