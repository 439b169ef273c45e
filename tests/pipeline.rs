// End-to-end runs of the research engine against stub backends.
//
// Covered:
// - progress percentages never decrease and end at 100
// - exactly one terminal event per run, and it is last
// - URL deduplication across queries and real-time sources
// - a run with nothing fetched still completes
// - an LLM failure produces a single error event and no later progress
// - a panicking stage still ends the stream with an error event
// - an unavailable vector store does not fail the run

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use deep_research::agents::{FetchError, RealtimeAgent, SourceAggregator};
use deep_research::embeddings::{
    ContextIndexer, ContextSnippet, Document, InMemoryVectorStore, Metadata, StoreStats, TextChunker, VectorStore,
};
use deep_research::export::ReportExporter;
use deep_research::llm::{LLMAdapter, ResearchLlm, LLM};
use deep_research::models::{
    Channel, ExportFormat, ResearchDepth, ResearchEvent, ResearchStore, SourceRecord, Stage,
};
use deep_research::search::{SearchError, WebSearch};
use deep_research::synthesis::{spawn_research, EngineSettings, ResearchEngine, ResearchJob};
use deep_research::types::{AppError, AppResult, LLMRequest, LLMResponse, TokenUsage};

const SYNTHESIS: &str = "## Introduction\nGraphene batteries show promise for fast charging.\n\n## Conclusion\nMore work is needed.";

/// Answers by prompt kind; optionally fails the synthesis call.
struct ScriptedLlm {
    fail_synthesis: bool,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    fn new(fail_synthesis: bool) -> Self {
        Self { fail_synthesis, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl LLMAdapter for ScriptedLlm {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = request.messages.last().map(|m| m.content.as_str()).unwrap_or("");

        let content = if prompt.contains("generate effective search queries") {
            "1. graphene anode capacity\n2. graphene battery cost\n3. graphene supercapacitor".to_string()
        } else if prompt.contains("Analyze the following content") {
            "The study reports research findings with evidence from lab data.".to_string()
        } else if self.fail_synthesis {
            return Err(AppError::LLMApi("model crashed".to_string()));
        } else {
            SYNTHESIS.to_string()
        };

        Ok(LLMResponse { content, finish_reason: "stop".into(), usage: TokenUsage::default() })
    }
}

/// Adapter with a bug: every call panics.
struct PanickingLlm;

#[async_trait]
impl LLMAdapter for PanickingLlm {
    async fn create_chat_completion(&self, _request: &LLMRequest) -> AppResult<LLMResponse> {
        panic!("adapter bug");
    }
}

/// Every query returns the same two URLs plus one unique one.
struct OverlappingSearch;

#[async_trait]
impl WebSearch for OverlappingSearch {
    fn name(&self) -> &str {
        "overlapping"
    }

    fn max_results(&self) -> usize {
        10
    }

    async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<SourceRecord>, SearchError> {
        let body = "Graphene batteries show promise for fast charging in electric vehicles. ".repeat(3);
        Ok(vec![
            SourceRecord::new("Graphene batteries show promise", body.clone())
                .with_url("https://www.nature.com/articles/graphene")
                .with_score(0.9),
            SourceRecord::new("Battery news", body.clone())
                .with_url("https://www.bbc.com/news/battery")
                .with_score(0.7),
            SourceRecord::new(format!("Result for {}", query), body)
                .with_url(format!("https://example.com/{}", query.replace(' ', "-")))
                .with_score(0.5),
        ])
    }
}

struct EmptySearch;

#[async_trait]
impl WebSearch for EmptySearch {
    fn name(&self) -> &str {
        "empty"
    }

    fn max_results(&self) -> usize {
        10
    }

    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SourceRecord>, SearchError> {
        Err(SearchError::NoResults)
    }
}

/// Returns a record already seen on the web plus one of its own.
struct EchoAgent;

#[async_trait]
impl RealtimeAgent for EchoAgent {
    fn name(&self) -> &str {
        "echo"
    }

    async fn try_fetch(&self, topic: &str) -> Result<Vec<SourceRecord>, FetchError> {
        Ok(vec![
            SourceRecord::new("Duplicate", "dup").with_url("https://www.nature.com/articles/graphene"),
            SourceRecord::new(format!("{} on arXiv", topic), "A preprint about graphene anodes. ".repeat(4))
                .with_url("https://arxiv.org/abs/2401.00001")
                .with_channel(Channel::Realtime),
        ])
    }
}

struct OfflineAgent;

#[async_trait]
impl RealtimeAgent for OfflineAgent {
    fn name(&self) -> &str {
        "offline"
    }

    async fn try_fetch(&self, _topic: &str) -> Result<Vec<SourceRecord>, FetchError> {
        Err(FetchError::Status(503))
    }
}

struct UnavailableStore;

#[async_trait]
impl VectorStore for UnavailableStore {
    async fn add(&self, _documents: Vec<Document>) -> AppResult<usize> {
        Err(AppError::VectorStore("offline".into()))
    }

    async fn search(&self, _query: &str, _k: usize, _filter: Option<&Metadata>) -> AppResult<Vec<ContextSnippet>> {
        Err(AppError::VectorStore("offline".into()))
    }

    async fn stats(&self) -> AppResult<StoreStats> {
        Err(AppError::VectorStore("offline".into()))
    }

    async fn clear(&self) -> AppResult<()> {
        Err(AppError::VectorStore("offline".into()))
    }

    async fn delete_older_than(&self, _days: i64) -> AppResult<usize> {
        Err(AppError::VectorStore("offline".into()))
    }
}

fn engine(
    llm: Arc<dyn LLMAdapter>,
    searcher: Arc<dyn WebSearch>,
    aggregator: SourceAggregator,
    store: Arc<dyn VectorStore>,
) -> Arc<ResearchEngine> {
    let settings = EngineSettings { search_delay: Duration::ZERO, ..EngineSettings::default() };
    Arc::new(ResearchEngine::new(
        ResearchLlm::new(LLM::from_adapter(llm, "scripted")),
        searcher,
        aggregator,
        ContextIndexer::new(store, TextChunker::new(200, 50)),
        settings,
    ))
}

async fn run(engine: Arc<ResearchEngine>, depth: ResearchDepth) -> (Vec<ResearchEvent>, ResearchStore) {
    let dir = tempfile::tempdir().unwrap();
    let exporter = Arc::new(ReportExporter::new(dir.path()));
    let store = ResearchStore::default();
    let job = ResearchJob { topic: "graphene batteries".into(), depth, format: ExportFormat::Screen };

    let events: Vec<ResearchEvent> = spawn_research(engine, exporter, store.clone(), job).collect().await;
    (events, store)
}

fn assert_well_formed(events: &[ResearchEvent]) {
    let percents: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            ResearchEvent::Progress(p) => Some(p.percent),
            _ => None,
        })
        .collect();
    assert!(!percents.is_empty());
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "progress went backwards: {:?}", percents);

    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(events.last().unwrap().is_terminal());
}

#[tokio::test]
async fn full_run_completes_with_deduplicated_sources() {
    let llm = Arc::new(ScriptedLlm::new(false));
    let aggregator = SourceAggregator::new().with_agent(EchoAgent).with_agent(OfflineAgent);
    let engine = engine(llm, Arc::new(OverlappingSearch), aggregator, Arc::new(InMemoryVectorStore::new("t")));

    let (events, store) = run(engine.clone(), ResearchDepth::Quick).await;
    assert_well_formed(&events);

    let ResearchEvent::Complete(completed) = events.last().unwrap() else {
        panic!("expected complete, got {:?}", events.last());
    };
    let result = &completed.result;

    // 3 queries × (2 shared + 1 unique) web URLs, plus one new arXiv URL
    assert_eq!(result.queries.len(), 3);
    assert_eq!(result.metadata.total_sources, 6);
    assert_eq!(result.metadata.depth, ResearchDepth::Quick);

    let mut urls: Vec<&str> = result.sources.iter().filter_map(|s| s.url.as_deref()).collect();
    let before = urls.len();
    urls.sort();
    urls.dedup();
    assert_eq!(urls.len(), before);

    // "dup" is too short to analyze, so only full-length records survive
    assert!(result.sources.iter().all(|s| s.analysis_summary.is_some()));
    // only the nature.com title is mentioned in the synthesis
    assert_eq!(result.synthesis.matches(" [").count(), 1);
    assert!(result.bibliography.starts_with("REFERENCES"));
    assert!(!result.citations.is_empty());

    assert!(matches!(events.first(), Some(ResearchEvent::Progress(p)) if p.percent == 0));
    assert!(store.get(&completed.research_id).await.is_some());
    assert!(engine.indexer().store().stats().await.unwrap().total_documents > 0);
}

#[tokio::test]
async fn run_with_nothing_fetched_still_completes() {
    let llm = Arc::new(ScriptedLlm::new(false));
    let engine = engine(llm, Arc::new(EmptySearch), SourceAggregator::new(), Arc::new(InMemoryVectorStore::new("t")));

    let (events, _) = run(engine, ResearchDepth::Standard).await;
    assert_well_formed(&events);

    let Some(ResearchEvent::Complete(completed)) = events.last() else {
        panic!("expected complete");
    };
    assert_eq!(completed.result.metadata.total_sources, 0);
    assert_eq!(completed.result.metadata.analyzed_sources, 0);
    assert!(completed.result.citations.is_empty());
    assert!(completed.result.bibliography.is_empty());
}

#[tokio::test]
async fn llm_failure_yields_single_error_event() {
    let llm = Arc::new(ScriptedLlm::new(true));
    let engine = engine(llm.clone(), Arc::new(OverlappingSearch), SourceAggregator::new(), Arc::new(InMemoryVectorStore::new("t")));

    let (events, store) = run(engine, ResearchDepth::Quick).await;
    assert_well_formed(&events);

    let Some(ResearchEvent::Error { error }) = events.last() else {
        panic!("expected error, got {:?}", events.last());
    };
    assert!(error.contains("synthesize"), "{}", error);
    // nothing past the failing stage is reported
    let last_percent = events
        .iter()
        .filter_map(|e| match e {
            ResearchEvent::Progress(p) => Some(p.percent),
            _ => None,
        })
        .max();
    assert_eq!(last_percent, Some(Stage::Synthesize.percent()));
    assert!(!events.iter().any(|e| matches!(e, ResearchEvent::Complete(_))));
    assert_eq!(store.len().await, 0);
    assert!(llm.calls.load(Ordering::SeqCst) > 1);
}

#[tokio::test]
async fn unavailable_vector_store_does_not_fail_the_run() {
    let llm = Arc::new(ScriptedLlm::new(false));
    let engine = engine(llm, Arc::new(OverlappingSearch), SourceAggregator::new(), Arc::new(UnavailableStore));

    let (events, _) = run(engine, ResearchDepth::Quick).await;
    assert_well_formed(&events);
    assert!(matches!(events.last(), Some(ResearchEvent::Complete(_))));
}

#[tokio::test]
async fn panicking_stage_yields_single_error_event() {
    let engine = engine(Arc::new(PanickingLlm), Arc::new(OverlappingSearch), SourceAggregator::new(), Arc::new(InMemoryVectorStore::new("t")));

    let (events, store) = run(engine, ResearchDepth::Quick).await;
    assert_well_formed(&events);

    let Some(ResearchEvent::Error { error }) = events.last() else {
        panic!("expected error, got {:?}", events.last());
    };
    assert!(error.contains("adapter bug"), "{}", error);
    assert_eq!(store.len().await, 0);
}
