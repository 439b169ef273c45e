use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::export::ReportExporter;
use crate::synthesis::ResearchEngine;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub engine: Arc<ResearchEngine>,
    pub exporter: Arc<ReportExporter>,
    pub results: ResearchStore,
}

/// Origin category of a source record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    #[default]
    WebSearch,
    Realtime,
}

fn default_raw_score() -> f64 {
    0.5
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// One retrieved or fetched document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub content: String,
    /// ISO-8601 or empty
    #[serde(default)]
    pub published_date: String,
    #[serde(default)]
    pub channel: Channel,
    #[serde(rename = "source", default)]
    pub source_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    /// Raw relevance from the originating fetcher
    #[serde(default = "default_raw_score")]
    pub score: f64,
    #[serde(default)]
    pub final_score: f64,
    #[serde(rename = "analysis", default, skip_serializing_if = "Option::is_none")]
    pub analysis_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
    /// Query or agent that produced this record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_query: Option<String>,
    /// Answer/summary objects are never cited
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_summary: bool,
}

impl SourceRecord {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: None,
            content: content.into(),
            published_date: String::new(),
            channel: Channel::WebSearch,
            source_name: String::new(),
            authors: Vec::new(),
            score: default_raw_score(),
            final_score: 0.0,
            analysis_summary: None,
            relevance: None,
            source_query: None,
            is_summary: false,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.url = if url.trim().is_empty() { None } else { Some(url) };
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.published_date = date.into();
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    /// The URL used for deduplication and citation numbering, if non-empty.
    pub fn url_key(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }
}

/// A numbered reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub number: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub publisher: String,
}

impl Citation {
    pub fn from_source(source: &SourceRecord, number: usize) -> Self {
        Self {
            number,
            url: source.url_key().map(String::from),
            title: source.title.clone(),
            authors: source.authors.clone(),
            date: source.published_date.clone(),
            publisher: source.source_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchDepth {
    Quick,
    #[default]
    Standard,
    Deep,
}

impl ResearchDepth {
    pub fn from_id(id: &str) -> Self {
        match id.to_lowercase().as_str() {
            "quick" => ResearchDepth::Quick,
            "deep" => ResearchDepth::Deep,
            _ => ResearchDepth::Standard,
        }
    }

    /// Number of search queries a run of this depth generates.
    pub fn query_count(&self, configured: usize) -> usize {
        match self {
            ResearchDepth::Quick => 3,
            ResearchDepth::Standard => configured,
            ResearchDepth::Deep => 8,
        }
    }
}

impl std::fmt::Display for ResearchDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResearchDepth::Quick => write!(f, "quick"),
            ResearchDepth::Standard => write!(f, "standard"),
            ResearchDepth::Deep => write!(f, "deep"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchMetadata {
    pub total_sources: usize,
    pub analyzed_sources: usize,
    pub timestamp: String,
    pub depth: ResearchDepth,
}

/// The terminal artifact of one research run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub topic: String,
    pub queries: Vec<String>,
    pub sources: Vec<SourceRecord>,
    pub synthesis: String,
    pub bibliography: String,
    pub citations: Vec<Citation>,
    pub metadata: ResearchMetadata,
}

/// Fixed pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Queries,
    Search,
    Realtime,
    Score,
    Index,
    Analyze,
    Retrieve,
    Synthesize,
    Cite,
    Bibliography,
    Done,
}

impl Stage {
    pub fn percent(&self) -> u8 {
        match self {
            Stage::Start => 0,
            Stage::Queries => 10,
            Stage::Search => 20,
            Stage::Realtime => 35,
            Stage::Score => 45,
            Stage::Index => 55,
            Stage::Analyze => 65,
            Stage::Retrieve => 70,
            Stage::Synthesize => 75,
            Stage::Cite => 85,
            Stage::Bibliography => 90,
            Stage::Done => 100,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Stage::Start => "Starting research...",
            Stage::Queries => "Generating search queries...",
            Stage::Search => "Performing web searches...",
            Stage::Realtime => "Fetching real-time data from academic sources...",
            Stage::Score => "Analyzing and scoring sources...",
            Stage::Index => "Indexing content for retrieval...",
            Stage::Analyze => "Analyzing content relevance...",
            Stage::Retrieve => "Retrieving relevant context...",
            Stage::Synthesize => "Synthesizing research findings...",
            Stage::Cite => "Formatting citations...",
            Stage::Bibliography => "Generating bibliography...",
            Stage::Done => "Research complete!",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::Queries => "queries",
            Stage::Search => "search",
            Stage::Realtime => "realtime",
            Stage::Score => "score",
            Stage::Index => "index",
            Stage::Analyze => "analyze",
            Stage::Retrieve => "retrieve",
            Stage::Synthesize => "synthesize",
            Stage::Cite => "cite",
            Stage::Bibliography => "bibliography",
            Stage::Done => "done",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(rename = "progress")]
    pub percent: u8,
    pub message: String,
    pub stage: Stage,
}

impl From<Stage> for ProgressEvent {
    fn from(stage: Stage) -> Self {
        Self {
            percent: stage.percent(),
            message: stage.message().to_string(),
            stage,
        }
    }
}

/// Requested output artifacts for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Screen,
    Pdf,
    Docx,
    Both,
}

impl ExportFormat {
    pub fn from_id(id: &str) -> Self {
        match id.to_lowercase().as_str() {
            "pdf" => ExportFormat::Pdf,
            "docx" => ExportFormat::Docx,
            "both" => ExportFormat::Both,
            _ => ExportFormat::Screen,
        }
    }

    pub fn wants_pdf(&self) -> bool {
        matches!(self, ExportFormat::Pdf | ExportFormat::Both)
    }

    pub fn wants_docx(&self) -> bool {
        matches!(self, ExportFormat::Docx | ExportFormat::Both)
    }
}

/// Payload of the `complete` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedResearch {
    pub research_id: String,
    pub format: ExportFormat,
    #[serde(flatten)]
    pub result: ResearchResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docx_path: Option<String>,
}

/// Ordered event stream of one run: progress..., then exactly one of complete/error
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ResearchEvent {
    Progress(ProgressEvent),
    Complete(Box<CompletedResearch>),
    Error { error: String },
}

impl ResearchEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ResearchEvent::Progress(_) => "progress",
            ResearchEvent::Complete(_) => "complete",
            ResearchEvent::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResearchEvent::Progress(_))
    }
}

/// Finished runs kept before the oldest are evicted
pub const DEFAULT_STORED_RESULTS: usize = 200;

#[derive(Default)]
struct StoreInner {
    records: HashMap<String, CompletedResearch>,
    order: VecDeque<String>,
}

/// In-process store of finished research, keyed by research id.
///
/// Holds at most `capacity` runs; inserting beyond that evicts the oldest.
#[derive(Clone)]
pub struct ResearchStore {
    inner: Arc<RwLock<StoreInner>>,
    capacity: usize,
}

impl Default for ResearchStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_STORED_RESULTS)
    }
}

impl ResearchStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner::default())),
            capacity: capacity.max(1),
        }
    }

    pub async fn insert(&self, record: CompletedResearch) {
        let mut guard = self.inner.write().await;
        let id = record.research_id.clone();
        if guard.records.insert(id.clone(), record).is_none() {
            guard.order.push_back(id);
        }
        while guard.records.len() > self.capacity {
            let Some(oldest) = guard.order.pop_front() else { break };
            guard.records.remove(&oldest);
        }
    }

    pub async fn get(&self, research_id: &str) -> Option<CompletedResearch> {
        let guard = self.inner.read().await;
        guard.records.get(research_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }
}

// API Request/Response types

#[derive(Debug, Deserialize, validator::Validate)]
pub struct ResearchStreamParams {
    #[serde(default)]
    #[validate(length(min = 1, max = 500, message = "Topic is required"))]
    pub topic: String,
    pub format: Option<String>,
    pub depth: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub llm_available: bool,
    pub llm_provider: String,
    pub model: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_documents: usize,
    pub collection_name: String,
    pub stored_results: usize,
}
