use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use tracing::warn;

use crate::models::ResearchDepth;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub search: SearchConfig,
    pub realtime: RealtimeConfig,
    pub rag: RagConfig,
    pub research: ResearchConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub log_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: String,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub provider: String,
    pub tavily_api_key: String,
    pub serpapi_key: String,
    pub scholar_enabled: bool,
    pub max_results: usize,
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    pub news_api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RagConfig {
    pub persist_dir: String,
    pub collection: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResearchConfig {
    pub max_queries: usize,
    pub default_depth: ResearchDepth,
    pub analyze_limit: usize,
    pub context_results: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub output_dir: String,
    pub temp_dir: String,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let provider = var_or("LLM_PROVIDER", "ollama");
        let ollama_model = var_or("OLLAMA_MODEL", "llama3.2");

        Ok(Self {
            server: ServerConfig {
                port: var_or("PORT", "5000").parse()?,
                host: var_or("HOST", "0.0.0.0"),
                cors_allowed_origins: var_or("ALLOWED_ORIGINS", "*")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                log_dir: non_empty("LOG_DIR"),
            },
            llm: LLMConfig {
                ollama_base_url: var_or("OLLAMA_BASE_URL", "http://localhost:11434"),
                openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                openai_base_url: non_empty("OPENAI_BASE_URL"),
                model: env::var("LLM_MODEL").unwrap_or_else(|_| {
                    if provider == "ollama" {
                        ollama_model.clone()
                    } else {
                        "gpt-4o-mini".to_string()
                    }
                }),
                ollama_model,
                provider,
            },
            search: SearchConfig {
                provider: var_or("SEARCH_PROVIDER", "tavily"),
                tavily_api_key: env::var("TAVILY_API_KEY").unwrap_or_default(),
                serpapi_key: env::var("SERPAPI_API_KEY").unwrap_or_default(),
                scholar_enabled: var_or("SERPAPI_SCHOLAR_ENABLED", "true").parse()?,
                max_results: var_or("MAX_SEARCH_RESULTS", "10").parse()?,
                delay_ms: var_or("SEARCH_DELAY_MS", "500").parse()?,
            },
            realtime: RealtimeConfig {
                news_api_key: non_empty("NEWS_API_KEY"),
                timeout_secs: var_or("REALTIME_TIMEOUT_SECS", "10").parse()?,
            },
            rag: RagConfig {
                persist_dir: var_or("CHROMA_PERSIST_DIR", "./data/chromadb"),
                collection: var_or("VECTOR_COLLECTION", "research_docs"),
                chunk_size: var_or("CHUNK_SIZE", "1000").parse()?,
                chunk_overlap: var_or("CHUNK_OVERLAP", "200").parse()?,
            },
            research: ResearchConfig {
                max_queries: var_or("MAX_QUERIES", "5").parse()?,
                default_depth: ResearchDepth::from_id(&var_or("RESEARCH_DEPTH", "standard")),
                analyze_limit: var_or("ANALYZE_LIMIT", "20").parse()?,
                context_results: var_or("CONTEXT_RESULTS", "15").parse()?,
            },
            export: ExportConfig {
                output_dir: var_or("OUTPUT_DIR", "./outputs"),
                temp_dir: var_or("TEMP_DIR", "./temp"),
            },
        })
    }

    /// Warn about missing credentials and create the working directories.
    pub fn validate(&self) -> Result<()> {
        let search_key_missing = match self.search.provider.as_str() {
            "serpapi" => self.search.serpapi_key.is_empty(),
            _ => self.search.tavily_api_key.is_empty(),
        };
        if search_key_missing {
            warn!(provider = %self.search.provider, "Web search API key not set, web search will not work");
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            anyhow::bail!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.rag.chunk_overlap,
                self.rag.chunk_size
            );
        }

        for dir in [&self.export.output_dir, &self.export.temp_dir, &self.rag.persist_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.export.output_dir)
    }
}
