//! Research-specific LLM operations: query generation, content analysis
//! and report synthesis on top of the plain completion capability.

use tracing::{info, warn};

use crate::llm::prompts;
use crate::llm::provider::LLM;
use crate::types::AppResult;
use crate::utils::truncate_chars;

const ANALYSIS_CONTENT_CHARS: usize = 4000;
const SYNTHESIS_MAX_ITEMS: usize = 20;
const SYNTHESIS_ITEM_CHARS: usize = 500;

const ACADEMIC_TERMS: [&str; 6] = ["research", "study", "analysis", "findings", "data", "evidence"];

/// Summary produced for one source by the analysis stage
#[derive(Debug, Clone, PartialEq)]
pub struct ContentAnalysis {
    pub summary: String,
    pub relevance_score: f64,
}

/// One block of material handed to the synthesis prompt
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisItem {
    pub title: String,
    pub text: String,
}

#[derive(Clone)]
pub struct ResearchLlm {
    llm: LLM,
}

impl ResearchLlm {
    pub fn new(llm: LLM) -> Self {
        Self { llm }
    }

    pub fn llm(&self) -> &LLM {
        &self.llm
    }

    /// Generate up to `num_queries` search queries for a topic.
    pub async fn generate_queries(&self, topic: &str, num_queries: usize) -> AppResult<Vec<String>> {
        let prompt = prompts::query_generation(topic, num_queries);
        let response = self.llm.complete(&prompt, 0.8, 2000).await?;
        let queries = parse_queries(&response, num_queries);
        if queries.is_empty() {
            warn!(topic = %topic, "LLM returned no usable search queries");
        }
        info!(count = queries.len(), "Generated search queries");
        Ok(queries)
    }

    pub async fn analyze_content(&self, topic: &str, content: &str) -> AppResult<ContentAnalysis> {
        let prompt = prompts::content_analysis(topic, truncate_chars(content, ANALYSIS_CONTENT_CHARS));
        let summary = self.llm.complete(&prompt, 0.5, 1000).await?;
        let relevance_score = estimate_relevance(&summary);
        Ok(ContentAnalysis { summary, relevance_score })
    }

    pub async fn synthesize_research(&self, topic: &str, items: &[SynthesisItem]) -> AppResult<String> {
        let information = prepare_information_summary(items);
        let prompt = prompts::synthesis(topic, &information);
        let report = self.llm.complete(&prompt, 0.6, 4000).await?;
        info!(report_len = report.len(), items = items.len(), "Synthesized research report");
        Ok(report)
    }
}

/// One query per non-empty line, leading numbering and bullets removed.
pub fn parse_queries(response: &str, limit: usize) -> Vec<String> {
    response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, '.' | '-' | ')' | ' '))
                .to_string()
        })
        .filter(|q| !q.is_empty())
        .take(limit)
        .collect()
}

/// Heuristic relevance from summary length and academic vocabulary.
pub fn estimate_relevance(summary: &str) -> f64 {
    let mut score = (summary.chars().count() as f64 / 500.0).min(1.0);
    let lower = summary.to_lowercase();
    for term in ACADEMIC_TERMS {
        if lower.contains(term) {
            score += 0.05;
        }
    }
    score.min(1.0)
}

fn prepare_information_summary(items: &[SynthesisItem]) -> String {
    items
        .iter()
        .take(SYNTHESIS_MAX_ITEMS)
        .enumerate()
        .map(|(i, item)| {
            let title = if item.title.is_empty() { "Untitled" } else { item.title.as_str() };
            format!(
                "[Source {}] {}\n{}\n",
                i + 1,
                title,
                truncate_chars(&item.text, SYNTHESIS_ITEM_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
