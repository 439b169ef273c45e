//! Report Export
//!
//! Renders a finished report (topic, cited synthesis, bibliography) as:
//! - **Markdown**: for the terminal and the `screen` format
//! - **PDF**: US-letter pages with standard Times fonts (lopdf)
//! - **DOCX**: Word document (docx-rust)
//!
//! All renderers share the same layout: title, byline and date, numbered
//! sections parsed from the synthesis, then the references list. Files are
//! written to the configured output directory.

pub mod docx;
pub mod markdown;
pub mod pdf;

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::config::ExportConfig;
use crate::models::{ExportFormat, ResearchResult};
use crate::types::{AppError, AppResult};

pub const BYLINE: &str = "Deep Research Assistant";
pub const REFERENCES_HEADING: &str = "REFERENCES";

const SECTION_KEYWORDS: [&str; 11] = [
    "abstract",
    "introduction",
    "background",
    "methodology",
    "results",
    "discussion",
    "conclusion",
    "references",
    "literature review",
    "main findings",
    "future work",
];

/// Longest line still considered a plain-text section title
const MAX_HEADING_CHARS: usize = 60;

/// The part of a research result the renderers need
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportContent {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub synthesis: String,
    #[serde(default)]
    pub bibliography: String,
}

impl From<&ResearchResult> for ReportContent {
    fn from(result: &ResearchResult) -> Self {
        Self {
            topic: result.topic.clone(),
            synthesis: result.synthesis.clone(),
            bibliography: result.bibliography.clone(),
        }
    }
}

impl ReportContent {
    /// Bibliography entries without the header line
    pub fn references(&self) -> Vec<&str> {
        self.bibliography
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && *l != REFERENCES_HEADING)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading: Option<String>,
    pub paragraphs: Vec<String>,
}

fn is_section_heading(line: &str) -> bool {
    let line = line.trim();
    if line.starts_with('#') {
        return true;
    }
    let bare = line.trim_matches(|c: char| c == '*' || c == ':' || c.is_whitespace());
    if bare.is_empty() || bare.chars().count() > MAX_HEADING_CHARS || bare.ends_with('.') {
        return false;
    }
    let lower = bare.to_lowercase();
    SECTION_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn clean_heading(line: &str) -> String {
    line.trim()
        .trim_start_matches('#')
        .trim_matches(|c: char| c == '*' || c == ':' || c.is_whitespace())
        .to_string()
}

/// Split a synthesis into sections at markdown headings or lines that look
/// like section titles. Text before the first heading becomes an untitled
/// section; paragraphs are separated by blank lines.
pub fn parse_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = Section { heading: None, paragraphs: Vec::new() };
    let mut paragraph: Vec<&str> = Vec::new();

    fn flush(paragraph: &mut Vec<&str>, section: &mut Section) {
        if !paragraph.is_empty() {
            section.paragraphs.push(paragraph.join("\n"));
            paragraph.clear();
        }
    }

    for line in text.lines() {
        if is_section_heading(line) {
            flush(&mut paragraph, &mut current);
            if current.heading.is_some() || !current.paragraphs.is_empty() {
                sections.push(current);
            }
            current = Section { heading: Some(clean_heading(line)), paragraphs: Vec::new() };
        } else if line.trim().is_empty() {
            flush(&mut paragraph, &mut current);
        } else {
            paragraph.push(line.trim());
        }
    }
    flush(&mut paragraph, &mut current);
    if current.heading.is_some() || !current.paragraphs.is_empty() {
        sections.push(current);
    }

    sections
}

fn roman(n: usize) -> String {
    const NUMERALS: [&str; 10] = ["I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X"];
    NUMERALS
        .get(n)
        .map(|s| s.to_string())
        .unwrap_or_else(|| (n + 1).to_string())
}

/// Headings as rendered: upper-cased, roman-numbered except for the abstract.
pub fn numbered_headings(sections: &[Section]) -> Vec<Option<String>> {
    let mut counter = 0;
    sections
        .iter()
        .map(|s| {
            s.heading.as_ref().map(|h| {
                let upper = h.to_uppercase();
                if upper == "ABSTRACT" {
                    upper
                } else {
                    counter += 1;
                    format!("{}. {}", roman(counter - 1), upper)
                }
            })
        })
        .collect()
}

/// Filesystem-safe stem: `research_<topic>_<timestamp>`
fn file_safe(c: char) -> char {
    if c.is_alphanumeric() || c == '-' {
        c
    } else {
        '_'
    }
}

fn file_stem(topic: &str) -> String {
    let slug: String = topic
        .chars()
        .take(50)
        .map(file_safe)
        .collect();
    format!("research_{}_{}", slug, Utc::now().format("%Y%m%d_%H%M%S"))
}

/// Paths of the files written for one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportArtifacts {
    pub pdf_path: Option<String>,
    pub docx_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReportExporter {
    output_dir: PathBuf,
    scratch_dir: PathBuf,
}

impl ReportExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Directory for intermediate files the renderers need
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(&config.output_dir).with_scratch_dir(&config.temp_dir)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn write(&self, file_name: String, bytes: Vec<u8>) -> AppResult<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| AppError::Export(format!("Cannot create {}: {}", self.output_dir.display(), e)))?;
        let path = self.output_dir.join(file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Export(format!("Cannot write {}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Report written");
        Ok(path)
    }

    pub async fn write_pdf(&self, report: &ReportContent, research_id: &str) -> AppResult<PathBuf> {
        let report = report.clone();
        let topic = report.topic.clone();
        let bytes = tokio::task::spawn_blocking(move || pdf::render(&report))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;
        let name = format!("{}_{}.pdf", file_stem(&topic), short_id(research_id));
        self.write(name, bytes).await
    }

    pub async fn write_docx(&self, report: &ReportContent, research_id: &str) -> AppResult<PathBuf> {
        let report = report.clone();
        let topic = report.topic.clone();
        let scratch = self.scratch_dir.clone();
        let bytes = tokio::task::spawn_blocking(move || docx::render(&report, &scratch))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;
        let name = format!("{}_{}.docx", file_stem(&topic), short_id(research_id));
        self.write(name, bytes).await
    }

    /// Write the files `format` asks for; `screen` writes nothing.
    pub async fn export(&self, result: &ResearchResult, format: ExportFormat, research_id: &str) -> AppResult<ExportArtifacts> {
        let report = ReportContent::from(result);
        let mut artifacts = ExportArtifacts::default();

        if format.wants_pdf() {
            let path = self.write_pdf(&report, research_id).await?;
            artifacts.pdf_path = Some(path.display().to_string());
        }
        if format.wants_docx() {
            let path = self.write_docx(&report, research_id).await?;
            artifacts.docx_path = Some(path.display().to_string());
        }
        Ok(artifacts)
    }

    /// Resolve a previously exported file, refusing anything outside the output directory.
    pub fn resolve_download(&self, path: &str) -> AppResult<PathBuf> {
        let root = self
            .output_dir
            .canonicalize()
            .map_err(|_| AppError::NotFound("Output directory does not exist".to_string()))?;
        let candidate = Path::new(path)
            .canonicalize()
            .map_err(|_| AppError::NotFound(format!("File not found: {}", path)))?;
        if !candidate.starts_with(&root) {
            return Err(AppError::InvalidRequest("Path is outside the output directory".to_string()));
        }
        Ok(candidate)
    }
}

fn short_id(research_id: &str) -> String {
    research_id.chars().take(8).map(file_safe).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYNTHESIS: &str = "Preamble line.\n\n## Abstract\nShort summary [1].\n\n## Introduction\nFirst para.\n\nSecond para\ncontinues.\n\nMain Findings:\nThe results show gains.";

    #[test]
    fn test_parse_sections() {
        let sections = parse_sections(SYNTHESIS);
        assert_eq!(sections.len(), 4);
        assert_eq!(sections[0].heading, None);
        assert_eq!(sections[1].heading.as_deref(), Some("Abstract"));
        assert_eq!(sections[2].paragraphs, vec!["First para.".to_string(), "Second para\ncontinues.".to_string()]);
        assert_eq!(sections[3].heading.as_deref(), Some("Main Findings"));
        // A sentence mentioning results is body text, not a heading
        assert_eq!(sections[3].paragraphs, vec!["The results show gains.".to_string()]);
    }

    #[test]
    fn test_numbered_headings_skip_abstract() {
        let headings = numbered_headings(&parse_sections(SYNTHESIS));
        assert_eq!(
            headings,
            vec![
                None,
                Some("ABSTRACT".to_string()),
                Some("I. INTRODUCTION".to_string()),
                Some("II. MAIN FINDINGS".to_string()),
            ]
        );
    }

    #[test]
    fn test_references_strip_header() {
        let report = ReportContent {
            topic: "t".into(),
            synthesis: String::new(),
            bibliography: "REFERENCES\n\n[1] A, \"B,\"\n[2] C, \"D,\"".into(),
        };
        assert_eq!(report.references(), vec!["[1] A, \"B,\"", "[2] C, \"D,\""]);
    }

    #[test]
    fn test_file_stem_is_safe() {
        let stem = file_stem("graphene / batteries?");
        assert!(stem.starts_with("research_graphene___batteries__"));
        assert!(!stem.contains('/'));
    }

    #[tokio::test]
    async fn test_export_writes_requested_formats() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ReportExporter::new(dir.path());
        let result = ResearchResult {
            topic: "graphene batteries".into(),
            queries: vec![],
            sources: vec![],
            synthesis: SYNTHESIS.into(),
            bibliography: "REFERENCES\n\n[1] Anonymous, \"Graphene,\"".into(),
            citations: vec![],
            metadata: crate::models::ResearchMetadata {
                total_sources: 0,
                analyzed_sources: 0,
                timestamp: Utc::now().to_rfc3339(),
                depth: Default::default(),
            },
        };

        let none = exporter.export(&result, ExportFormat::Screen, "abcdef0123").await.unwrap();
        assert_eq!(none, ExportArtifacts::default());

        let both = exporter.export(&result, ExportFormat::Both, "abcdef0123").await.unwrap();
        let pdf = both.pdf_path.unwrap();
        let docx = both.docx_path.unwrap();
        assert!(std::path::Path::new(&pdf).to_string_lossy().ends_with("_abcdef01.pdf"));
        assert!(std::fs::read(&pdf).unwrap().starts_with(b"%PDF"));
        // DOCX is a zip archive
        assert!(std::fs::read(&docx).unwrap().starts_with(b"PK"));

        assert!(exporter.resolve_download(&pdf).is_ok());
    }

    #[tokio::test]
    async fn test_research_id_cannot_escape_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ReportExporter::new(dir.path());
        let report = ReportContent { topic: "T".into(), synthesis: "Body.".into(), bibliography: String::new() };

        let path = exporter.write_pdf(&report, "../../x/evil").await.unwrap();
        assert_eq!(path.parent(), Some(dir.path()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("_______x_.pdf"), "{}", name);
        assert!(exporter.resolve_download(path.to_str().unwrap()).is_ok());
    }

    #[test]
    fn test_resolve_download_rejects_outside_paths() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::NamedTempFile::new().unwrap();
        let exporter = ReportExporter::new(dir.path());
        assert!(matches!(
            exporter.resolve_download(other.path().to_str().unwrap()),
            Err(AppError::InvalidRequest(_))
        ));
        assert!(matches!(exporter.resolve_download("/no/such/file.pdf"), Err(AppError::NotFound(_))));
    }
}
