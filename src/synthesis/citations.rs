//! IEEE-style citation bookkeeping for one research run.
//!
//! Numbers are 1-based and assigned in first-seen order. A URL is cited at
//! most once; sources without a URL get a fresh entry on every call.

use std::collections::HashMap;

use regex::Regex;
use tracing::warn;

use crate::models::{Citation, SourceRecord};
use crate::search::scoring::parse_iso_date;
use crate::utils::truncate_chars;

/// Titles this short are too generic to locate in the text
const MIN_TITLE_CHARS: usize = 10;
const TITLE_MATCH_CHARS: usize = 50;

#[derive(Debug, Default)]
pub struct CitationManager {
    citations: Vec<Citation>,
    by_url: HashMap<String, usize>,
}

impl CitationManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, mut citation: Citation) -> usize {
        if let Some(url) = citation.url.as_deref().filter(|u| !u.is_empty()) {
            if let Some(&number) = self.by_url.get(url) {
                return number;
            }
        }

        let number = self.citations.len() + 1;
        citation.number = number;
        if let Some(url) = citation.url.clone().filter(|u| !u.is_empty()) {
            self.by_url.insert(url, number);
        }
        self.citations.push(citation);
        number
    }

    /// Number for `source`, creating an entry unless its URL is already cited.
    pub fn add_citation(&mut self, source: &SourceRecord) -> usize {
        self.register(Citation::from_source(source, 0))
    }

    /// `[N] Author, "Title," Publisher, Mon. Year. [Online]. Available: url`
    pub fn format_citation(&self, citation: &Citation, number: usize) -> String {
        let mut parts = vec![
            format!("[{}]", number),
            format!("{},", format_authors(&citation.authors)),
        ];

        let title = if citation.title.is_empty() { "Untitled" } else { citation.title.as_str() };
        parts.push(format!("\"{},\"", title));

        if !citation.publisher.is_empty() {
            parts.push(format!("{},", citation.publisher));
        }

        let date = format_date(&citation.date);
        if !date.is_empty() {
            parts.push(format!("{}.", date));
        }

        if let Some(url) = citation.url.as_deref().filter(|u| !u.is_empty()) {
            parts.push(format!("[Online]. Available: {}", url));
        }

        parts.join(" ")
    }

    /// `REFERENCES` header then one formatted line per citation; empty when nothing is cited.
    pub fn generate_bibliography(&self) -> String {
        if self.citations.is_empty() {
            return String::new();
        }

        let mut lines = vec!["REFERENCES\n".to_string()];
        lines.extend(
            self.citations
                .iter()
                .enumerate()
                .map(|(i, c)| self.format_citation(c, i + 1)),
        );
        lines.join("\n")
    }

    /// Register every source and place `[N]` after the first mention of its title.
    ///
    /// The match is the first 50 title characters plus everything up to the
    /// next `[`, so the marker lands after the mentioning passage. Sources whose
    /// title is not found are still numbered.
    pub fn insert_citations(&mut self, text: &str, sources: &[SourceRecord]) -> String {
        let mut cited = text.to_string();

        for source in sources {
            let number = self.add_citation(source);

            if source.title.chars().count() <= MIN_TITLE_CHARS {
                continue;
            }

            let prefix = truncate_chars(&source.title, TITLE_MATCH_CHARS);
            let pattern = format!("({}[^\\[]*)", regex::escape(prefix));
            match Regex::new(&pattern) {
                Ok(re) => {
                    cited = re.replacen(&cited, 1, format!("${{1}} [{}]", number)).into_owned();
                }
                Err(e) => warn!(title = %source.title, error = %e, "Skipping citation marker"),
            }
        }

        cited
    }

    pub fn get_inline_citation(&self, url: &str) -> String {
        self.by_url
            .get(url)
            .map(|n| format!("[{}]", n))
            .unwrap_or_default()
    }

    pub fn citation_count(&self) -> usize {
        self.citations.len()
    }

    pub fn clear(&mut self) {
        self.citations.clear();
        self.by_url.clear();
    }

    pub fn export_citations(&self) -> Vec<Citation> {
        self.citations.clone()
    }

    /// Replace the current citations, renumbering in the given order.
    pub fn import_citations(&mut self, citations: Vec<Citation>) {
        self.clear();
        for citation in citations {
            self.register(citation);
        }
    }
}

/// `F. Last` / `F. M. Last`; a single name is kept as is.
fn format_author_name(name: &str) -> String {
    let parts: Vec<&str> = name.split_whitespace().collect();
    match parts.as_slice() {
        [] => "Anonymous".to_string(),
        [single] => single.to_string(),
        [given @ .., last] => {
            let initials: Vec<String> = given
                .iter()
                .filter_map(|p| p.chars().next())
                .map(|c| format!("{}.", c))
                .collect();
            format!("{} {}", initials.join(" "), last)
        }
    }
}

fn format_authors(authors: &[String]) -> String {
    match authors {
        [] => "Anonymous".to_string(),
        [one] => format_author_name(one),
        [first, second] => format!("{} and {}", format_author_name(first), format_author_name(second)),
        [first, ..] => format!("{} et al.", format_author_name(first)),
    }
}

/// `Mon. YYYY`, or the input unchanged when it is not an ISO date.
fn format_date(date: &str) -> String {
    if date.is_empty() {
        return String::new();
    }
    match parse_iso_date(date) {
        Some(day) => day.format("%b. %Y").to_string(),
        None => date.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(title: &str, url: &str) -> SourceRecord {
        SourceRecord::new(title, "content").with_url(url)
    }

    #[test]
    fn test_add_citation_idempotent_by_url() {
        let mut manager = CitationManager::new();
        assert_eq!(manager.add_citation(&source("A", "u1")), 1);
        assert_eq!(manager.citation_count(), 1);
        assert_eq!(manager.add_citation(&source("A again", "u1")), 1);
        assert_eq!(manager.citation_count(), 1);
        assert_eq!(manager.add_citation(&source("B", "u2")), 2);
    }

    #[test]
    fn test_no_url_never_deduplicated() {
        let mut manager = CitationManager::new();
        assert_eq!(manager.add_citation(&source("Same", "")), 1);
        assert_eq!(manager.add_citation(&source("Same", "")), 2);
        assert_eq!(manager.citation_count(), 2);
    }

    #[test]
    fn test_format_citation() {
        let manager = CitationManager::new();
        let citation = Citation {
            number: 1,
            url: Some("https://nature.com/x".into()),
            title: "Graphene anodes".into(),
            authors: vec!["John Ronald Smith".into()],
            date: "2024-03-15T10:00:00Z".into(),
            publisher: "Nature".into(),
        };
        assert_eq!(
            manager.format_citation(&citation, 1),
            "[1] J. R. Smith, \"Graphene anodes,\" Nature, Mar. 2024. [Online]. Available: https://nature.com/x"
        );
    }

    #[test]
    fn test_format_citation_fallbacks() {
        let manager = CitationManager::new();
        let citation = Citation {
            number: 2,
            url: None,
            title: "Notes".into(),
            authors: vec![],
            date: "Spring 2023".into(),
            publisher: String::new(),
        };
        assert_eq!(manager.format_citation(&citation, 2), "[2] Anonymous, \"Notes,\" Spring 2023.");
    }

    #[test]
    fn test_author_lists() {
        assert_eq!(format_authors(&["Plato".into()]), "Plato");
        assert_eq!(format_authors(&["Ada Lovelace".into(), "Alan Turing".into()]), "A. Lovelace and A. Turing");
        assert_eq!(
            format_authors(&["Ada Lovelace".into(), "Alan Turing".into(), "Grace Hopper".into()]),
            "A. Lovelace et al."
        );
    }

    #[test]
    fn test_bibliography() {
        let mut manager = CitationManager::new();
        assert_eq!(manager.generate_bibliography(), "");

        manager.add_citation(&source("First", "u1"));
        manager.add_citation(&source("Second", "u2"));
        let bib = manager.generate_bibliography();
        assert!(bib.starts_with("REFERENCES\n\n[1] Anonymous, \"First,\""));
        assert!(bib.contains("\n[2] Anonymous, \"Second,\""));
    }

    #[test]
    fn test_insert_citations_marks_first_mention() {
        let mut manager = CitationManager::new();
        let text = "Graphene batteries show promise. Other work [x] differs.";
        let sources = vec![source("Graphene batteries show promise", "u1"), source("Short", "u2")];
        let cited = manager.insert_citations(text, &sources);
        assert_eq!(cited, "Graphene batteries show promise. Other work  [1][x] differs.");
        assert_eq!(manager.citation_count(), 2);
        assert_eq!(manager.get_inline_citation("u2"), "[2]");
        assert_eq!(manager.get_inline_citation("missing"), "");
    }

    #[test]
    fn test_insert_citations_scenario() {
        let mut manager = CitationManager::new();
        let cited = manager.insert_citations(
            "Graphene batteries show promise.",
            &[source("Graphene batteries show promise", "u1")],
        );
        assert_eq!(cited, "Graphene batteries show promise. [1]");
    }

    #[test]
    fn test_unmentioned_title_still_listed() {
        let mut manager = CitationManager::new();
        let text = "Graphene batteries show promise.";
        let sources = vec![
            source("Solid-state electrolytes at scale", "u1"),
            source("Graphene batteries show promise", "u2"),
        ];
        let cited = manager.insert_citations(text, &sources);
        assert_eq!(cited, "Graphene batteries show promise. [2]");
        assert_eq!(manager.citation_count(), 2);
        assert_eq!(manager.get_inline_citation("u1"), "[1]");
        assert!(manager
            .generate_bibliography()
            .contains("[1] Anonymous, \"Solid-state electrolytes at scale,\""));
    }

    #[test]
    fn test_insert_citations_escapes_title() {
        let mut manager = CitationManager::new();
        let cited = manager.insert_citations(
            "See What is C++ (really)? for details",
            &[source("What is C++ (really)?", "u1")],
        );
        assert_eq!(cited, "See What is C++ (really)? for details [1]");
    }

    #[test]
    fn test_clear_and_import() {
        let mut manager = CitationManager::new();
        manager.add_citation(&source("A", "u1"));
        manager.add_citation(&source("B", "u2"));
        let exported = manager.export_citations();

        manager.clear();
        assert_eq!(manager.citation_count(), 0);
        assert_eq!(manager.get_inline_citation("u1"), "");

        manager.import_citations(exported.into_iter().rev().collect());
        assert_eq!(manager.get_inline_citation("u2"), "[1]");
        assert_eq!(manager.export_citations()[1].number, 2);
    }
}
