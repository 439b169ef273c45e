//! Composite source ranking.
//!
//! `final = 0.4 * raw + 0.4 * credibility + 0.1 * recency + channel bonus`
//!
//! Credibility comes from substring checks against fixed tables that can be
//! replaced wholesale (e.g. loaded from JSON); recency is a step function on
//! the age of the publication date. Everything here is pure: the caller
//! passes the reference time, so identical inputs give identical scores.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Channel, SourceRecord};

const RAW_WEIGHT: f64 = 0.4;
const CREDIBILITY_WEIGHT: f64 = 0.4;
const RECENCY_WEIGHT: f64 = 0.1;
const REALTIME_BONUS: f64 = 0.1;

const BASE_CREDIBILITY: f64 = 0.5;
const AUTHORITATIVE_BONUS: f64 = 0.3;
const REPUTABLE_BONUS: f64 = 0.2;
const LOW_CREDIBILITY_PENALTY: f64 = 0.2;
const KEYWORD_BONUS: f64 = 0.1;

/// Recency assigned when the date is missing or unparseable
pub const UNKNOWN_RECENCY: f64 = 0.3;

/// Domain and keyword tables behind the credibility heuristic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredibilityTables {
    pub authoritative: Vec<String>,
    pub reputable_news: Vec<String>,
    pub low_credibility: Vec<String>,
    pub research_keywords: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for CredibilityTables {
    fn default() -> Self {
        Self {
            authoritative: owned(&[
                ".edu",
                ".gov",
                ".org",
                "scholar.google",
                "arxiv.org",
                "pubmed",
                "ieee.org",
                "acm.org",
                "springer",
                "nature.com",
                "science.org",
                "sciencedirect",
            ]),
            reputable_news: owned(&[
                "bbc.",
                "reuters.",
                "apnews.",
                "npr.org",
                "economist.",
                "scientificamerican.",
                "newscientist.",
            ]),
            low_credibility: owned(&["pinterest.", "quora.", "reddit.", "facebook.", "twitter."]),
            research_keywords: owned(&["research", "study", "analysis", "journal", "paper"]),
        }
    }
}

fn matches_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

#[derive(Debug, Clone, Default)]
pub struct Scorer {
    tables: CredibilityTables,
}

impl Scorer {
    pub fn new(tables: CredibilityTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &CredibilityTables {
        &self.tables
    }

    /// Credibility in [0,1]; each table contributes at most once.
    pub fn credibility_score(&self, url: &str, title: &str) -> f64 {
        let url = url.to_lowercase();
        let title = title.to_lowercase();
        let mut score = BASE_CREDIBILITY;

        if matches_any(&url, &self.tables.authoritative) {
            score += AUTHORITATIVE_BONUS;
        }
        if matches_any(&url, &self.tables.reputable_news) {
            score += REPUTABLE_BONUS;
        }
        if matches_any(&url, &self.tables.low_credibility) {
            score -= LOW_CREDIBILITY_PENALTY;
        }
        if matches_any(&title, &self.tables.research_keywords) {
            score += KEYWORD_BONUS;
        }

        score.clamp(0.0, 1.0)
    }

    pub fn final_score(&self, source: &SourceRecord, now: DateTime<Utc>) -> f64 {
        let raw = source.score.clamp(0.0, 1.0);
        let credibility = self.credibility_score(source.url_key().unwrap_or(""), &source.title);
        let recency = recency_score(&source.published_date, now);
        let bonus = if source.channel == Channel::Realtime { REALTIME_BONUS } else { 0.0 };

        RAW_WEIGHT * raw + CREDIBILITY_WEIGHT * credibility + RECENCY_WEIGHT * recency + bonus
    }

    /// Set `final_score` on every source and order them descending.
    ///
    /// Equal scores keep their incoming order.
    pub fn score_and_rank(&self, mut sources: Vec<SourceRecord>, topic: &str, now: DateTime<Utc>) -> Vec<SourceRecord> {
        for source in sources.iter_mut() {
            source.final_score = self.final_score(source, now);
        }
        sources.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));

        debug!(
            topic = %topic,
            count = sources.len(),
            top = sources.first().map(|s| s.final_score).unwrap_or_default(),
            "Scored and ranked sources"
        );
        sources
    }
}

/// Parse the calendar date of an ISO-8601 string; time and zone are ignored.
pub(crate) fn parse_iso_date(date: &str) -> Option<NaiveDate> {
    let day = date.trim().split('T').next()?.trim_end_matches('Z');
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Step-function freshness: younger never scores lower than older.
pub fn recency_score(date: &str, now: DateTime<Utc>) -> f64 {
    let Some(published) = parse_iso_date(date) else {
        return UNKNOWN_RECENCY;
    };

    let days_old = (now.date_naive() - published).num_days();
    match days_old {
        d if d < 30 => 1.0,
        d if d < 90 => 0.8,
        d if d < 180 => 0.6,
        d if d < 365 => 0.4,
        _ => 0.2,
    }
}
