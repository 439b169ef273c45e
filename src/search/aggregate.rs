//! Flattening and URL deduplication of per-query (or per-agent) result lists.

use std::collections::HashSet;

use tracing::debug;

use crate::models::{Channel, SourceRecord};

/// Results keyed by the query or agent that produced them, in request order.
pub type SourceBatches = Vec<(String, Vec<SourceRecord>)>;

/// Flatten batches into one list ordered by raw score, descending.
///
/// Each record is tagged with its batch key. A URL seen earlier wins over any
/// later duplicate; records without a URL are always kept. Summary/answer
/// records are dropped.
pub fn aggregate_results(batches: SourceBatches) -> Vec<SourceRecord> {
    let mut seen = HashSet::new();
    let mut aggregated = Vec::new();
    let mut duplicates = 0usize;

    for (key, records) in batches {
        for mut record in records {
            if record.is_summary {
                continue;
            }
            if let Some(url) = record.url_key() {
                if !seen.insert(url.to_string()) {
                    duplicates += 1;
                    continue;
                }
            }
            record.source_query = Some(key.clone());
            aggregated.push(record);
        }
    }

    // sort_by is stable, so equal scores keep first-seen order
    aggregated.sort_by(|a, b| b.score.total_cmp(&a.score));

    debug!(kept = aggregated.len(), duplicates, "Aggregated source batches");
    aggregated
}

/// Concatenate the web search and realtime channels, tagging each record.
///
/// Across channels the URL rule still applies: whichever list comes first
/// keeps the record.
pub fn combine_sources(web: Vec<SourceRecord>, realtime: Vec<SourceRecord>) -> Vec<SourceRecord> {
    let mut seen = HashSet::new();

    web.into_iter()
        .map(|r| r.with_channel(Channel::WebSearch))
        .chain(realtime.into_iter().map(|r| r.with_channel(Channel::Realtime)))
        .filter(|r| match r.url_key() {
            Some(url) => seen.insert(url.to_string()),
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, url: &str, score: f64) -> SourceRecord {
        SourceRecord::new(title, "content").with_url(url).with_score(score)
    }

    #[test]
    fn test_first_occurrence_wins() {
        let batches = vec![
            ("graphene batteries".to_string(), vec![record("first", "a", 0.9)]),
            ("arxiv".to_string(), vec![record("second", "a", 0.5).with_channel(Channel::Realtime)]),
        ];
        let results = aggregate_results(batches);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "first");
        assert_eq!(results[0].score, 0.9);
        assert_eq!(results[0].channel, Channel::WebSearch);
        assert_eq!(results[0].source_query.as_deref(), Some("graphene batteries"));
    }

    #[test]
    fn test_no_duplicate_urls_and_sorted() {
        let batches = vec![
            ("q1".to_string(), vec![record("a", "u1", 0.2), record("b", "u2", 0.7), record("c", "", 0.4)]),
            ("q2".to_string(), vec![record("d", "u2", 0.99), record("e", "", 0.4), record("f", "u3", 0.8)]),
        ];
        let results = aggregate_results(batches);

        let urls: Vec<_> = results.iter().filter_map(|r| r.url_key()).collect();
        let unique: HashSet<_> = urls.iter().collect();
        assert_eq!(urls.len(), unique.len());

        // URL-less records are never deduplicated
        assert_eq!(results.len(), 5);
        let titles: Vec<_> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["f", "b", "c", "e", "a"]);
    }

    #[test]
    fn test_summary_records_excluded() {
        let mut summary = SourceRecord::new("AI Summary", "answer").with_score(1.0);
        summary.is_summary = true;
        let batches = vec![("q".to_string(), vec![summary, record("real", "u", 0.3)])];
        let results = aggregate_results(batches);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "real");
    }

    #[test]
    fn test_empty_batches() {
        let batches = vec![("arxiv".to_string(), vec![]), ("wikipedia".to_string(), vec![])];
        assert!(aggregate_results(batches).is_empty());
    }

    #[test]
    fn test_combine_sources_tags_channels() {
        let web = vec![record("w", "a", 0.9)];
        let realtime = vec![record("r", "a", 0.5), record("r2", "b", 0.5)];
        let combined = combine_sources(web, realtime);
        assert_eq!(combined.len(), 2);
        assert_eq!(combined[0].channel, Channel::WebSearch);
        assert_eq!(combined[0].title, "w");
        assert_eq!(combined[1].channel, Channel::Realtime);
        assert_eq!(combined[1].title, "r2");
    }
}
