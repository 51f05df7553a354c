//! Core data models for vvsearch
//!
//! `SubtitleRecord` rows come from the local snapshot, `RemoteResult` records
//! arrive one per NDJSON line from the remote endpoint. `ScoredResult` is the
//! per-query view the local ranker produces and is never persisted.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// STORED ROWS
// ─────────────────────────────────────────────────────────────────────────────

/// A subtitle line as stored in the `subtitles` table of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleRecord {
    pub episode_title: String,
    pub timestamp: String,
    pub similarity: f64,
    pub text: String,
}

impl SubtitleRecord {
    pub fn new(
        episode_title: impl Into<String>,
        timestamp: impl Into<String>,
        similarity: f64,
        text: impl Into<String>,
    ) -> Self {
        Self {
            episode_title: episode_title.into(),
            timestamp: timestamp.into(),
            similarity,
            text: text.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PER-QUERY RESULTS
// ─────────────────────────────────────────────────────────────────────────────

/// A record that survived matching, with its score for the current query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    pub episode_title: String,
    pub timestamp: String,
    pub similarity: f64,
    pub text: String,
    /// 0-100
    pub match_ratio: f64,
    pub exact_match: bool,
}

impl ScoredResult {
    pub fn from_record(record: &SubtitleRecord, match_ratio: f64, exact_match: bool) -> Self {
        Self {
            episode_title: record.episode_title.clone(),
            timestamp: record.timestamp.clone(),
            similarity: record.similarity,
            text: record.text.clone(),
            match_ratio,
            exact_match,
        }
    }
}

/// A pre-scored result streamed from the remote search endpoint.
///
/// The producer owns ordering; the client appends these in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteResult {
    pub filename: String,
    pub timestamp: String,
    pub text: String,
    pub match_ratio: f64,
    pub similarity: f64,
}

// ─────────────────────────────────────────────────────────────────────────────
// QUERIES
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters for one remote search request.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteQuery {
    pub query: String,
    pub min_ratio: u8,
    pub min_similarity: f64,
}

/// Reject blank queries and thresholds outside their documented ranges.
pub(crate) fn validate_thresholds(
    query: &str,
    min_ratio: u8,
    min_similarity: Option<f64>,
) -> crate::SearchResult<()> {
    if query.trim().is_empty() {
        return Err(crate::SearchError::InvalidInput("query is empty".into()));
    }
    if min_ratio > 100 {
        return Err(crate::SearchError::InvalidInput(format!(
            "min_ratio must be within 0..=100, got {min_ratio}"
        )));
    }
    if let Some(similarity) = min_similarity {
        if !(0.0..=1.0).contains(&similarity) {
            return Err(crate::SearchError::InvalidInput(format!(
                "min_similarity must be within 0.0..=1.0, got {similarity}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_result_ignores_unknown_fields() {
        let line = r#"{"filename":"[P01] a.json","timestamp":"1m2s","text":"hi","match_ratio":88.5,"similarity":0.9,"extra":true}"#;
        let parsed: RemoteResult = serde_json::from_str(line).unwrap();
        assert_eq!(parsed.filename, "[P01] a.json");
        assert_eq!(parsed.match_ratio, 88.5);
    }

    #[test]
    fn scored_result_copies_record_fields() {
        let record = SubtitleRecord::new("[P03] ep", "1m0s", 0.5, "text");
        let scored = ScoredResult::from_record(&record, 75.0, false);
        assert_eq!(scored.episode_title, "[P03] ep");
        assert_eq!(scored.similarity, 0.5);
        assert_eq!(scored.match_ratio, 75.0);
        assert!(!scored.exact_match);
    }

    #[test]
    fn validation_rejects_blank_query_and_bad_thresholds() {
        assert!(validate_thresholds("   ", 50, None).is_err());
        assert!(validate_thresholds("q", 101, None).is_err());
        assert!(validate_thresholds("q", 50, Some(1.5)).is_err());
        assert!(validate_thresholds("q", 100, Some(0.0)).is_ok());
    }
}
