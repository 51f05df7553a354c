//! Query matching for the local pipeline.
//!
//! Two modes, picked from the query itself:
//! - Strict: the query contains whitespace. Every keyword must appear in the
//!   candidate verbatim; matches always score 100.
//! - Fuzzy: a single token scored with `partial_ratio` against the candidate
//!   and kept when the score reaches `min_ratio`.
//!
//! `exact` is true whenever the candidate contains the whole original query,
//! spaces included. In strict mode this can be false for a candidate that
//! still matches every keyword; such rows rank below literal phrase hits.

use crate::models::{ScoredResult, SubtitleRecord};

/// Score assigned to every strict-mode match.
pub const STRICT_MATCH_RATIO: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOutcome {
    pub ratio: f64,
    pub exact: bool,
}

/// Matching mode derived from the raw query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchMode {
    Strict { keywords: Vec<String> },
    Fuzzy,
}

impl MatchMode {
    pub fn for_query(query: &str) -> Self {
        if query.chars().any(char::is_whitespace) {
            MatchMode::Strict {
                keywords: query.split_whitespace().map(str::to_string).collect(),
            }
        } else {
            MatchMode::Fuzzy
        }
    }
}

/// A query prepared once and then matched against many candidates.
#[derive(Debug, Clone)]
pub struct QueryMatcher {
    query: String,
    query_lower: Vec<char>,
    mode: MatchMode,
    min_ratio: f64,
}

impl QueryMatcher {
    pub fn new(query: &str, min_ratio: u8) -> Self {
        Self {
            query: query.to_string(),
            query_lower: query.to_lowercase().chars().collect(),
            mode: MatchMode::for_query(query),
            min_ratio: f64::from(min_ratio),
        }
    }

    pub fn mode(&self) -> &MatchMode {
        &self.mode
    }

    /// Match one candidate text. `None` means the candidate is filtered out.
    pub fn match_text(&self, candidate: &str) -> Option<MatchOutcome> {
        let exact = candidate.contains(self.query.as_str());
        match &self.mode {
            MatchMode::Strict { keywords } => keywords
                .iter()
                .all(|keyword| candidate.contains(keyword.as_str()))
                .then_some(MatchOutcome {
                    ratio: STRICT_MATCH_RATIO,
                    exact,
                }),
            MatchMode::Fuzzy => {
                let candidate_lower: Vec<char> = candidate.to_lowercase().chars().collect();
                let ratio = partial_ratio_chars(&self.query_lower, &candidate_lower)?;
                (ratio >= self.min_ratio).then_some(MatchOutcome { ratio, exact })
            }
        }
    }

    pub fn score_record(&self, record: &SubtitleRecord) -> Option<ScoredResult> {
        self.match_text(&record.text)
            .map(|outcome| ScoredResult::from_record(record, outcome.ratio, outcome.exact))
    }
}

/// Convenience wrapper around `QueryMatcher` for a single candidate.
pub fn match_query(query: &str, candidate: &str, min_ratio: u8) -> Option<MatchOutcome> {
    QueryMatcher::new(query, min_ratio).match_text(candidate)
}

/// Positional partial ratio of two strings, 0-100.
///
/// Both strings are lower-cased. The shorter one slides over every window of
/// equal length in the longer one; each window scores the fraction of
/// positions holding the same character. The best window wins. An empty
/// shorter string scores 0.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    partial_ratio_chars(&a, &b).unwrap_or(0.0)
}

/// `None` when the shorter side is empty: such a pair never matches.
fn partial_ratio_chars(a: &[char], b: &[char]) -> Option<f64> {
    let (short, long) = if a.len() > b.len() { (b, a) } else { (a, b) };
    if short.is_empty() {
        return None;
    }

    let mut best = 0usize;
    for window in long.windows(short.len()) {
        let same = short.iter().zip(window).filter(|(s, w)| s == w).count();
        if same > best {
            best = same;
            if best == short.len() {
                break;
            }
        }
    }

    Some(best as f64 / short.len() as f64 * 100.0)
}
