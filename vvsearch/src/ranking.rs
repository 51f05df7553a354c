//! Result ordering for the local pipeline.
//!
//! Two keys, most important first:
//! 1. exact_match — literal query hits always precede non-exact ones
//! 2. match_ratio — descending within each bucket
//!
//! The sort is stable, so ties keep snapshot row order.

use crate::models::ScoredResult;
use std::cmp::Ordering;

/// Ordering used by `rank`: `Less` means `a` is shown before `b`.
pub fn compare_results(a: &ScoredResult, b: &ScoredResult) -> Ordering {
    b.exact_match
        .cmp(&a.exact_match)
        .then_with(|| b.match_ratio.total_cmp(&a.match_ratio))
}

/// Sort results in display order.
pub fn rank(mut results: Vec<ScoredResult>) -> Vec<ScoredResult> {
    results.sort_by(compare_results);
    results
}
