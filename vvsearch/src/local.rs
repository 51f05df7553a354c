//! Local pipeline orchestrator.
//!
//! Every call reads the whole snapshot, scores each row, ranks the survivors
//! and slices out one page. Page changes re-run the search for the session's
//! query; scored results are never kept between calls.
//!
//! Scoring is CPU-bound and runs on a blocking thread, spread across rayon
//! workers. A `CancellationToken` is checked between phases so a dropped
//! search stops early.

use crate::database::RecordSource;
use crate::error::{SearchError, SearchResult};
use crate::formatter::{ResultCard, ResultFormatter};
use crate::matcher::QueryMatcher;
use crate::models::{validate_thresholds, ScoredResult};
use crate::pagination::Paginator;
use crate::ranking::rank;
use crate::session::{DropGuard, LocalSession, SearchGuard};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// One rendered page of local results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalPage {
    pub query: String,
    pub min_ratio: u8,
    pub page: usize,
    pub total_pages: usize,
    pub total_results: usize,
    pub results: Vec<ResultCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LocalOutcome {
    Page(LocalPage),
    /// Nothing matched; the active threshold is echoed back for the hint.
    NoResults { query: String, min_ratio: u8 },
}

pub struct LocalSearch<S: RecordSource + 'static> {
    source: Arc<S>,
    formatter: ResultFormatter,
    paginator: Paginator,
    session: Mutex<Option<LocalSession>>,
    searching: AtomicBool,
}

impl<S: RecordSource + 'static> LocalSearch<S> {
    pub fn new(source: Arc<S>, formatter: ResultFormatter, paginator: Paginator) -> Self {
        Self {
            source,
            formatter,
            paginator,
            session: Mutex::new(None),
            searching: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> Option<LocalSession> {
        self.session.lock().clone()
    }

    /// Start a new session at page 1.
    pub async fn search(&self, query: &str, min_ratio: u8) -> SearchResult<LocalOutcome> {
        validate_thresholds(query, min_ratio, None)?;
        self.run(query.to_string(), min_ratio, 1).await
    }

    /// Re-run the current session's query and show page `page`.
    pub async fn go_to_page(&self, page: usize) -> SearchResult<LocalOutcome> {
        let session = self
            .session()
            .ok_or_else(|| SearchError::InvalidInput("no active search".into()))?;
        if page < 1 || page > session.total_pages {
            return Err(SearchError::PageOutOfRange {
                requested: page,
                total: session.total_pages,
            });
        }
        self.run(session.query, session.min_ratio, page).await
    }

    pub async fn next_page(&self) -> SearchResult<LocalOutcome> {
        let current = self.session().map_or(0, |s| s.current_page);
        self.go_to_page(current + 1).await
    }

    pub async fn prev_page(&self) -> SearchResult<LocalOutcome> {
        let current = self.session().map_or(0, |s| s.current_page);
        self.go_to_page(current.saturating_sub(1)).await
    }

    async fn run(&self, query: String, min_ratio: u8, page: usize) -> SearchResult<LocalOutcome> {
        let _searching = SearchGuard::acquire(&self.searching)?;

        let token = CancellationToken::new();
        let guard = DropGuard::new(token.clone());

        let source = Arc::clone(&self.source);
        let query_owned = query.clone();
        let handle = tokio::task::spawn_blocking(move || {
            score_all(source.as_ref(), &query_owned, min_ratio, &token)
        });

        let ranked = match handle.await {
            Ok(result) => result?,
            // JoinError means the task panicked or was aborted
            Err(_join_error) => return Err(SearchError::Cancelled),
        };
        guard.disarm();

        let total_results = ranked.len();
        let total_pages = self.paginator.total_pages(total_results);
        if total_results > 0 && page > total_pages {
            return Err(SearchError::PageOutOfRange {
                requested: page,
                total: total_pages,
            });
        }

        *self.session.lock() = Some(LocalSession {
            query: query.clone(),
            min_ratio,
            current_page: page,
            total_pages,
            total_results,
        });

        if ranked.is_empty() {
            return Ok(LocalOutcome::NoResults { query, min_ratio });
        }

        let results = self
            .paginator
            .page(&ranked, page)
            .iter()
            .map(|result| self.formatter.local_card(result))
            .collect();

        Ok(LocalOutcome::Page(LocalPage {
            query,
            min_ratio,
            page,
            total_pages,
            total_results,
            results,
        }))
    }
}

/// Fetch, score and rank every row. Runs on a blocking thread.
fn score_all<S: RecordSource + ?Sized>(
    source: &S,
    query: &str,
    min_ratio: u8,
    token: &CancellationToken,
) -> SearchResult<Vec<ScoredResult>> {
    let t0 = Instant::now();
    let records = source.fetch_all()?;
    let fetch_ms = t0.elapsed().as_secs_f64() * 1000.0;

    // Checkpoint: Check cancellation before scoring
    if token.is_cancelled() {
        return Err(SearchError::Cancelled);
    }

    let t1 = Instant::now();
    let matcher = QueryMatcher::new(query, min_ratio);
    let scored: Vec<ScoredResult> = records
        .par_iter()
        .filter_map(|record| matcher.score_record(record))
        .collect();

    // Checkpoint: Check cancellation before ranking
    if token.is_cancelled() {
        return Err(SearchError::Cancelled);
    }

    let ranked = rank(scored);
    tracing::debug!(
        query,
        mode = ?matcher.mode(),
        rows = records.len(),
        matched = ranked.len(),
        fetch_ms,
        score_ms = t1.elapsed().as_secs_f64() * 1000.0,
        "local search scored"
    );
    Ok(ranked)
}
