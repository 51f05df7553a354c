//! Remote pipeline orchestrator.
//!
//! A search opens one NDJSON stream, appends every decoded record to the
//! session buffer, then shows the first page. Later pages are revealed from
//! the buffer on demand; nothing is re-fetched.
//!
//! Starting a search cancels the previous session. Its reveal trigger goes
//! stale and its buffer is dropped.

use crate::accumulator::ResultAccumulator;
use crate::endpoint::SearchEndpoint;
use crate::error::{SearchError, SearchResult};
use crate::formatter::{RemoteCard, ResultFormatter};
use crate::models::{validate_thresholds, RemoteQuery, RemoteResult};
use crate::pagination::RevealCursor;
use crate::progress::ProgressEvent;
use crate::session::{RevealTrigger, SearchGuard};
use futures::StreamExt;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// Discards the session and its partial buffer on drop unless disarmed.
struct SessionGuard<'a, E: SearchEndpoint> {
    search: &'a RemoteSearch<E>,
    id: Option<u64>,
}

impl<'a, E: SearchEndpoint> SessionGuard<'a, E> {
    fn new(search: &'a RemoteSearch<E>, id: u64) -> Self {
        Self { search, id: Some(id) }
    }

    fn disarm(mut self) {
        self.id = None;
    }
}

impl<E: SearchEndpoint> Drop for SessionGuard<'_, E> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.search.abort_session(id);
        }
    }
}

struct RemoteSession {
    id: u64,
    query: RemoteQuery,
    buffer: ResultAccumulator<RemoteResult>,
    cursor: RevealCursor,
    token: CancellationToken,
}

/// Cards revealed by one step, with the buffer position after it.
#[derive(Debug, Clone, Serialize)]
pub struct RemoteBatch {
    pub results: Vec<RemoteCard>,
    pub displayed: usize,
    pub buffered: usize,
    pub has_more: bool,
    #[serde(skip)]
    pub trigger: RevealTrigger,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoteOutcome {
    Results(RemoteBatch),
    /// The stream finished without a single valid record.
    NoResults {
        query: String,
        min_ratio: u8,
        min_similarity: f64,
    },
}

pub struct RemoteSearch<E: SearchEndpoint> {
    endpoint: E,
    formatter: ResultFormatter,
    page_size: usize,
    session: Mutex<Option<RemoteSession>>,
    searching: AtomicBool,
    next_id: AtomicU64,
}

impl<E: SearchEndpoint> RemoteSearch<E> {
    pub fn new(endpoint: E, formatter: ResultFormatter, page_size: usize) -> Self {
        Self {
            endpoint,
            formatter,
            page_size: page_size.max(1),
            session: Mutex::new(None),
            searching: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub fn is_searching(&self) -> bool {
        self.searching.load(Ordering::Acquire)
    }

    /// Run a new search. `on_progress` sees capped stream progress and then
    /// `Completed` once the stream ends.
    pub async fn search<F>(
        &self,
        query: RemoteQuery,
        mut on_progress: F,
    ) -> SearchResult<RemoteOutcome>
    where
        F: FnMut(ProgressEvent) + Send,
    {
        let query = RemoteQuery {
            query: query.query.trim().to_string(),
            ..query
        };
        validate_thresholds(&query.query, query.min_ratio, Some(query.min_similarity))?;

        let _searching = SearchGuard::acquire(&self.searching)?;
        let (id, token) = self.start_session(query.clone());
        let guard = SessionGuard::new(self, id);

        if let Err(e) = self.stream_into_session(id, &token, &query, &mut on_progress).await {
            tracing::warn!(query = %query.query, error = %e, "remote search aborted");
            return Err(e);
        }
        guard.disarm();
        on_progress(ProgressEvent::Completed);

        let mut slot = self.session.lock();
        let session = match slot.as_mut() {
            Some(session) if session.id == id => session,
            _ => return Err(SearchError::Cancelled),
        };
        if session.buffer.is_empty() {
            return Ok(RemoteOutcome::NoResults {
                query: query.query,
                min_ratio: query.min_ratio,
                min_similarity: query.min_similarity,
            });
        }
        Ok(RemoteOutcome::Results(self.reveal_from(session)))
    }

    /// Reveal the next page of the current session.
    ///
    /// Returns `None` when the trigger belongs to an older session, a search
    /// is running, or every buffered record is already shown.
    pub fn reveal(&self, trigger: &RevealTrigger) -> Option<RemoteBatch> {
        if !trigger.is_live() || self.is_searching() {
            return None;
        }
        let mut slot = self.session.lock();
        let session = slot.as_mut()?;
        if session.id != trigger.session_id || !session.cursor.can_reveal(session.buffer.len()) {
            return None;
        }
        Some(self.reveal_from(session))
    }

    /// Whether the current session still has records to show.
    pub fn has_more(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .is_some_and(|s| s.cursor.has_more(s.buffer.len()))
    }

    /// Query of the current session, if any.
    pub fn current_query(&self) -> Option<RemoteQuery> {
        self.session.lock().as_ref().map(|s| s.query.clone())
    }

    /// Cancel the current session. An in-flight search returns `Cancelled`.
    pub fn cancel(&self) {
        if let Some(session) = self.session.lock().take() {
            session.token.cancel();
            tracing::debug!(session = session.id, "remote session cancelled");
        }
    }

    fn start_session(&self, query: RemoteQuery) -> (u64, CancellationToken) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let previous = self.session.lock().replace(RemoteSession {
            id,
            query,
            buffer: ResultAccumulator::new(None),
            cursor: RevealCursor::default(),
            token: token.clone(),
        });
        if let Some(previous) = previous {
            previous.token.cancel();
        }
        (id, token)
    }

    fn abort_session(&self, id: u64) {
        let mut slot = self.session.lock();
        if slot.as_ref().is_some_and(|s| s.id == id) {
            if let Some(session) = slot.take() {
                session.token.cancel();
            }
        }
    }

    async fn stream_into_session<F>(
        &self,
        id: u64,
        token: &CancellationToken,
        query: &RemoteQuery,
        on_progress: &mut F,
    ) -> SearchResult<()>
    where
        F: FnMut(ProgressEvent) + Send,
    {
        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(SearchError::Cancelled),
            opened = self.endpoint.open(query) => opened,
        };
        let mut stream = opened.map_err(into_unavailable)?;

        self.with_session(id, |session| {
            session.buffer = ResultAccumulator::new(stream.content_length);
        })?;

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(SearchError::Cancelled),
                next = stream.chunks.next() => next,
            };
            match next {
                Some(Ok(chunk)) => {
                    let event = self.with_session(id, |session| {
                        session.buffer.push_chunk(&chunk);
                        let progress = session.buffer.progress();
                        progress.event(progress.stream_percent())
                    })?;
                    on_progress(event);
                }
                Some(Err(e)) => return Err(into_unavailable(e)),
                None => break,
            }
        }

        let total = self.with_session(id, |session| {
            session.buffer.finish();
            session.cursor.stream_complete = true;
            session.buffer.len()
        })?;
        tracing::info!(query = %query.query, results = total, "remote stream complete");
        Ok(())
    }

    fn with_session<T>(&self, id: u64, f: impl FnOnce(&mut RemoteSession) -> T) -> SearchResult<T> {
        match self.session.lock().as_mut() {
            Some(session) if session.id == id => Ok(f(session)),
            _ => Err(SearchError::Cancelled),
        }
    }

    fn reveal_from(&self, session: &mut RemoteSession) -> RemoteBatch {
        let items = session.cursor.advance(session.buffer.records(), self.page_size);
        let results = items.iter().map(|r| self.formatter.remote_card(r)).collect();
        let buffered = session.buffer.len();
        RemoteBatch {
            results,
            displayed: session.cursor.displayed_count,
            buffered,
            has_more: session.cursor.has_more(buffered),
            trigger: RevealTrigger {
                session_id: session.id,
                token: session.token.clone(),
            },
        }
    }
}

/// Transport and decode failures all surface as `DataUnavailable`.
fn into_unavailable(err: SearchError) -> SearchError {
    match err {
        SearchError::DataUnavailable(_) | SearchError::Cancelled | SearchError::InvalidInput(_) => err,
        other => SearchError::DataUnavailable(other.to_string()),
    }
}
