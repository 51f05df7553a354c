//! Session bookkeeping shared by the local and remote orchestrators.
//!
//! Only one search runs at a time per orchestrator. `SearchGuard` holds the
//! `is_searching` flag for the lifetime of a search and clears it on every
//! exit path, including errors and a dropped future.

use crate::error::{SearchError, SearchResult};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

/// RAII holder of the single-flight flag.
pub(crate) struct SearchGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SearchGuard<'a> {
    /// Fails with `SearchInProgress` if another search holds the flag.
    pub(crate) fn acquire(flag: &'a AtomicBool) -> SearchResult<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            return Err(SearchError::SearchInProgress);
        }
        Ok(Self { flag })
    }
}

impl Drop for SearchGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// RAII guard that cancels a token when dropped, unless disarmed.
/// Dropping a search future mid-flight drops this guard, which cancels the
/// session and stops any blocking work checking the token.
pub(crate) struct DropGuard {
    token: Option<CancellationToken>,
}

impl DropGuard {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token: Some(token) }
    }

    /// Keep the token alive past this guard.
    pub(crate) fn disarm(mut self) {
        self.token = None;
    }
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }
}

/// Snapshot of the local session, for navigation controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSession {
    pub query: String,
    pub min_ratio: u8,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_results: usize,
}

impl LocalSession {
    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// Controls are hidden for a single page of results.
    pub fn shows_pagination(&self) -> bool {
        self.total_pages > 1
    }
}

/// Handle passed to the scroll trigger of one remote session.
///
/// It goes stale as soon as another session starts or the session is
/// cancelled; reveals through a stale trigger do nothing.
#[derive(Debug, Clone)]
pub struct RevealTrigger {
    pub(crate) session_id: u64,
    pub(crate) token: CancellationToken,
}

impl RevealTrigger {
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn is_live(&self) -> bool {
        !self.token.is_cancelled()
    }
}
