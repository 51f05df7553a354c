//! Error type shared by both search pipelines.

use thiserror::Error;

/// Errors surfaced by vvsearch operations.
///
/// Malformed NDJSON lines, empty result sets and unresolvable links are not
/// errors: they are logged, reported as `NoResults`, or rendered without a link.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Dataset or result stream could not be fetched. Not retried automatically.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Page {requested} is outside 1..={total}")]
    PageOutOfRange { requested: usize, total: usize },
    #[error("A search is already in progress")]
    SearchInProgress,
    #[error("Operation cancelled")]
    Cancelled,
}

pub type SearchResult<T> = Result<T, SearchError>;

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::DataUnavailable(err.to_string())
    }
}
