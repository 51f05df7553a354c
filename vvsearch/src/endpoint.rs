//! Remote search endpoint.
//!
//! The endpoint answers `GET {base}/search?query=&min_ratio=&min_similarity=`
//! with an NDJSON body of pre-scored, pre-ordered results. The transport is
//! behind `SearchEndpoint` so the orchestrator can be driven by any byte
//! stream.

use crate::error::{SearchError, SearchResult};
use crate::models::RemoteQuery;
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use parking_lot::Mutex;
use std::time::Duration;
use url::Url;

/// An open result stream: raw body chunks plus the declared body length.
pub struct ResultStream {
    pub content_length: Option<u64>,
    pub chunks: BoxStream<'static, SearchResult<Vec<u8>>>,
}

#[async_trait]
pub trait SearchEndpoint: Send + Sync {
    /// Issue the request and return once the response head is available.
    async fn open(&self, query: &RemoteQuery) -> SearchResult<ResultStream>;
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP
// ─────────────────────────────────────────────────────────────────────────────

pub struct HttpSearchEndpoint {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchEndpoint {
    pub fn new(base_url: impl Into<String>) -> SearchResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Query values are percent-encoded; thresholds are sent as given.
    pub fn search_url(&self, query: &RemoteQuery) -> SearchResult<Url> {
        let raw = format!("{}/search", self.base_url.trim_end_matches('/'));
        let mut url = Url::parse(&raw)
            .map_err(|e| SearchError::InvalidInput(format!("invalid endpoint url {raw:?}: {e}")))?;
        url.query_pairs_mut()
            .append_pair("query", &query.query)
            .append_pair("min_ratio", &query.min_ratio.to_string())
            .append_pair("min_similarity", &query.min_similarity.to_string());
        Ok(url)
    }
}

#[async_trait]
impl SearchEndpoint for HttpSearchEndpoint {
    async fn open(&self, query: &RemoteQuery) -> SearchResult<ResultStream> {
        let url = self.search_url(query)?;
        tracing::debug!(%url, "opening result stream");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::DataUnavailable(format!(
                "search endpoint returned HTTP {status}"
            )));
        }

        let content_length = response.content_length();
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(SearchError::from))
            .boxed();
        Ok(ResultStream { content_length, chunks })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// REPLAY
// ─────────────────────────────────────────────────────────────────────────────

/// Serves a fixed body as a series of chunks, for offline runs and tests.
pub struct ReplayEndpoint {
    chunks: Vec<Vec<u8>>,
    declare_length: bool,
    fail_after: Option<usize>,
    last_query: Mutex<Option<RemoteQuery>>,
}

impl ReplayEndpoint {
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            declare_length: true,
            fail_after: None,
            last_query: Mutex::new(None),
        }
    }

    /// Split `body` into chunks of at most `chunk_size` bytes.
    pub fn from_body(body: &[u8], chunk_size: usize) -> Self {
        Self::new(body.chunks(chunk_size.max(1)).map(<[u8]>::to_vec).collect())
    }

    /// Omit the content length, as a chunked response would.
    pub fn without_length(mut self) -> Self {
        self.declare_length = false;
        self
    }

    /// Break the stream after `n` chunks.
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn last_query(&self) -> Option<RemoteQuery> {
        self.last_query.lock().clone()
    }
}

#[async_trait]
impl SearchEndpoint for ReplayEndpoint {
    async fn open(&self, query: &RemoteQuery) -> SearchResult<ResultStream> {
        *self.last_query.lock() = Some(query.clone());

        let content_length = self
            .declare_length
            .then(|| self.chunks.iter().map(|c| c.len() as u64).sum());

        let mut items: Vec<SearchResult<Vec<u8>>> = Vec::with_capacity(self.chunks.len() + 1);
        for (i, chunk) in self.chunks.iter().enumerate() {
            if self.fail_after == Some(i) {
                break;
            }
            items.push(Ok(chunk.clone()));
        }
        if self.fail_after.is_some_and(|n| n <= self.chunks.len()) {
            items.push(Err(SearchError::DataUnavailable("connection reset".into())));
        }

        Ok(ResultStream {
            content_length,
            chunks: stream::iter(items).boxed(),
        })
    }
}
