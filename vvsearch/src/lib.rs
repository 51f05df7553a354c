//! vvsearch - search core for a timestamped subtitle corpus
//!
//! Two pipelines share the same result model:
//!
//! - **Local**: a downloaded SQLite snapshot is scored row by row with a
//!   partial-ratio fuzzy matcher, ranked, and shown one fixed page at a time.
//! - **Remote**: a search endpoint streams pre-scored results as NDJSON; the
//!   records are buffered as they arrive and revealed a page at a time.
//!
//! Hits on either side resolve to a deep link into the source video at the
//! moment the line is spoken.

pub mod accumulator;
pub mod config;
pub mod database;
pub mod dataset;
pub mod endpoint;
mod error;
pub mod formatter;
pub mod links;
pub mod local;
pub mod matcher;
pub mod models;
pub mod pagination;
pub mod progress;
pub mod ranking;
pub mod remote;
pub mod session;

pub use config::SearchConfig;
pub use database::{RecordSource, SubtitleDatabase};
pub use dataset::{SnapshotCache, SnapshotSource};
pub use endpoint::{HttpSearchEndpoint, ReplayEndpoint, ResultStream, SearchEndpoint};
pub use error::{SearchError, SearchResult};
pub use formatter::{RemoteCard, ResultCard, ResultFormatter};
pub use links::{EpisodeLinkMap, LinkResolver, LinkStyle};
pub use local::{LocalOutcome, LocalPage, LocalSearch};
pub use matcher::{match_query, partial_ratio, MatchMode, MatchOutcome, QueryMatcher};
pub use models::{RemoteQuery, RemoteResult, ScoredResult, SubtitleRecord};
pub use pagination::{Paginator, RevealCursor, DEFAULT_PAGE_SIZE};
pub use progress::{ByteProgress, ProgressEvent};
pub use remote::{RemoteBatch, RemoteOutcome, RemoteSearch};
pub use session::{LocalSession, RevealTrigger};
