//! Deep-link resolution: turns a subtitle hit into a playback URL at the
//! moment the line is spoken.
//!
//! The link map file is a JSON object keyed by video URL (or URL path) whose
//! values identify an episode, either by number ("7") or by source filename.
//! Lookups go the other way, so an inverse index is built once on load. When
//! two keys share a value the first one in the file wins.

use crate::error::{SearchError, SearchResult};
use crate::models::{RemoteResult, ScoredResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

static EPISODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"P(\d+)").expect("valid episode regex"));

static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:(\d+)[m:])?(\d+)s?\s*$").expect("valid timestamp regex")
});

// ─────────────────────────────────────────────────────────────────────────────
// PARSING
// ─────────────────────────────────────────────────────────────────────────────

/// Episode number from a title or filename such as `"[P07] foo"`, without
/// leading zeros. An all-zero number yields `None`.
pub fn episode_number(label: &str) -> Option<String> {
    let digits = EPISODE_RE.captures(label)?.get(1)?.as_str();
    let trimmed = digits.trim_start_matches('0');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Elapsed seconds for `"5m30s"`, `"5:30"`, `"330"` or `"330s"`.
pub fn timestamp_seconds(timestamp: &str) -> Option<u64> {
    let caps = TIMESTAMP_RE.captures(timestamp)?;
    let minutes: u64 = match caps.get(1) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    let seconds: u64 = caps.get(2)?.as_str().parse().ok()?;
    minutes.checked_mul(60)?.checked_add(seconds)
}

// ─────────────────────────────────────────────────────────────────────────────
// LINK MAP
// ─────────────────────────────────────────────────────────────────────────────

/// Read-only episode → URL index built from a URL → episode JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeLinkMap {
    by_episode: HashMap<String, String>,
}

impl EpisodeLinkMap {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut by_episode = HashMap::new();
        for (url, episode) in pairs {
            by_episode.entry(episode.into()).or_insert_with(|| url.into());
        }
        Self { by_episode }
    }

    /// Parse the JSON object form. Non-string values never match and are skipped.
    pub fn from_json_str(json: &str) -> SearchResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let serde_json::Value::Object(entries) = value else {
            return Err(SearchError::InvalidInput("link map must be a JSON object".into()));
        };
        let pairs = entries.into_iter().filter_map(|(url, episode)| match episode {
            serde_json::Value::String(episode) => Some((url, episode)),
            other => {
                tracing::debug!(%url, value = %other, "skipping non-string link map value");
                None
            }
        });
        Ok(Self::from_pairs(pairs))
    }

    pub fn load(path: impl AsRef<Path>) -> SearchResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Like `load`, but a missing or unreadable file yields an empty map.
    /// Every result then renders without a link.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::load(path).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), error = %err, "link map unavailable, links disabled");
            Self::default()
        })
    }

    pub fn url_for(&self, episode: &str) -> Option<&str> {
        self.by_episode.get(episode).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_episode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_episode.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RESOLUTION
// ─────────────────────────────────────────────────────────────────────────────

/// Anything that can be turned into a deep link.
pub trait LinkTarget {
    /// Title or filename carrying the `P<digits>` episode tag.
    fn episode_label(&self) -> &str;
    fn timestamp(&self) -> &str;
    /// Link map value to look up once the episode number is known.
    fn map_key<'a>(&'a self, episode: &'a str) -> &'a str;
}

impl LinkTarget for ScoredResult {
    fn episode_label(&self) -> &str {
        &self.episode_title
    }

    fn timestamp(&self) -> &str {
        &self.timestamp
    }

    fn map_key<'a>(&'a self, episode: &'a str) -> &'a str {
        episode
    }
}

impl LinkTarget for RemoteResult {
    fn episode_label(&self) -> &str {
        &self.filename
    }

    fn timestamp(&self) -> &str {
        &self.timestamp
    }

    fn map_key<'a>(&'a self, _episode: &'a str) -> &'a str {
        &self.filename
    }
}

/// How a mapped URL becomes a deep link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStyle {
    /// Prefixed to map keys that are bare paths (start with `/`).
    pub video_host: Option<String>,
    /// Emitted as `share_source=<marker>` before the time offset.
    pub share_source: Option<String>,
}

impl LinkStyle {
    pub fn local() -> Self {
        Self {
            video_host: Some(crate::config::DEFAULT_VIDEO_HOST.to_string()),
            share_source: Some(crate::config::DEFAULT_SHARE_SOURCE.to_string()),
        }
    }

    pub fn remote() -> Self {
        Self {
            video_host: Some(crate::config::DEFAULT_VIDEO_HOST.to_string()),
            share_source: None,
        }
    }

    /// Appends the time offset to the query string. A `#fragment` on the
    /// mapped URL stays at the end.
    pub fn deep_link(&self, url: &str, seconds: u64) -> String {
        let (base, fragment) = match url.split_once('#') {
            Some((base, fragment)) => (base, Some(fragment)),
            None => (url, None),
        };
        let mut link = match &self.video_host {
            Some(host) if base.starts_with('/') => {
                format!("{}{}", host.trim_end_matches('/'), base)
            }
            _ => base.to_string(),
        };
        link.push(if link.contains('?') { '&' } else { '?' });
        if let Some(marker) = &self.share_source {
            link.push_str("share_source=");
            link.push_str(marker);
            link.push('&');
        }
        link.push_str(&format!("t={seconds}"));
        if let Some(fragment) = fragment {
            link.push('#');
            link.push_str(fragment);
        }
        link
    }
}

/// Resolves results against a link map. `None` means "render without a link".
#[derive(Debug, Clone)]
pub struct LinkResolver {
    map: std::sync::Arc<EpisodeLinkMap>,
    style: LinkStyle,
}

impl LinkResolver {
    pub fn new(map: std::sync::Arc<EpisodeLinkMap>, style: LinkStyle) -> Self {
        Self { map, style }
    }

    pub fn style(&self) -> &LinkStyle {
        &self.style
    }

    pub fn resolve_link<R: LinkTarget>(&self, result: &R) -> Option<String> {
        let episode = episode_number(result.episode_label())?;
        let seconds = timestamp_seconds(result.timestamp())?;
        let url = self.map.url_for(result.map_key(&episode))?;
        Some(self.style.deep_link(url, seconds))
    }
}
