//! Display fields for result cards.
//!
//! The renderer gets finished strings plus an optional link; a card without a
//! link is shown but not clickable.

use crate::links::{episode_number, timestamp_seconds, LinkResolver};
use crate::models::{RemoteResult, ScoredResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static FILENAME_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[P(\d+)\].*?\s+").expect("valid filename tag regex"));

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"P\d+").expect("valid tag regex"));

/// A local search hit ready to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultCard {
    pub episode_title: String,
    pub timestamp: String,
    pub text: String,
    /// e.g. `"87.5%"`
    pub match_label: String,
    pub exact_match: bool,
    pub link: Option<String>,
}

/// A remote search hit ready to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteCard {
    /// e.g. `"P07"`
    pub episode_tag: Option<String>,
    pub title: String,
    pub text: String,
    pub timestamp: String,
    pub match_label: String,
    pub similarity_label: String,
    /// Relative path of the frame captured at the timestamp.
    pub preview_frame: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResultFormatter {
    resolver: LinkResolver,
    frames_dir: String,
}

impl ResultFormatter {
    pub fn new(resolver: LinkResolver, frames_dir: impl Into<String>) -> Self {
        Self {
            resolver,
            frames_dir: frames_dir.into(),
        }
    }

    pub fn resolver(&self) -> &LinkResolver {
        &self.resolver
    }

    pub fn local_card(&self, result: &ScoredResult) -> ResultCard {
        ResultCard {
            episode_title: result.episode_title.clone(),
            timestamp: result.timestamp.clone(),
            text: result.text.clone(),
            match_label: percent_label(result.match_ratio),
            exact_match: result.exact_match,
            link: self.resolver.resolve_link(result),
        }
    }

    pub fn remote_card(&self, result: &RemoteResult) -> RemoteCard {
        let (episode_tag, title) = split_filename(&result.filename);
        RemoteCard {
            episode_tag,
            title,
            text: result.text.clone(),
            timestamp: result.timestamp.clone(),
            match_label: percent_label(result.match_ratio),
            similarity_label: percent_label(result.similarity * 100.0),
            preview_frame: self.preview_frame(result),
            link: self.resolver.resolve_link(result),
        }
    }

    fn preview_frame(&self, result: &RemoteResult) -> Option<String> {
        let episode = episode_number(&result.filename)?;
        let seconds = timestamp_seconds(&result.timestamp)?;
        Some(format!(
            "{}/{}/frame_{}.webp",
            self.frames_dir.trim_end_matches('/'),
            episode,
            seconds
        ))
    }
}

fn percent_label(value: f64) -> String {
    format!("{value:.1}%")
}

/// `"[P07] 123 title.json"` → `(Some("P07"), "title")`.
///
/// Everything between the bracketed tag and the next whitespace run is
/// dropped, along with a `.json` suffix.
pub fn split_filename(filename: &str) -> (Option<String>, String) {
    let retagged = FILENAME_TAG_RE.replace(filename, "P${1} ");
    let cleaned = retagged.strip_suffix(".json").unwrap_or(&retagged).trim();

    match TAG_RE.find(cleaned) {
        Some(tag) => {
            let title = format!("{}{}", &cleaned[..tag.start()], &cleaned[tag.end()..]);
            (Some(tag.as_str().to_string()), title.trim().to_string())
        }
        None => (None, cleaned.to_string()),
    }
}
