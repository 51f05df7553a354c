//! Runtime configuration.
//!
//! Every field has a default so a config file only needs the keys it changes.
//! Command-line flags are applied on top by the CLI.

use crate::error::SearchResult;
use crate::links::LinkStyle;
use crate::pagination::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_VIDEO_HOST: &str = "https://www.bilibili.com";
pub const DEFAULT_SHARE_SOURCE: &str = "copy_web";
pub const DEFAULT_DATASET_URL: &str = "https://vvdb.cicada000.work/subtitles.db";
/// Bump to invalidate every cached snapshot.
pub const DEFAULT_DATASET_VERSION: &str = "1.0";
pub const DEFAULT_MIN_RATIO: u8 = 50;
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub page_size: usize,
    pub min_ratio: u8,
    pub min_similarity: f64,
    /// Base URL of the remote endpoint; `/search` is appended.
    pub api_base_url: String,
    pub dataset_url: String,
    pub dataset_version: String,
    /// Overrides the per-user cache directory for downloaded snapshots.
    pub cache_dir: Option<PathBuf>,
    pub links_path: Option<PathBuf>,
    pub video_host: Option<String>,
    /// Share-source marker for local deep links; remote links never carry one.
    pub share_source: Option<String>,
    pub frames_dir: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            min_ratio: DEFAULT_MIN_RATIO,
            min_similarity: DEFAULT_MIN_SIMILARITY,
            api_base_url: "http://127.0.0.1:8000".to_string(),
            dataset_url: DEFAULT_DATASET_URL.to_string(),
            dataset_version: DEFAULT_DATASET_VERSION.to_string(),
            cache_dir: None,
            links_path: None,
            video_host: Some(DEFAULT_VIDEO_HOST.to_string()),
            share_source: Some(DEFAULT_SHARE_SOURCE.to_string()),
            frames_dir: "frames".to_string(),
        }
    }
}

impl SearchConfig {
    pub fn load(path: impl AsRef<Path>) -> SearchResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn local_link_style(&self) -> LinkStyle {
        LinkStyle {
            video_host: self.video_host.clone(),
            share_source: self.share_source.clone(),
        }
    }

    pub fn remote_link_style(&self) -> LinkStyle {
        LinkStyle {
            video_host: self.video_host.clone(),
            share_source: None,
        }
    }
}
