use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
// Shared collaborator types live in the interfaces crate
pub use interfaces::defs::{DeliveryStatus, FeedSource, LinkShortener, Pusher, RawItem, Summarizer};

use crate::admission::Rejection;
use crate::digest::CategorizedDigest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
    /// Minimum spacing between two requests to the same host.
    pub min_host_interval_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "News-Digest/1.0".to_string(),
            timeout_seconds: 15,
            max_retries: 2,
            retry_delay_seconds: 2,
            max_feed_size_mb: 10,
            max_redirects: 5,
            min_host_interval_ms: 1000,
        }
    }
}

/// A raw item that passed admission and was given a category.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmittedItem {
    pub item: RawItem,
    pub category: String,
    pub summary: Option<String>,
    pub short_link: Option<String>,
}

impl AdmittedItem {
    pub fn new(item: RawItem, category: impl Into<String>) -> Self {
        Self {
            item,
            category: category.into(),
            summary: None,
            short_link: None,
        }
    }

    pub fn with_summary(mut self, summary: Option<String>) -> Self {
        self.summary = summary;
        self
    }

    pub fn with_short_link(mut self, short_link: Option<String>) -> Self {
        self.short_link = short_link;
        self
    }

    /// Short link when one was produced, otherwise the original link.
    pub fn display_link(&self) -> &str {
        self.short_link.as_deref().unwrap_or(&self.item.link)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Ok,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source_name: String,
    pub url: String,
    pub status: SourceStatus,
    pub entries_found: usize,
    pub admitted: usize,
}

/// Everything a single pipeline run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub digest: CategorizedDigest,
    pub sources: Vec<SourceReport>,
    pub rejections: BTreeMap<&'static str, usize>,
}

impl RunReport {
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| s.status != SourceStatus::Ok)
    }

    pub fn total_entries(&self) -> usize {
        self.sources.iter().map(|s| s.entries_found).sum()
    }

    pub(crate) fn record_rejection(&mut self, rejection: &Rejection) {
        *self.rejections.entry(rejection.kind()).or_insert(0) += 1;
    }
}

#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub message_index: usize,
    pub recipient: String,
    pub status: DeliveryStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("General error: {0}")]
    General(String),
}

impl From<toml::de::Error> for DigestError {
    fn from(e: toml::de::Error) -> Self {
        DigestError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DigestError>;
