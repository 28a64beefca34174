use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub const UNKNOWN_SOURCE: &str = "unknown source";

/// One entry pulled from a feed, before any filtering.
#[derive(Clone, Debug, PartialEq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    /// `None` when the feed omitted the date or it could not be parsed.
    pub published_at: Option<DateTime<Utc>>,
    pub source_name: Option<String>,
    /// Description carried by the feed itself, as plain text.
    pub summary: Option<String>,
}

impl RawItem {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            published_at: None,
            source_name: None,
            summary: None,
        }
    }

    pub fn published(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn from_source(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn source_name(&self) -> &str {
        self.source_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(UNKNOWN_SOURCE)
    }

    pub fn has_known_source(&self) -> bool {
        self.source_name() != UNKNOWN_SOURCE
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered { http_status: u16 },
    Failed { http_status: Option<u16>, reason: String },
}

impl DeliveryStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered { .. })
    }
}

// Object style note:
// Implementations of these traits are handed to a pipeline run as trait
// objects. A run is short lived and owns all of its mutable state, so the
// collaborators themselves only hold configuration and clients.

/// Anything that can produce raw entries for a run (an RSS feed, a search).
#[async_trait]
pub trait FeedSource: Send + Sync {
    fn source_name(&self) -> String;

    fn url(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<RawItem>>;
}

/// Produces a short plain-text excerpt of the page behind `url`.
/// Failures are folded into `None`, never raised.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, url: &str, max_chars: usize) -> Option<String>;
}

#[async_trait]
pub trait LinkShortener: Send + Sync {
    async fn shorten(&self, url: &str) -> Result<String>;
}

/// Delivers a finished message to a chat recipient.
#[async_trait]
pub trait Pusher: Send + Sync {
    async fn push(&self, message: &str, recipient: &str) -> DeliveryStatus;
}
