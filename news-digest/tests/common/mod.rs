#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use news_digest::{DeliveryStatus, FeedSource, LinkShortener, Pusher, RawItem, Summarizer};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-03-10T08:00:00Z").unwrap().with_timezone(&Utc)
}

/// An item from an allow-listed outlet published `hours_ago` before [`now`].
pub fn fresh(title: &str, id: usize, hours_ago: i64, outlet: &str) -> RawItem {
    RawItem::new(title, format!("https://news.example.com/articles/{}", id))
        .published(now() - Duration::hours(hours_ago))
        .from_source(outlet)
}

pub struct StaticSource {
    pub name: String,
    pub url: String,
    pub items: Vec<RawItem>,
}

impl StaticSource {
    pub fn boxed(name: &str, items: Vec<RawItem>) -> Box<dyn FeedSource> {
        Box::new(Self {
            name: name.to_string(),
            url: format!("https://feeds.example.com/{}", name),
            items,
        })
    }
}

#[async_trait]
impl FeedSource for StaticSource {
    fn source_name(&self) -> String {
        self.name.clone()
    }

    fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> anyhow::Result<Vec<RawItem>> {
        Ok(self.items.clone())
    }
}

pub struct FailingSource;

#[async_trait]
impl FeedSource for FailingSource {
    fn source_name(&self) -> String {
        "broken".to_string()
    }

    fn url(&self) -> &str {
        "https://feeds.example.com/broken"
    }

    async fn fetch(&self) -> anyhow::Result<Vec<RawItem>> {
        anyhow::bail!("connection reset")
    }
}

/// Summaries keyed by article link. `calls` is shared so a test can keep
/// a handle after boxing the summarizer into a pipeline.
#[derive(Default)]
pub struct FakeSummarizer {
    pub summaries: HashMap<String, String>,
    pub calls: Arc<AtomicUsize>,
}

impl FakeSummarizer {
    pub fn with(link: &str, summary: &str) -> Self {
        let mut summaries = HashMap::new();
        summaries.insert(link.to_string(), summary.to_string());
        Self { summaries, calls: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, url: &str, max_chars: usize) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.summaries.get(url).map(|s| s.chars().take(max_chars).collect())
    }
}

pub struct FakeShortener {
    pub fail: bool,
}

#[async_trait]
impl LinkShortener for FakeShortener {
    async fn shorten(&self, url: &str) -> anyhow::Result<String> {
        if self.fail {
            anyhow::bail!("shortener unavailable");
        }
        let id = url.rsplit('/').next().unwrap_or_default();
        Ok(format!("https://tinyurl.com/{}", id))
    }
}

/// Records every push; the message at `fail_at` is refused.
#[derive(Default)]
pub struct RecordingPusher {
    pub fail_at: Option<usize>,
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Pusher for RecordingPusher {
    async fn push(&self, message: &str, recipient: &str) -> DeliveryStatus {
        let mut sent = self.sent.lock().unwrap();
        let index = sent.len();
        sent.push((recipient.to_string(), message.to_string()));
        if Some(index) == self.fail_at {
            DeliveryStatus::Failed { http_status: Some(429), reason: "rate limited".to_string() }
        } else {
            DeliveryStatus::Delivered { http_status: 200 }
        }
    }
}
