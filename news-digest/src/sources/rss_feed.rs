use crate::parser::FeedParser;
use crate::types::{DigestError, FeedSource, RawItem};
use crate::Fetcher;
use async_trait::async_trait;
use tracing::{info, warn};

/// Generic RSS/Atom feed source
pub struct RssFeedSource {
    pub url: String,
    pub title: Option<String>,
    fetcher: Fetcher,
    parser: FeedParser,
}

impl RssFeedSource {
    /// `fetcher` is cloned per source; clones share one rate limiter.
    pub fn new(url: String, fetcher: Fetcher) -> Self {
        Self {
            url,
            title: None,
            fetcher,
            parser: FeedParser::new(),
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_parser(mut self, parser: FeedParser) -> Self {
        self.parser = parser;
        self
    }

    pub async fn pull(&self) -> crate::types::Result<Vec<RawItem>> {
        info!("Pulling RSS feed: {}", self.url);

        let content = self.fetcher.fetch_feed(&self.url).await?;
        if !FeedParser::is_valid_feed_content(&content) {
            warn!("Response from {} does not look like a feed", self.url);
            return Err(DigestError::Parse(format!("{} did not return RSS or Atom", self.url)));
        }

        let parsed = self.parser.parse_feed(&content)?;
        info!("Pulled {} items from RSS feed {}", parsed.entries.len(), self.url);
        Ok(parsed.entries)
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    fn source_name(&self) -> String {
        self.title.clone().unwrap_or_else(|| {
            // Extract domain name from URL as fallback
            match crate::utils::url::extract_host(&self.url) {
                Some(host) => format!("RSS Feed ({})", host),
                None => "RSS Feed".to_string(),
            }
        })
    }

    fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> anyhow::Result<Vec<RawItem>> {
        Ok(self.pull().await?)
    }
}
