use crate::parser::FeedParser;
use crate::sources::RssFeedSource;
use crate::types::{FeedSource, RawItem};
use crate::Fetcher;
use async_trait::async_trait;
use url::Url;

pub const GOOGLE_NEWS_SEARCH: &str = "https://news.google.com/rss/search";

/// Google News keyword search, localized through the `hl`/`gl`/`ceid`
/// parameters. Entry titles end in `" - Outlet"`, which becomes the source name.
pub struct GoogleNewsSource {
    query: String,
    inner: RssFeedSource,
}

#[derive(Debug, Clone)]
pub struct NewsLocale {
    pub language: String,
    pub country: String,
    pub ceid: String,
}

impl Default for NewsLocale {
    fn default() -> Self {
        Self {
            language: "zh-TW".to_string(),
            country: "TW".to_string(),
            ceid: "TW:zh-Hant".to_string(),
        }
    }
}

impl GoogleNewsSource {
    pub fn new(query: &str, locale: &NewsLocale, fetcher: Fetcher) -> crate::types::Result<Self> {
        let url = search_url(query, locale)?;
        let inner = RssFeedSource::new(url, fetcher)
            .with_title(Some(format!("Google News: {}", query)))
            .with_parser(FeedParser::new().with_outlet_from_title(true));
        Ok(Self { query: query.to_string(), inner })
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

pub fn search_url(query: &str, locale: &NewsLocale) -> crate::types::Result<String> {
    let url = Url::parse_with_params(
        GOOGLE_NEWS_SEARCH,
        &[
            ("q", query),
            ("hl", locale.language.as_str()),
            ("gl", locale.country.as_str()),
            ("ceid", locale.ceid.as_str()),
        ],
    )?;
    Ok(url.to_string())
}

#[async_trait]
impl FeedSource for GoogleNewsSource {
    fn source_name(&self) -> String {
        self.inner.source_name()
    }

    fn url(&self) -> &str {
        self.inner.url()
    }

    async fn fetch(&self) -> anyhow::Result<Vec<RawItem>> {
        self.inner.fetch().await
    }
}
