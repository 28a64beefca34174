use crate::types::{DigestError, FetchConfig, LinkShortener, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

pub const TINYURL_API: &str = "https://tinyurl.com/api-create.php";

/// Shortens links with TinyURL's plain-text creation endpoint.
pub struct TinyUrlShortener {
    client: Client,
    endpoint: String,
}

impl TinyUrlShortener {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: crate::fetcher::http_client(config)?,
            endpoint: TINYURL_API.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn request(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", url)])
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        parse_short_link(&body)
    }
}

fn parse_short_link(body: &str) -> Result<String> {
    let short = body.trim();
    if crate::utils::url::is_valid_feed_url(short) {
        Ok(short.to_string())
    } else {
        Err(DigestError::General(format!("unexpected shortener response: {:.80}", short)))
    }
}

#[async_trait]
impl LinkShortener for TinyUrlShortener {
    async fn shorten(&self, url: &str) -> anyhow::Result<String> {
        let short = self.request(url).await?;
        debug!("Shortened {} to {}", url, short);
        Ok(short)
    }
}
