use crate::types::{DigestError, FetchConfig, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, Response};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Build the HTTP client every outbound collaborator shares settings with.
pub fn http_client(config: &FetchConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_seconds))
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .build()?;
    Ok(client)
}

#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    rate_limiter: Arc<Mutex<HashMap<String, Instant>>>,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(&config)?,
            config,
            rate_limiter: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch a feed body, retrying transient failures with exponential backoff.
    pub async fn fetch_feed(&self, url: &str) -> Result<String> {
        let start_time = Instant::now();
        debug!("Fetching feed: {}", url);

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 32),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.retry_delay_seconds * 60)),
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.get(url).await.and_then(|r| self.check_status(r)) {
                Ok(response) => {
                    if let Some(content_length) = response.content_length() {
                        let size_mb = content_length as usize / (1024 * 1024);
                        if size_mb > self.config.max_feed_size_mb {
                            return Err(DigestError::FeedTooLarge { size_mb });
                        }
                    }

                    match response.text().await {
                        Ok(content) => {
                            info!(
                                "Fetched feed: {} ({} bytes, {}ms)",
                                url,
                                content.len(),
                                start_time.elapsed().as_millis()
                            );
                            return Ok(content);
                        }
                        Err(e) => last_error = Some(DigestError::Http(e)),
                    }
                }
                Err(e) => last_error = Some(e),
            }

            if attempt < self.config.max_retries {
                if let Some(delay) = backoff.next_backoff() {
                    warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, url, delay);
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }
            break;
        }

        Err(last_error.unwrap_or_else(|| DigestError::General(format!("failed to fetch {}", url))))
    }

    /// Single attempt fetch of an article page.
    pub async fn fetch_full_content(&self, url: &str) -> Result<String> {
        debug!("Fetching full content from: {}", url);
        let response = self.get(url).await.and_then(|r| self.check_status(r))?;
        Ok(response.text().await?)
    }

    async fn get(&self, url: &str) -> Result<Response> {
        self.apply_rate_limit(url).await?;
        Ok(self.client.get(url).send().await?)
    }

    fn check_status(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::General(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }
        Ok(response)
    }

    /// Reserve the next request slot for the URL's host, then wait for it
    /// outside the lock so other hosts are not held up.
    async fn apply_rate_limit(&self, url: &str) -> Result<()> {
        let parsed_url = Url::parse(url)?;
        let host = parsed_url.host_str().unwrap_or("").to_string();
        let min_interval = Duration::from_millis(self.config.min_host_interval_ms);

        let wait_time = {
            let mut rate_limiter = self.rate_limiter.lock().await;
            let now = Instant::now();
            let slot = match rate_limiter.get(&host) {
                Some(&last_slot) => (last_slot + min_interval).max(now),
                None => now,
            };
            rate_limiter.insert(host.clone(), slot);
            slot - now
        };

        if !wait_time.is_zero() {
            debug!("Rate limiting {}: waiting {:?}", host, wait_time);
            tokio::time::sleep(wait_time).await;
        }
        Ok(())
    }
}
