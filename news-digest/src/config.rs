//! Run configuration.
//!
//! [`AppConfig::load`] layers a user TOML file over the embedded
//! [`DEFAULT_CONFIG`]: tables merge key by key, arrays and scalars replace.
//! Credentials come from the environment (`LINE_TOKEN`, `LINE_GROUP_ID`,
//! `LINE_SECRET`) via [`AppConfig::apply_env`].

use chrono::Duration;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::admission::{AdmissionFilter, AdmissionPolicy, ExclusionList, UnparsedTimestamp};
use crate::classifier::{Category, CategoryTable, ClassificationMode};
use crate::digest::{DigestFormatter, OverflowMode};
use crate::pipeline::PipelineOptions;
use crate::push::LineConfig;
use crate::sources::NewsLocale;
use crate::types::{DigestError, FetchConfig, Result};

pub const LINE_TOKEN_ENV: &str = "LINE_TOKEN";
pub const LINE_RECIPIENT_ENV: &str = "LINE_GROUP_ID";
pub const LINE_SECRET_ENV: &str = "LINE_SECRET";

pub const DEFAULT_CONFIG: &str = r#"
[fetch]
user_agent           = "News-Digest/1.0"
timeout_seconds      = 15
max_retries          = 2
retry_delay_seconds  = 2
max_feed_size_mb     = 10
max_redirects        = 5
min_host_interval_ms = 1000

[feeds]
google_news_queries = ["新光金控", "新光人壽", "新光銀行"]
urls                = []
language            = "zh-TW"
country             = "TW"
ceid                = "TW:zh-Hant"

[admission]
max_age_hours                = 24
placeholder_prefixes         = ["Google"]
unparsed_timestamp           = "reject"
exclusions                   = ["保險套"]
country_codes                = ["tw"]
default_admit_unknown_source = false
allowed_sources = [
    "工商時報", "經濟日報", "聯合新聞網", "中時新聞網", "自由時報", "自由財經",
    "鉅亨網", "ETtoday新聞雲", "中央社 CNA", "Yahoo奇摩新聞", "今周刊", "商業周刊",
    "風傳媒", "MoneyDJ理財網", "TVBS新聞網", "三立新聞網", "民視新聞網", "公視新聞網",
    "鏡週刊", "NOWnews今日新聞", "匯流新聞網", "Newtalk新聞", "台視新聞網", "華視新聞網",
]

[classification]
mode           = "title_only"
fallback_label = "📌 其他"

[[classification.categories]]
label    = "📈 業績 / 財報"
keywords = ["財報", "獲利", "盈餘", "收入", "營收"]

[[classification.categories]]
label    = "🏛️ 政策 / 法規"
keywords = ["金管會", "規範", "法令", "監理"]

[[classification.categories]]
label    = "👥 人事異動"
keywords = ["總經理", "董事長", "辭職", "接任", "人事"]

[[classification.categories]]
label    = "📰 媒體評論"
keywords = ["專欄", "分析", "觀點", "評論"]

[enrichment]
summaries         = false
summary_max_chars = 100
shorten_links     = false

[digest]
header              = "📢 新光金控 - 今日新聞摘要（{date}）"
limit               = 5000
overflow            = "continue"
continuation_marker = "…（未完，續下則）"
truncation_marker   = "…（內容過長，以下省略）"
no_news_message     = "📭 今日無相關新聞"
show_source         = true

[line]
endpoint = "https://api.line.me/v2/bot/message/push"

[webhook]
bind           = "0.0.0.0:8000"
reply_endpoint = "https://api.line.me/v2/bot/message/reply"
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub fetch: FetchConfig,
    pub feeds: FeedsConfig,
    pub admission: AdmissionConfig,
    pub classification: ClassificationConfig,
    pub enrichment: EnrichmentConfig,
    pub digest: DigestConfig,
    pub line: LineSettings,
    pub webhook: WebhookConfig,
}

/// `[feeds]`
#[derive(Debug, Clone, Deserialize)]
pub struct FeedsConfig {
    pub google_news_queries: Vec<String>,
    pub urls: Vec<String>,
    pub language: String,
    pub country: String,
    pub ceid: String,
}

/// `[admission]`
#[derive(Debug, Clone, Deserialize)]
pub struct AdmissionConfig {
    pub max_age_hours: i64,
    pub placeholder_prefixes: Vec<String>,
    #[serde(default)]
    pub min_title_chars: Option<usize>,
    pub unparsed_timestamp: UnparsedTimestamp,
    pub exclusions: Vec<String>,
    pub allowed_sources: Vec<String>,
    pub country_codes: Vec<String>,
    pub default_admit_unknown_source: bool,
}

/// `[classification]`
#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationConfig {
    pub mode: ClassificationMode,
    pub fallback_label: String,
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    pub label: String,
    pub keywords: Vec<String>,
}

/// `[enrichment]`
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    pub summaries: bool,
    pub summary_max_chars: usize,
    pub shorten_links: bool,
}

/// `[digest]`
#[derive(Debug, Clone, Deserialize)]
pub struct DigestConfig {
    /// Empty string disables the header line.
    pub header: String,
    pub limit: usize,
    pub overflow: OverflowMode,
    pub continuation_marker: String,
    pub truncation_marker: String,
    pub no_news_message: String,
    pub show_source: bool,
}

/// `[line]`
#[derive(Clone, Deserialize)]
pub struct LineSettings {
    pub endpoint: String,
    #[serde(default)]
    pub channel_token: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    /// Channel secret, only needed by the webhook.
    #[serde(default)]
    pub channel_secret: Option<String>,
}

/// `[webhook]`
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    pub bind: String,
    pub reply_endpoint: String,
}

impl std::fmt::Debug for LineSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineSettings")
            .field("endpoint", &self.endpoint)
            .field("channel_token", &self.channel_token.as_ref().map(|_| "***"))
            .field("recipient", &self.recipient)
            .field("channel_secret", &self.channel_secret.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl AppConfig {
    /// The embedded defaults, without touching the filesystem.
    pub fn defaults() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config must deserialize correctly")
    }

    /// Parse `overrides` as TOML and layer it over the defaults.
    pub fn from_toml_str(overrides: &str) -> Result<Self> {
        let mut base: toml::Table = DEFAULT_CONFIG.parse()?;
        let user: toml::Table = overrides.parse()?;
        merge_tables(&mut base, user);
        let config: AppConfig = toml::Value::Table(base).try_into()?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
            .map_err(|e| DigestError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(LINE_TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.line.channel_token = Some(token);
        }
        if let Some(recipient) = lookup(LINE_RECIPIENT_ENV).filter(|v| !v.trim().is_empty()) {
            self.line.recipient = Some(recipient);
        }
        if let Some(secret) = lookup(LINE_SECRET_ENV).filter(|v| !v.trim().is_empty()) {
            self.line.channel_secret = Some(secret);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.digest.limit == 0 {
            return Err(DigestError::Config("digest.limit must be positive".to_string()));
        }
        if self.admission.max_age_hours <= 0 || Duration::try_hours(self.admission.max_age_hours).is_none() {
            return Err(DigestError::Config(format!(
                "admission.max_age_hours must be a positive number of hours, got {}",
                self.admission.max_age_hours
            )));
        }
        if self.enrichment.summary_max_chars == 0
            && (self.enrichment.summaries || self.classification.mode == ClassificationMode::TwoPhase)
        {
            return Err(DigestError::Config("enrichment.summary_max_chars must be positive".to_string()));
        }

        let mut labels = HashSet::new();
        for category in &self.classification.categories {
            if category.label.trim().is_empty() {
                return Err(DigestError::Config("category label must not be empty".to_string()));
            }
            if !labels.insert(category.label.as_str()) {
                return Err(DigestError::Config(format!("duplicate category label '{}'", category.label)));
            }
        }
        if labels.contains(self.classification.fallback_label.as_str()) {
            return Err(DigestError::Config(format!(
                "fallback label '{}' is also a category label",
                self.classification.fallback_label
            )));
        }

        if let Some(url) = self
            .feeds
            .urls
            .iter()
            .find(|u| !crate::utils::url::is_valid_feed_url(u))
        {
            return Err(DigestError::Config(format!("invalid feed url '{}'", url)));
        }
        Ok(())
    }

    pub fn fetch_config(&self) -> FetchConfig {
        self.fetch.clone()
    }

    pub fn locale(&self) -> NewsLocale {
        NewsLocale {
            language: self.feeds.language.clone(),
            country: self.feeds.country.clone(),
            ceid: self.feeds.ceid.clone(),
        }
    }

    pub fn admission_policy(&self) -> AdmissionPolicy {
        let a = &self.admission;
        AdmissionPolicy {
            max_age: Duration::try_hours(a.max_age_hours).unwrap_or(Duration::MAX),
            placeholder_prefixes: a.placeholder_prefixes.clone(),
            min_title_chars: a.min_title_chars,
            unparsed_timestamp: a.unparsed_timestamp,
            allowed_sources: a.allowed_sources.clone(),
            country_codes: a.country_codes.clone(),
            default_admit_unknown_source: a.default_admit_unknown_source,
        }
    }

    pub fn exclusions(&self) -> ExclusionList {
        ExclusionList::new(self.admission.exclusions.iter().cloned())
    }

    pub fn admission_filter(&self) -> AdmissionFilter {
        AdmissionFilter::new(self.admission_policy(), self.exclusions())
    }

    pub fn category_table(&self) -> CategoryTable {
        let categories = self
            .classification
            .categories
            .iter()
            .map(|c| Category::new(c.label.clone(), &c.keywords))
            .collect();
        CategoryTable::new(categories).with_fallback_label(self.classification.fallback_label.clone())
    }

    pub fn formatter(&self) -> DigestFormatter {
        let d = &self.digest;
        let header = Some(d.header.clone()).filter(|h| !h.trim().is_empty());
        let mut formatter = DigestFormatter::new().with_header(header).with_overflow(d.overflow);
        formatter.continuation_marker = d.continuation_marker.clone();
        formatter.truncation_marker = d.truncation_marker.clone();
        formatter.no_news_message = d.no_news_message.clone();
        formatter.show_source = d.show_source;
        formatter
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            classification: self.classification.mode,
            attach_summaries: self.enrichment.summaries,
            summary_max_chars: self.enrichment.summary_max_chars,
            shorten_links: self.enrichment.shorten_links,
        }
    }

    /// LINE credentials; fails when no channel token is configured.
    pub fn line_config(&self) -> Result<LineConfig> {
        let channel_token = self
            .line
            .channel_token
            .clone()
            .ok_or_else(|| DigestError::Config(format!("no LINE channel token (set {})", LINE_TOKEN_ENV)))?;
        Ok(LineConfig {
            endpoint: self.line.endpoint.clone(),
            channel_token,
        })
    }

    /// Channel secret for verifying webhook signatures.
    pub fn channel_secret(&self) -> Result<String> {
        self.line
            .channel_secret
            .clone()
            .ok_or_else(|| DigestError::Config(format!("no LINE channel secret (set {})", LINE_SECRET_ENV)))
    }
}

fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(override_table)) => {
                merge_tables(base_table, override_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
