//! Per-item admission gates.
//!
//! Gates run cheapest first and stop at the first refusal:
//! title sanity, freshness, exclusion terms, source locale, duplicates.
//! Only an admitted item's normalized title is added to the run's
//! [`SeenTitleSet`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dedup::SeenTitleSet;
use crate::normalizer::{normalize, NormalizedTitle};
use crate::types::RawItem;
use crate::utils;

/// What to do with an item whose publish time is missing or unparsable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnparsedTimestamp {
    /// Drop the item.
    #[default]
    Reject,
    /// Skip only the freshness gate and keep evaluating.
    SkipCheck,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("title is empty")]
    EmptyTitle,
    #[error("title is a feed placeholder (prefix '{0}')")]
    Placeholder(String),
    #[error("title shorter than {min} chars")]
    TooShort { min: usize },
    #[error("published {age_hours}h ago, older than {max_hours}h")]
    Stale { age_hours: i64, max_hours: i64 },
    #[error("publish time missing or unparsable")]
    MissingTimestamp,
    #[error("title contains excluded term '{0}'")]
    Excluded(String),
    #[error("source '{0}' is not recognized")]
    UnrecognizedSource(String),
    #[error("already admitted")]
    Duplicate,
    #[error("near duplicate of '{0}'")]
    NearDuplicate(String),
}

impl Rejection {
    /// Stable key for counting rejections by reason.
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::EmptyTitle => "empty_title",
            Rejection::Placeholder(_) => "placeholder",
            Rejection::TooShort { .. } => "too_short",
            Rejection::Stale { .. } => "stale",
            Rejection::MissingTimestamp => "missing_timestamp",
            Rejection::Excluded(_) => "excluded",
            Rejection::UnrecognizedSource(_) => "unrecognized_source",
            Rejection::Duplicate => "duplicate",
            Rejection::NearDuplicate(_) => "near_duplicate",
        }
    }
}

/// Blacklisted substrings matched against the raw title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionList {
    terms: Vec<String>,
}

impl ExclusionList {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms
                .into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.is_empty())
                .collect(),
        }
    }

    pub fn push(&mut self, term: impl Into<String>) {
        let term = term.into();
        if !term.is_empty() && !self.terms.contains(&term) {
            self.terms.push(term);
        }
    }

    pub fn matching_term(&self, title: &str) -> Option<&str> {
        self.terms.iter().find(|t| title.contains(t.as_str())).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    pub max_age: Duration,
    pub placeholder_prefixes: Vec<String>,
    pub min_title_chars: Option<usize>,
    pub unparsed_timestamp: UnparsedTimestamp,
    pub allowed_sources: Vec<String>,
    /// Country-code TLDs (without the dot) that mark a link as local.
    pub country_codes: Vec<String>,
    pub default_admit_unknown_source: bool,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::hours(24),
            placeholder_prefixes: vec!["Google".to_string()],
            min_title_chars: None,
            unparsed_timestamp: UnparsedTimestamp::Reject,
            allowed_sources: Vec::new(),
            country_codes: Vec::new(),
            default_admit_unknown_source: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdmissionFilter {
    policy: AdmissionPolicy,
    exclusions: ExclusionList,
}

impl AdmissionFilter {
    pub fn new(policy: AdmissionPolicy, exclusions: ExclusionList) -> Self {
        Self { policy, exclusions }
    }

    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    pub fn exclusions(&self) -> &ExclusionList {
        &self.exclusions
    }

    /// Run every gate; on success the normalized title is recorded in `seen`.
    pub fn admit(
        &self,
        item: &RawItem,
        now: DateTime<Utc>,
        seen: &mut SeenTitleSet,
    ) -> Result<NormalizedTitle, Rejection> {
        let normalized = self.check_title(item)?;
        self.check_freshness(item, now)?;
        self.check_exclusions(item)?;
        self.check_source(item)?;
        Self::check_duplicate(&normalized, seen)?;

        debug!("Admitted '{}' from {}", item.title, item.source_name());
        seen.insert(normalized.clone());
        Ok(normalized)
    }

    fn check_title(&self, item: &RawItem) -> Result<NormalizedTitle, Rejection> {
        let title = item.title.trim();
        if title.is_empty() {
            return Err(Rejection::EmptyTitle);
        }
        if let Some(prefix) = self
            .policy
            .placeholder_prefixes
            .iter()
            .find(|p| !p.is_empty() && title.starts_with(p.as_str()))
        {
            return Err(Rejection::Placeholder(prefix.clone()));
        }
        if let Some(min) = self.policy.min_title_chars {
            if title.chars().count() < min {
                return Err(Rejection::TooShort { min });
            }
        }
        let normalized = normalize(title);
        if normalized.is_empty() {
            return Err(Rejection::EmptyTitle);
        }
        Ok(normalized)
    }

    fn check_freshness(&self, item: &RawItem, now: DateTime<Utc>) -> Result<(), Rejection> {
        match item.published_at {
            Some(published) => {
                let age = now.signed_duration_since(published);
                if age > self.policy.max_age {
                    return Err(Rejection::Stale {
                        age_hours: age.num_hours(),
                        max_hours: self.policy.max_age.num_hours(),
                    });
                }
                Ok(())
            }
            None => match self.policy.unparsed_timestamp {
                UnparsedTimestamp::Reject => Err(Rejection::MissingTimestamp),
                UnparsedTimestamp::SkipCheck => Ok(()),
            },
        }
    }

    fn check_exclusions(&self, item: &RawItem) -> Result<(), Rejection> {
        match self.exclusions.matching_term(&item.title) {
            Some(term) => Err(Rejection::Excluded(term.to_string())),
            None => Ok(()),
        }
    }

    fn check_source(&self, item: &RawItem) -> Result<(), Rejection> {
        let policy = &self.policy;
        let source = item.source_name();

        if item.has_known_source()
            && policy.allowed_sources.iter().any(|s| s.trim() == source.trim())
        {
            return Ok(());
        }
        if utils::url::has_country_code(&item.link, &policy.country_codes) {
            return Ok(());
        }

        let nothing_to_check = policy.allowed_sources.is_empty() && policy.country_codes.is_empty();
        let no_signal = !item.has_known_source() || nothing_to_check;
        if no_signal && policy.default_admit_unknown_source {
            return Ok(());
        }
        Err(Rejection::UnrecognizedSource(source.to_string()))
    }

    fn check_duplicate(normalized: &NormalizedTitle, seen: &SeenTitleSet) -> Result<(), Rejection> {
        if seen.contains(normalized) {
            return Err(Rejection::Duplicate);
        }
        match seen.find_similar(normalized) {
            Some((known, _)) => Err(Rejection::NearDuplicate(known.to_string())),
            None => Ok(()),
        }
    }
}
