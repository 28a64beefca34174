use crate::types::{DigestError, RawItem, Result};
use crate::utils::text::collapse_whitespace;
use chrono::Utc;
use feed_rs::parser;
use scraper::Html;
use std::collections::HashSet;
use tracing::{debug, info};

/// Separator Google News (and most aggregators) put between headline and outlet.
const OUTLET_SEPARATOR: &str = " - ";

#[derive(Debug)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<RawItem>,
    /// Entries dropped for missing a title or a link.
    pub skipped: usize,
    /// Entries dropped because an earlier entry had the same link.
    pub duplicate_links: usize,
}

#[derive(Debug, Default)]
pub struct FeedParser {
    /// Take the outlet name from a trailing `" - Outlet"` in the title when
    /// the entry has no author.
    outlet_from_title: bool,
}

impl FeedParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outlet_from_title(mut self, enabled: bool) -> Self {
        self.outlet_from_title = enabled;
        self
    }

    pub fn parse_feed(&self, content: &str) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| DigestError::Parse(format!("Failed to parse feed: {}", e)))?;

        let title = feed.title.map(|t| t.content);
        let mut seen_links = HashSet::new();
        let mut entries = Vec::new();
        let mut skipped = 0;
        let mut duplicate_links = 0;

        for entry in feed.entries {
            match self.parse_entry(entry) {
                Some(item) if seen_links.insert(item.link.clone()) => entries.push(item),
                Some(item) => {
                    debug!("Skipping duplicate entry with URL: {}", item.link);
                    duplicate_links += 1;
                }
                None => skipped += 1,
            }
        }

        info!(
            "Parsed feed with {} entries ({} malformed, {} duplicate links)",
            entries.len(),
            skipped,
            duplicate_links
        );

        Ok(ParsedFeed { title, entries, skipped, duplicate_links })
    }

    fn parse_entry(&self, entry: feed_rs::model::Entry) -> Option<RawItem> {
        let Some(title) = entry
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
        else {
            debug!("Skipping entry {} without a title", entry.id);
            return None;
        };

        let Some(link) = entry.links.first().map(|l| l.href.trim().to_string()).filter(|l| !l.is_empty()) else {
            debug!("Skipping entry '{}' without a link", title);
            return None;
        };

        let published_at = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.with_timezone(&Utc));
        if published_at.is_none() {
            debug!("Entry '{}' has no usable publish date", title);
        }

        let source_name = entry
            .authors
            .first()
            .map(|a| a.name.trim().to_string())
            .filter(|name| !name.is_empty())
            .or_else(|| {
                if self.outlet_from_title {
                    outlet_from_title(&title)
                } else {
                    None
                }
            });

        let summary = entry.summary.and_then(|text| plain_text(&text.content));

        Some(RawItem { title, link, published_at, source_name, summary })
    }

    /// Cheap sniff test before handing content to the real parser.
    pub fn is_valid_feed_content(content: &str) -> bool {
        let content_lower = content.to_lowercase();
        content_lower.contains("<rss") || content_lower.contains("<feed") || content_lower.contains("<channel")
    }
}

/// Feed descriptions are often HTML fragments.
fn plain_text(html: &str) -> Option<String> {
    let fragment = Html::parse_fragment(html);
    let text = collapse_whitespace(&fragment.root_element().text().collect::<String>());
    Some(text).filter(|t| !t.is_empty())
}

fn outlet_from_title(title: &str) -> Option<String> {
    title
        .rsplit_once(OUTLET_SEPARATOR)
        .map(|(_, outlet)| outlet.trim().to_string())
        .filter(|outlet| !outlet.is_empty())
}
