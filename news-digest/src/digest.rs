use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classifier::CategoryTable;
use crate::types::AdmittedItem;
use crate::utils::text::{char_len, smart_truncate};

#[derive(Debug, Clone, PartialEq)]
pub struct DigestSection {
    pub label: String,
    pub items: Vec<AdmittedItem>,
}

/// Admitted items grouped by category, sections in table order with the
/// fallback last, items in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorizedDigest {
    sections: Vec<DigestSection>,
}

impl CategorizedDigest {
    pub fn new(table: &CategoryTable) -> Self {
        let mut digest = Self::default();
        for label in table.labels() {
            if !digest.sections.iter().any(|s| s.label == label) {
                digest.sections.push(DigestSection { label: label.to_string(), items: Vec::new() });
            }
        }
        digest
    }

    /// Items with a label the table did not declare get a section at the end.
    pub fn push(&mut self, item: AdmittedItem) {
        match self.sections.iter_mut().find(|s| s.label == item.category) {
            Some(section) => section.items.push(item),
            None => self.sections.push(DigestSection {
                label: item.category.clone(),
                items: vec![item],
            }),
        }
    }

    /// Non-empty sections only.
    pub fn sections(&self) -> impl Iterator<Item = &DigestSection> {
        self.sections.iter().filter(|s| !s.items.is_empty())
    }

    pub fn items(&self, label: &str) -> &[AdmittedItem] {
        self.sections
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.items.as_slice())
            .unwrap_or(&[])
    }

    pub fn total_items(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_items() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowMode {
    /// Close the full message with a continuation marker and keep going in a
    /// new one.
    #[default]
    Continue,
    /// Close the full message with a truncation marker and drop the rest.
    Stop,
}

pub const DEFAULT_HEADER: &str = "📢 新光金控 - 今日新聞摘要（{date}）";
pub const DEFAULT_CONTINUATION_MARKER: &str = "…（未完，續下則）";
pub const DEFAULT_TRUNCATION_MARKER: &str = "…（內容過長，以下省略）";
pub const DEFAULT_NO_NEWS_MESSAGE: &str = "📭 今日無相關新聞";

#[derive(Debug, Clone)]
pub struct DigestFormatter {
    /// `{date}` is replaced with the digest date as `%Y/%m/%d`.
    pub header: Option<String>,
    pub overflow: OverflowMode,
    pub continuation_marker: String,
    pub truncation_marker: String,
    pub no_news_message: String,
    pub show_source: bool,
    date: Option<NaiveDate>,
}

impl Default for DigestFormatter {
    fn default() -> Self {
        Self {
            header: Some(DEFAULT_HEADER.to_string()),
            overflow: OverflowMode::Continue,
            continuation_marker: DEFAULT_CONTINUATION_MARKER.to_string(),
            truncation_marker: DEFAULT_TRUNCATION_MARKER.to_string(),
            no_news_message: DEFAULT_NO_NEWS_MESSAGE.to_string(),
            show_source: true,
            date: None,
        }
    }
}

impl DigestFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overflow(mut self, overflow: OverflowMode) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_header(mut self, header: Option<String>) -> Self {
        self.header = header;
        self
    }

    /// Pin the header date instead of using today's local date.
    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Render `digest` into messages of at most `limit` chars each.
    pub fn format(&self, digest: &CategorizedDigest, limit: usize) -> Vec<String> {
        if limit == 0 {
            return Vec::new();
        }
        if digest.is_empty() {
            info!("No admitted items, sending the no-news message");
            return vec![hard_cut(&self.no_news_message, limit)];
        }

        let blocks = self.blocks(digest);
        let reserve = char_len(&self.continuation_marker).max(char_len(&self.truncation_marker)) + 1;

        let mut messages = Vec::new();
        let mut current = String::new();

        for (i, block) in blocks.iter().enumerate() {
            let tail = if i + 1 == blocks.len() { 0 } else { reserve };

            if char_len(&current) + char_len(&block.text) + tail <= limit {
                current.push_str(&block.text);
                continue;
            }

            if !current.trim().is_empty() {
                let marker = match self.overflow {
                    OverflowMode::Continue => &self.continuation_marker,
                    OverflowMode::Stop => &self.truncation_marker,
                };
                messages.push(close(&current, marker, limit));
                current.clear();
                if self.overflow == OverflowMode::Stop {
                    debug!("Digest truncated after {} message(s)", messages.len());
                    return messages;
                }
            }

            // A message opening mid-section restates the section heading.
            let text = match &block.heading {
                Some(heading) => format!("{}{}", heading, block.text),
                None => block.text.clone(),
            };
            if char_len(&text) + tail <= limit {
                current.push_str(&text);
                continue;
            }

            // The block alone does not fit in an empty message.
            let cut = smart_truncate(text.trim(), limit.saturating_sub(reserve));
            messages.push(close(&cut, &self.truncation_marker, limit));
            if self.overflow == OverflowMode::Stop {
                return messages;
            }
        }

        if !current.trim().is_empty() {
            messages.push(current.trim().to_string());
        }
        debug!("Formatted digest into {} message(s)", messages.len());
        messages
    }

    /// The header, then one block per item. A section heading travels with
    /// the section's first item so no message ends on a bare heading.
    fn blocks(&self, digest: &CategorizedDigest) -> Vec<Block> {
        let mut blocks = Vec::new();
        if let Some(header) = &self.header {
            let date = self.date.unwrap_or_else(|| Local::now().date_naive());
            blocks.push(Block {
                text: format!("{}\n", header.replace("{date}", &date.format("%Y/%m/%d").to_string())),
                heading: None,
            });
        }
        for section in digest.sections() {
            let heading = format!("{}（{}）\n", section.label, section.items.len());
            for (i, item) in section.items.iter().enumerate() {
                let rendered = self.render_item(item);
                blocks.push(if i == 0 {
                    Block { text: format!("\n{}{}", heading, rendered), heading: None }
                } else {
                    Block { text: rendered, heading: Some(heading.clone()) }
                });
            }
        }
        blocks
    }

    fn render_item(&self, item: &AdmittedItem) -> String {
        let mut block = format!("- {}\n", item.item.title.trim());
        if let Some(summary) = item.summary.as_deref().filter(|s| !s.trim().is_empty()) {
            block.push_str(&format!("  {}\n", summary.trim()));
        }
        block.push_str(&format!("  🔗 {}\n", item.display_link()));
        if self.show_source && item.item.has_known_source() {
            block.push_str(&format!("  📰 {}\n", item.item.source_name()));
        }
        block
    }
}

struct Block {
    text: String,
    /// Prepended when the block opens a message.
    heading: Option<String>,
}

fn close(body: &str, marker: &str, limit: usize) -> String {
    let body = body.trim();
    let message = if body.is_empty() {
        marker.to_string()
    } else {
        format!("{}\n{}", body, marker)
    };
    hard_cut(&message, limit)
}

fn hard_cut(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
