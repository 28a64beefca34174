//! Keyword-table classification.
//!
//! The table is an ordered list; the first category with a keyword contained
//! in the text wins. Reordering the table changes results for headlines that
//! match several categories, so order is part of the configuration contract.

use serde::{Deserialize, Serialize};

pub const DEFAULT_FALLBACK_LABEL: &str = "📌 其他";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMode {
    /// Classify on the title only.
    #[default]
    TitleOnly,
    /// Classify on the title; if nothing matches, fetch the summary and retry
    /// on title + summary.
    TwoPhase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub label: String,
    keywords: Vec<String>,
}

impl Category {
    pub fn new<I, S>(label: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            label: label.into(),
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// `lowered` must already be lower-cased.
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    categories: Vec<Category>,
    fallback_label: String,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl CategoryTable {
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            categories,
            fallback_label: DEFAULT_FALLBACK_LABEL.to_string(),
        }
    }

    pub fn with_fallback_label(mut self, label: impl Into<String>) -> Self {
        self.fallback_label = label.into();
        self
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn fallback_label(&self) -> &str {
        &self.fallback_label
    }

    /// Labels in table order, fallback last.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .map(|c| c.label.as_str())
            .chain(std::iter::once(self.fallback_label.as_str()))
    }

    /// First matching category label, or `None` when nothing matches.
    pub fn find_match(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.categories
            .iter()
            .find(|c| c.matches(&lowered))
            .map(|c| c.label.as_str())
    }

    pub fn classify(&self, text: &str) -> &str {
        self.find_match(text).unwrap_or(&self.fallback_label)
    }

    pub fn is_fallback(&self, label: &str) -> bool {
        label == self.fallback_label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finance_table() -> CategoryTable {
        CategoryTable::new(vec![
            Category::new("📈 業績 / 財報", ["財報", "獲利", "盈餘", "收入", "營收"]),
            Category::new("🏛️ 政策 / 法規", ["金管會", "規範", "法令", "監理"]),
            Category::new("👥 人事異動", ["總經理", "董事長", "辭職", "接任", "人事"]),
            Category::new("📰 媒體評論", ["專欄", "分析", "觀點", "評論"]),
        ])
    }

    #[test]
    fn first_match_wins() {
        let table = CategoryTable::new(vec![Category::new("X", ["a"]), Category::new("Y", ["a", "b"])]);
        assert_eq!(table.classify("a b"), "X");
        assert_eq!(table.classify("b"), "Y");
    }

    #[test]
    fn falls_back_when_nothing_matches() {
        let table = finance_table();
        assert_eq!(table.classify("zzz"), DEFAULT_FALLBACK_LABEL);
        assert!(table.find_match("zzz").is_none());
        assert_eq!(CategoryTable::default().classify("獲利"), DEFAULT_FALLBACK_LABEL);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let table = CategoryTable::new(vec![Category::new("ESG", ["ESG", "Green Bond"])]);
        assert_eq!(table.classify("new green bond issued"), "ESG");
        assert_eq!(table.classify("esg report"), "ESG");
    }

    #[test]
    fn classifies_chinese_headlines() {
        let table = finance_table();
        assert_eq!(table.classify("新光金控Q3獲利創新高"), "📈 業績 / 財報");
        assert_eq!(table.classify("金管會發布新監理規範"), "🏛️ 政策 / 法規");
        assert_eq!(table.classify("新光人壽總經理接任"), "👥 人事異動");
    }

    #[test]
    fn labels_keep_table_order_with_fallback_last() {
        let table = finance_table().with_fallback_label("其他");
        let labels: Vec<_> = table.labels().collect();
        assert_eq!(labels.first(), Some(&"📈 業績 / 財報"));
        assert_eq!(labels.last(), Some(&"其他"));
        assert!(table.is_fallback("其他"));
    }

    #[test]
    fn blank_keywords_are_ignored() {
        let table = CategoryTable::new(vec![Category::new("Empty", ["", "  "])]);
        assert_eq!(table.classify("anything"), DEFAULT_FALLBACK_LABEL);
    }
}
