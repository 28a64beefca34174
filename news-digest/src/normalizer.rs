//! Headline canonicalization.
//!
//! Syndicated feeds carry the same story under slightly different titles:
//! an outlet suffix (`｜工商時報`, `- 經濟日報`), stray markup, punctuation and
//! spacing drift. [`normalize`] reduces a headline to a comparison key that is
//! only ever used for duplicate detection, never displayed.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Everything from the first source separator to the end of the title.
static SOURCE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)[|｜‧\-–—~～].*$").expect("static regex: source suffix"));

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("static regex: html tag"));

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\w\s\x{4e00}-\x{9fff}]").expect("static regex: non word")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex: whitespace"));

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedTitle(String);

impl NormalizedTitle {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedTitle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonicalize a raw headline. Total and idempotent.
pub fn normalize(title: &str) -> NormalizedTitle {
    let without_suffix = SOURCE_SUFFIX.replace(title, "");
    let without_tags = HTML_TAG.replace_all(&without_suffix, "");
    let word_chars = NON_WORD.replace_all(&without_tags, "");
    let collapsed = WHITESPACE.replace_all(&word_chars, " ");

    NormalizedTitle(collapsed.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_fullwidth_bar_suffix() {
        assert_eq!(normalize("新光金控Q3獲利創新高｜工商時報").as_str(), "新光金控q3獲利創新高");
    }

    #[test]
    fn strips_dash_suffix_and_collapses_spaces() {
        assert_eq!(
            normalize("新光金控 Q3 獲利  創新高 — 經濟日報").as_str(),
            "新光金控 q3 獲利 創新高"
        );
        assert_eq!(normalize("Shin Kong posts record profit - Reuters").as_str(), "shin kong posts record profit");
    }

    #[test]
    fn strips_markup_and_punctuation() {
        assert_eq!(normalize("<b>新光人壽</b>：調升保單利率！").as_str(), "新光人壽調升保單利率");
        assert_eq!(normalize("Big   news,  today?").as_str(), "big news today");
    }

    #[test]
    fn empty_and_separator_only_titles() {
        assert!(normalize("").is_empty());
        assert!(normalize("   ").is_empty());
        assert!(normalize("- 工商時報").is_empty());
    }

    #[test]
    fn first_separator_wins() {
        assert_eq!(normalize("台新~新光合併 - 聯合報").as_str(), "台新");
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(title in "\\PC{0,40}") {
            let once = normalize(&title);
            let twice = normalize(once.as_str());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn normalization_is_idempotent_for_headline_like_input(
            head in "[a-zA-Z0-9 新光金控獲利創新高<>/!？，]{0,20}",
            sep in "[|｜‧~～—–-]",
            tail in "[a-z 工商時報]{0,8}",
        ) {
            let title = format!("{}{}{}", head, sep, tail);
            let once = normalize(&title);
            prop_assert_eq!(normalize(once.as_str()), once);
        }
    }
}
