//! Near-duplicate detection over normalized headlines.
//!
//! Two headlines are treated as the same story when the Jaccard similarity of
//! their unique-character sets exceeds [`SIMILARITY_THRESHOLD`]. Character
//! sets ignore word order and spacing, which is exactly the drift seen between
//! syndication copies of one article.
//!
//! Known precision limitation: very short titles share a large fraction of
//! their few characters easily, so two unrelated 3-4 character headlines can
//! be flagged as duplicates.

use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use crate::normalizer::{normalize, NormalizedTitle};

pub const SIMILARITY_THRESHOLD: f64 = 0.8;

type CharSet = BTreeSet<char>;

fn char_set(title: &str) -> CharSet {
    title.chars().collect()
}

/// |a ∩ b| / |a ∪ b|, or `None` when either side is empty.
fn jaccard(a: &CharSet, b: &CharSet) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    Some(intersection as f64 / union as f64)
}

/// Character-set similarity between two already normalized titles.
pub fn similarity(a: &NormalizedTitle, b: &NormalizedTitle) -> Option<f64> {
    jaccard(&char_set(a.as_str()), &char_set(b.as_str()))
}

/// Normalized titles admitted so far in one run. Starts empty, only grows.
#[derive(Debug, Default, Clone)]
pub struct SeenTitleSet {
    exact: HashSet<NormalizedTitle>,
    known: Vec<(NormalizedTitle, CharSet)>,
}

impl SeenTitleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, title: &NormalizedTitle) -> bool {
        self.exact.contains(title)
    }

    /// Returns false if the title was already present.
    pub fn insert(&mut self, title: NormalizedTitle) -> bool {
        if self.exact.contains(&title) {
            return false;
        }
        let chars = char_set(title.as_str());
        self.exact.insert(title.clone());
        self.known.push((title, chars));
        true
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalizedTitle> {
        self.known.iter().map(|(title, _)| title)
    }

    /// First known title whose similarity to `candidate` exceeds the threshold.
    pub fn find_similar(&self, candidate: &NormalizedTitle) -> Option<(&NormalizedTitle, f64)> {
        let candidate_chars = char_set(candidate.as_str());
        self.known.iter().find_map(|(known, known_chars)| {
            jaccard(&candidate_chars, known_chars)
                .filter(|&score| score > SIMILARITY_THRESHOLD)
                .map(|score| (known, score))
        })
    }
}

/// True when `title` is a near duplicate of something already in `seen`.
pub fn is_duplicate(title: &str, seen: &SeenTitleSet) -> bool {
    let candidate = normalize(title);
    match seen.find_similar(&candidate) {
        Some((known, score)) => {
            debug!("'{}' similar to '{}' (similarity: {:.2})", candidate, known, score);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn seen_with(titles: &[&str]) -> SeenTitleSet {
        let mut seen = SeenTitleSet::new();
        for title in titles {
            seen.insert(normalize(title));
        }
        seen
    }

    #[test]
    fn syndicated_copies_are_duplicates() {
        let seen = seen_with(&["新光金控Q3獲利創新高｜工商時報"]);
        assert!(is_duplicate("新光金控 Q3 獲利 創新高 — 經濟日報", &seen));
    }

    #[test]
    fn different_stories_are_not_duplicates() {
        let seen = seen_with(&["新光金控Q3獲利創新高｜工商時報"]);
        assert!(!is_duplicate("金管會發布保險業新監理規範", &seen));
    }

    #[test]
    fn empty_titles_are_never_similar() {
        let seen = seen_with(&["新光金控"]);
        assert!(!is_duplicate("", &seen));
        assert!(!is_duplicate("- 工商時報", &seen));
        assert_eq!(similarity(&normalize(""), &normalize("abc")), None);
    }

    #[test]
    fn short_titles_can_collide() {
        // Documented limitation: reordered short titles share all characters.
        let seen = seen_with(&["abc"]);
        assert!(is_duplicate("cab", &seen));
    }

    #[test]
    fn similarity_is_exact_jaccard() {
        let score = similarity(&normalize("abcd"), &normalize("abce")).unwrap();
        assert!((score - 3.0 / 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn insert_is_idempotent() {
        let mut seen = SeenTitleSet::new();
        assert!(seen.insert(normalize("新光人壽")));
        assert!(!seen.insert(normalize("新光人壽｜中時")));
        assert_eq!(seen.len(), 1);
        assert!(seen.contains(&normalize("新光人壽")));
    }

    proptest! {
        #[test]
        fn duplicate_detection_is_symmetric(a in "[a-f新光金控 ]{0,12}", b in "[a-f新光金控 ]{0,12}") {
            let a_after_b = is_duplicate(&a, &seen_with(&[b.as_str()]));
            let b_after_a = is_duplicate(&b, &seen_with(&[a.as_str()]));
            prop_assert_eq!(a_after_b, b_after_a);
        }
    }
}
