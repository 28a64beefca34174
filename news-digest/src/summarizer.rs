use crate::types::Summarizer;
use crate::utils::text::{char_len, collapse_whitespace, excerpt};
use crate::Fetcher;
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

/// Paragraphs shorter than this are usually bylines, captions or share links.
const MIN_PARAGRAPH_CHARS: usize = 20;

/// Fetches an article page and pulls a short excerpt out of it: the page's
/// meta description when present, otherwise its leading paragraphs.
pub struct HtmlSummarizer {
    fetcher: Fetcher,
}

impl HtmlSummarizer {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Summarizer for HtmlSummarizer {
    async fn summarize(&self, url: &str, max_chars: usize) -> Option<String> {
        match self.fetcher.fetch_full_content(url).await {
            Ok(html) => extract_summary(&html, max_chars),
            Err(e) => {
                debug!("Summary unavailable for {}: {}", url, e);
                None
            }
        }
    }
}

/// Plain-text excerpt of an HTML document, at most `max_chars` long.
pub fn extract_summary(html: &str, max_chars: usize) -> Option<String> {
    if max_chars == 0 {
        return None;
    }
    let document = Html::parse_document(html);

    let text = meta_description(&document).or_else(|| leading_paragraphs(&document, max_chars))?;
    Some(excerpt(&text, max_chars))
}

fn meta_description(document: &Html) -> Option<String> {
    let selector = Selector::parse(r#"meta[property="og:description"], meta[name="description"]"#).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .find(|content| !content.is_empty())
}

fn leading_paragraphs(document: &Html, max_chars: usize) -> Option<String> {
    let selector = Selector::parse("article p, p").ok()?;
    let mut text = String::new();
    for paragraph in document.select(&selector) {
        let para = collapse_whitespace(&paragraph.text().collect::<String>());
        if char_len(&para) < MIN_PARAGRAPH_CHARS {
            continue;
        }
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&para);
        if char_len(&text) >= max_chars {
            break;
        }
    }
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_meta_description() {
        let html = r#"<html><head>
            <meta name="description" content="  新光金控第三季 稅後純益創同期新高  ">
            </head><body><p>這是一段很長很長很長很長很長很長很長的內文段落。</p></body></html>"#;
        assert_eq!(extract_summary(html, 100).as_deref(), Some("新光金控第三季 稅後純益創同期新高"));
    }

    #[test]
    fn falls_back_to_paragraphs_and_truncates() {
        let html = r#"<html><body>
            <p>記者</p>
            <p>新光金控今日公布第三季財報，累計稅後純益達新台幣百億元，創歷年同期新高。</p>
            <p>法人分析，投資收益與利差改善是主要動能。</p>
            </body></html>"#;
        let summary = extract_summary(html, 20).unwrap();
        assert_eq!(char_len(&summary), 20);
        assert!(summary.starts_with("新光金控今日公布"));
        assert!(summary.ends_with('…'));
    }

    #[test]
    fn nothing_usable_is_none() {
        assert_eq!(extract_summary("<html><body><p>短</p></body></html>", 100), None);
        assert_eq!(extract_summary("<p>新光金控今日公布第三季財報，累計稅後純益創新高。</p>", 0), None);
    }
}
