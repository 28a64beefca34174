/// Text processing utilities. All lengths are counted in chars, not bytes,
/// since most of what flows through here is CJK.
pub mod text {
    pub fn char_len(text: &str) -> usize {
        text.chars().count()
    }

    /// Cut `text` to at most `max_chars`, preferring to break at the last
    /// newline, then the last whitespace, inside the allowed window.
    pub fn smart_truncate(text: &str, max_chars: usize) -> String {
        if char_len(text) <= max_chars {
            return text.to_string();
        }

        let byte_end = text
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        let window = &text[..byte_end];

        // Only break early if that keeps at least half of the window.
        let keeps_enough = |i: &usize| *i > 0 && *i >= byte_end / 2;
        let cut = window
            .rfind('\n')
            .filter(keeps_enough)
            .or_else(|| window.rfind(char::is_whitespace).filter(keeps_enough))
            .unwrap_or(byte_end);

        window[..cut].trim_end().to_string()
    }

    /// Truncate to `max_chars` and mark the cut with an ellipsis.
    pub fn excerpt(text: &str, max_chars: usize) -> String {
        let text = collapse_whitespace(text);
        if char_len(&text) <= max_chars || max_chars == 0 {
            return text;
        }
        let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        cut = cut.trim_end().to_string();
        cut.push('…');
        cut
    }

    pub fn collapse_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// URL utilities
pub mod url {
    use url::Url;

    /// Extract host from URL
    pub fn extract_host(url_str: &str) -> Option<String> {
        Url::parse(url_str)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.to_ascii_lowercase()))
    }

    /// True when the link's host sits under one of the given country-code
    /// top level domains (`"tw"` matches `udn.com.tw` and `gov.tw`).
    pub fn has_country_code(url_str: &str, country_codes: &[String]) -> bool {
        let Some(host) = extract_host(url_str) else {
            return false;
        };
        country_codes.iter().any(|cc| {
            let cc = cc.trim_start_matches('.').to_ascii_lowercase();
            !cc.is_empty() && host.ends_with(&format!(".{}", cc))
        })
    }

    /// Validate feed URL format
    pub fn is_valid_feed_url(url_str: &str) -> bool {
        if let Ok(url) = Url::parse(url_str) {
            url.scheme() == "http" || url.scheme() == "https"
        } else {
            false
        }
    }
}
