//! Proposal-link discovery in free text.
//!
//! Booking platforms bury the actual quote behind a "view your proposal"
//! link, so email bodies are scanned for URLs that look like they lead to
//! one. Patterns are deliberately loose; a false positive only costs a
//! failed scrape, which the pipeline tolerates.

use std::sync::LazyLock;

use regex::Regex;

static URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)https?://[^\s]+proposal[^\s]*").unwrap(),
        Regex::new(r"(?i)https?://[^\s]+quote[^\s]*").unwrap(),
        Regex::new(r"(?i)https?://[^\s]+booking[^\s]*").unwrap(),
        Regex::new(r"(?i)https?://[^\s]+estimate[^\s]*").unwrap(),
        Regex::new(r"(?i)https?://[^\s]+event[^\s]*").unwrap(),
        Regex::new(r"(?i)https?://[^\s]+meeting[^\s]*").unwrap(),
        // Marriott booking platform
        Regex::new(r"(?i)https?://[^\s]+bookmarriott[^\s]*").unwrap(),
        Regex::new(r"(?i)https?://[^\s]+marriott[^\s]*").unwrap(),
        // Generic share links
        Regex::new(r"(?i)https?://[^\s]+view/[^\s]*").unwrap(),
        Regex::new(r"(?i)https?://[^\s]+proposals/[^\s]*").unwrap(),
    ]
});

/// Scans text for proposal-looking URLs, in pattern order, first-seen wins.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut urls = Vec::new();
    for pattern in URL_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            urls.push(trim_trailing_punctuation(m.as_str()).to_string());
        }
    }
    dedup_preserving_order(urls)
}

/// Strips punctuation that sentence context glues onto a URL
/// ("see https://x.example/proposal/1." or "(link: ...)").
fn trim_trailing_punctuation(url: &str) -> &str {
    url.trim_end_matches(['.', ',', ')', ';', ']', '>', '\'', '"'])
}

pub fn dedup_preserving_order(urls: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    urls.into_iter().filter(|u| seen.insert(u.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_urls_finds_proposal_links() {
        let text = "Hi! Your quote is ready: https://book.example.com/proposals/abc123 \
                    and the venue site is https://plainhotel.example.com/";
        let urls = extract_urls(text);
        assert_eq!(urls, vec!["https://book.example.com/proposals/abc123"]);
    }

    #[test]
    fn test_extract_urls_trims_trailing_punctuation() {
        let text = "View it here (https://hotels.example.com/quote/55).";
        let urls = extract_urls(text);
        assert_eq!(urls, vec!["https://hotels.example.com/quote/55"]);
    }

    #[test]
    fn test_extract_urls_case_insensitive() {
        let text = "HTTPS://BOOK.MARRIOTT.example/Event/99 awaits";
        let urls = extract_urls(text);
        assert_eq!(urls.len(), 1);
    }

    #[test]
    fn test_extract_urls_dedups_across_patterns() {
        // Matches both the "proposal" and "proposals/" patterns
        let text = "https://x.example/proposals/1 https://x.example/proposals/1";
        let urls = extract_urls(text);
        assert_eq!(urls.len(), 1);
    }

    #[test]
    fn test_extract_urls_none_found() {
        assert!(extract_urls("No links in this email at all.").is_empty());
    }

    #[test]
    fn test_dedup_preserves_first_occurrence_order() {
        let urls = vec![
            "https://a.example/quote/1".to_string(),
            "https://b.example/quote/2".to_string(),
            "https://a.example/quote/1".to_string(),
        ];
        assert_eq!(
            dedup_preserving_order(urls),
            vec![
                "https://a.example/quote/1".to_string(),
                "https://b.example/quote/2".to_string(),
            ]
        );
    }
}
