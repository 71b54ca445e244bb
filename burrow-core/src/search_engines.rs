//! Search endpoint registry
//!
//! Provides the HTML search endpoints queried for candidate URLs, the
//! fallback URL set used when live search is unavailable, and the markers
//! that identify an anti-automation interstitial.

use serde::Serialize;

/// An HTML search endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SearchEngine {
    /// Human-readable name
    pub name: &'static str,
    /// URL template with {query} placeholder
    pub url_template: &'static str,
}

impl SearchEngine {
    /// Build search URL for a query
    pub fn build_url(&self, query: &str) -> String {
        self.url_template
            .replace("{query}", &urlencoding::encode(query))
    }
}

/// Search endpoints, picked at random per attempt
pub static SEARCH_ENDPOINTS: &[SearchEngine] = &[
    SearchEngine {
        name: "DuckDuckGo HTML",
        url_template: "https://html.duckduckgo.com/html/?q={query}&kl=us-en",
    },
    SearchEngine {
        name: "DuckDuckGo Lite",
        url_template: "https://lite.duckduckgo.com/lite/?q={query}&kl=us-en",
    },
];

/// Known-good sources returned when search resolution is degraded
pub static FALLBACK_URLS: &[&str] = &[
    "https://en.wikipedia.org/wiki/Special:Random",
    "https://www.britannica.com/",
    "https://plato.stanford.edu/",
    "https://www.khanacademy.org/",
];

/// Page fragments that indicate the search provider served a bot check
pub static ANTI_AUTOMATION_MARKERS: &[&str] = &[
    "anomaly-modal",
    "captcha",
    "unusual traffic",
    "are you a robot",
    "bots use duckduckgo too",
];

/// Characters of a search response inspected for anti-automation markers
pub const MARKER_SCAN_CHARS: usize = 500;

/// Substrings that disqualify a result URL
pub static BLOCKED_URL_PATTERNS: &[&str] = &[".pdf", ".doc", "javascript:", "mailto:"];

/// Fallback URLs as owned strings
pub fn fallback_urls() -> Vec<String> {
    FALLBACK_URLS.iter().map(|url| url.to_string()).collect()
}

/// Whether the opening of a search page carries an anti-automation marker
pub fn has_anti_automation_marker(body: &str) -> bool {
    let head: String = body
        .chars()
        .take(MARKER_SCAN_CHARS)
        .collect::<String>()
        .to_lowercase();

    ANTI_AUTOMATION_MARKERS
        .iter()
        .any(|marker| head.contains(marker))
}

/// Whether a URL may be used as a research source
pub fn is_acceptable_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://"))
        && !BLOCKED_URL_PATTERNS
            .iter()
            .any(|blocked| lower.contains(blocked))
}
