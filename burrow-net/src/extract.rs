//! Page content extraction
//!
//! Fetches a page through the resilient transport and reduces it to its
//! main readable text. Any failure yields an empty string.

use async_trait::async_trait;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::ResilientTransport;

/// Elements whose text never counts as page content
const EXCLUDED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "form", "svg",
];

/// Containers tried in order for the main content
const CONTENT_ROOTS: &[&str] = &["article", "main", "[role=\"main\"]", "body"];

/// Minimum characters for a content root to be preferred over the next one
const MIN_ROOT_CHARS: usize = 200;

/// Turns a URL into plain text
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Best-effort text, empty when nothing could be extracted
    async fn extract(&self, url: &str) -> String;
}

/// Extractor that fetches pages through the resilient transport
pub struct PageExtractor {
    transport: Arc<ResilientTransport>,
    max_retries: u32,
}

impl PageExtractor {
    pub fn new(transport: Arc<ResilientTransport>) -> Self {
        let max_retries = transport.policy().max_retries;
        Self {
            transport,
            max_retries,
        }
    }
}

#[async_trait]
impl ContentExtractor for PageExtractor {
    async fn extract(&self, url: &str) -> String {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            warn!("Cannot fetch non-HTTP URL: {}", url);
            return String::new();
        }

        let Some(response) = self.transport.request_with_retry(url, self.max_retries).await else {
            warn!("Error extracting content from {}: no response", url);
            return String::new();
        };

        match extract_main_text(&response.body) {
            Some(text) => {
                debug!("Extracted {} chars from {}", text.chars().count(), url);
                text
            }
            None => {
                warn!("Error extracting content from {}: no readable text", url);
                String::new()
            }
        }
    }
}

/// Extract the main readable text of an HTML document
pub fn extract_main_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let mut best: Option<String> = None;
    for pattern in CONTENT_ROOTS {
        let Ok(selector) = Selector::parse(pattern) else {
            continue;
        };

        let Some(root) = document.select(&selector).next() else {
            continue;
        };

        let text = visible_text(root);
        if text.chars().count() >= MIN_ROOT_CHARS {
            return Some(text);
        }
        if best.as_ref().map_or(true, |b| text.len() > b.len()) {
            best = Some(text);
        }
    }

    best.filter(|text| !text.is_empty())
}

/// Text of all descendants outside excluded subtrees
fn visible_text(root: ElementRef<'_>) -> String {
    let mut parts = Vec::new();

    for node_ref in root.descendants() {
        let Node::Text(text_node) = node_ref.value() else {
            continue;
        };

        let in_excluded = node_ref.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| EXCLUDED_ELEMENTS.contains(&el.name()))
        });

        if !in_excluded {
            let trimmed = text_node.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed);
            }
        }
    }

    normalize_whitespace(&parts.join(" "))
}

/// Normalize whitespace in text
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FetchResponse, HeaderSet, HttpFetcher, NetConfig, NetError, RetryPolicy};

    #[test]
    fn test_extract_skips_chrome_and_scripts() {
        let html = r#"
            <html>
            <head><title>Test Page</title></head>
            <body>
                <nav>Home | About</nav>
                <script>var x = 1;</script>
                <h1>Hello World</h1>
                <p>This is   test
                   content.</p>
                <style>.x { color: red; }</style>
                <footer>Copyright</footer>
            </body>
            </html>
        "#;

        let text = extract_main_text(html).unwrap();
        assert_eq!(text, "Hello World This is test content.");
    }

    #[test]
    fn test_extract_prefers_article() {
        let article = "Quantum computers use qubits. ".repeat(10);
        let html = format!(
            "<html><body><p>Sidebar text</p><article><p>{}</p></article></body></html>",
            article
        );

        let text = extract_main_text(&html).unwrap();
        assert!(text.starts_with("Quantum computers"));
        assert!(!text.contains("Sidebar"));
    }

    #[test]
    fn test_extract_empty_page() {
        assert_eq!(extract_main_text("<html><body><script>x()</script></body></html>"), None);
    }

    struct PageFetcher(Option<&'static str>);

    #[async_trait]
    impl HttpFetcher for PageFetcher {
        async fn get(
            &self,
            _url: &str,
            _headers: &HeaderSet,
            _proxy: Option<&str>,
        ) -> Result<FetchResponse, NetError> {
            match self.0 {
                Some(body) => Ok(FetchResponse::ok(body)),
                None => Err(NetError::Transport("unreachable".to_string())),
            }
        }
    }

    fn extractor(body: Option<&'static str>) -> PageExtractor {
        let config = NetConfig {
            proxies: Vec::new(),
            timeout_secs: 1,
            retry: RetryPolicy::immediate(2),
        };
        PageExtractor::new(Arc::new(ResilientTransport::with_fetcher(&config, Arc::new(PageFetcher(body)))))
    }

    #[tokio::test]
    async fn test_page_extractor_returns_text() {
        let text = extractor(Some("<body><p>Plain page text</p></body>"))
            .extract("https://example.com")
            .await;
        assert_eq!(text, "Plain page text");
    }

    #[tokio::test]
    async fn test_page_extractor_failures_are_empty() {
        assert_eq!(extractor(None).extract("https://example.com").await, "");
        assert_eq!(extractor(Some("<p>x</p>")).extract("ftp://example.com").await, "");
    }
}
