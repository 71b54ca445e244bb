//! Search resolution
//!
//! Queries an HTML search endpoint and extracts candidate result URLs.
//! Two policies are layered here: a bounded retry loop over transport
//! failures, and a circuit breaker that returns the fallback URL set as soon
//! as a response looks like a bot check or yields no links.

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use burrow_core::{
    fallback_urls, has_anti_automation_marker, is_acceptable_url, SearchEngine, MAX_SEARCH_RESULTS,
    SEARCH_ENDPOINTS,
};

use crate::ResilientTransport;

/// Result-link selectors, most specific first
const RESULT_SELECTORS: &[&str] = &[
    "a.result__url",
    "a.result__a",
    "a.result__snippet",
    "a.result-link",
    "a[href^=\"http\"]",
];

/// Hosts whose links point back at the search provider
const PROVIDER_HOSTS: &[&str] = &["duckduckgo.com"];

/// Resolves a query to candidate source URLs
#[async_trait]
pub trait UrlResolver: Send + Sync {
    /// Ordered, bounded, never empty
    async fn resolve_urls(&self, query: &str) -> Vec<String>;
}

/// What a search response amounted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Results(Vec<String>),
    /// Bot check or empty parse; use the fallback set
    Degraded(&'static str),
}

/// Circuit-breaker check on a received search page
pub fn evaluate_response(body: &str) -> SearchOutcome {
    if has_anti_automation_marker(body) {
        return SearchOutcome::Degraded("anti-automation page");
    }

    let urls = parse_result_links(body);
    if urls.is_empty() {
        return SearchOutcome::Degraded("no result links");
    }

    SearchOutcome::Results(urls)
}

/// Search resolver over the configured endpoints
pub struct SearchResolver {
    transport: Arc<ResilientTransport>,
    engines: Vec<SearchEngine>,
    fallback: Vec<String>,
    max_attempts: u32,
    rng: Mutex<StdRng>,
}

impl SearchResolver {
    pub fn new(transport: Arc<ResilientTransport>) -> Self {
        let max_attempts = transport.policy().max_retries;
        Self {
            transport,
            engines: SEARCH_ENDPOINTS.to_vec(),
            fallback: fallback_urls(),
            max_attempts,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Replace the fallback set; an empty list keeps the current one
    pub fn with_fallback(mut self, fallback: Vec<String>) -> Self {
        if !fallback.is_empty() {
            self.fallback = fallback;
        }
        self
    }

    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    fn pick_engine(&self) -> Option<&SearchEngine> {
        let mut rng = self.rng.lock();
        self.engines.choose(&mut *rng)
    }
}

#[async_trait]
impl UrlResolver for SearchResolver {
    async fn resolve_urls(&self, query: &str) -> Vec<String> {
        info!("Searching for: {}", query);

        for attempt in 0..self.max_attempts {
            let Some(engine) = self.pick_engine() else {
                break;
            };
            let url = engine.build_url(query);
            let headers = self.transport.next_headers();

            debug!("Search attempt {} via {}", attempt + 1, engine.name);

            match self.transport.request(&url, &headers).await {
                Ok(response) => match evaluate_response(&response.body) {
                    SearchOutcome::Results(urls) => {
                        info!("Found {} result URLs for: {}", urls.len(), query);
                        return urls;
                    }
                    SearchOutcome::Degraded(reason) => {
                        warn!("Search degraded ({}) for '{}', using fallback URLs", reason, query);
                        return self.fallback.clone();
                    }
                },
                Err(e) => {
                    warn!("Search via {} failed: {}", engine.name, e);
                    if attempt + 1 < self.max_attempts {
                        self.transport.backoff(attempt).await;
                    }
                }
            }
        }

        warn!("Search attempts exhausted for '{}', using fallback URLs", query);
        self.fallback.clone()
    }
}

/// Parse result links from a search page.
///
/// The first selector that yields any acceptable link wins. Output is
/// deduplicated in first-seen order and capped at `MAX_SEARCH_RESULTS`.
pub fn parse_result_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    for pattern in RESULT_SELECTORS {
        let Ok(selector) = Selector::parse(pattern) else {
            continue;
        };

        let mut seen: HashSet<String> = HashSet::new();
        let mut urls = Vec::new();

        for element in document.select(&selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let Some(url) = normalize_href(href) else {
                continue;
            };

            if !is_acceptable_url(&url) || is_provider_link(&url) {
                continue;
            }

            if seen.insert(url.clone()) {
                urls.push(url);
            }
        }

        if !urls.is_empty() {
            urls.truncate(MAX_SEARCH_RESULTS);
            return urls;
        }
    }

    Vec::new()
}

/// Make an href absolute and unwrap provider redirect links
fn normalize_href(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    Some(redirect_target(&absolute).unwrap_or(absolute))
}

/// Target of a `duckduckgo.com/l/?uddg=...` redirect
fn redirect_target(url: &str) -> Option<String> {
    if !url.contains("duckduckgo.com/l/") {
        return None;
    }

    let (_, params) = url.split_once('?')?;
    params
        .split('&')
        .find_map(|pair| pair.strip_prefix("uddg="))
        .and_then(|encoded| urlencoding::decode(encoded).ok())
        .map(|decoded| decoded.into_owned())
}

fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    rest.split(['/', '?', '#']).next().unwrap_or(rest)
}

fn is_provider_link(url: &str) -> bool {
    let host = host_of(url).to_lowercase();
    PROVIDER_HOSTS
        .iter()
        .any(|provider| host == *provider || host.ends_with(&format!(".{}", provider)))
}
