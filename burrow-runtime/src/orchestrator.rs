//! Research Orchestrator
//!
//! Explores a query depth-first:
//! - Resolve candidate URLs for the query
//! - Fetch and filter each URL not yet visited in this session
//! - Derive sub-queries from the gathered text and recurse into a few
//!
//! Every non-empty node is also appended to a flat result list in
//! completion order, which feeds the summary at the end of a run.

use futures::future::BoxFuture;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use burrow_agents::{HeuristicProcessor, ProcessorError, SharedProcessor};
use burrow_core::{ContentItem, ResultNode, DEFAULT_MAX_DEPTH, SUB_QUERIES_PER_NODE, URLS_PER_QUERY};
use burrow_net::{ContentExtractor, NetConfig, PageExtractor, ResilientTransport, SearchResolver, UrlResolver};

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Depth at which recursion stops
    pub max_depth: usize,
    /// Pause after each fetched URL, in seconds
    pub delay_secs: f64,
    /// Uniform jitter applied to the pause, in seconds either way
    pub delay_jitter_secs: f64,
    pub urls_per_query: usize,
    pub sub_queries_per_node: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            delay_secs: 1.0,
            delay_jitter_secs: 0.25,
            urls_per_query: URLS_PER_QUERY,
            sub_queries_per_node: SUB_QUERIES_PER_NODE,
        }
    }
}

impl ResearchConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// No pause between fetches
    pub fn without_delay(mut self) -> Self {
        self.delay_secs = 0.0;
        self.delay_jitter_secs = 0.0;
        self
    }
}

/// Failure inside one query's branch
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("Text processing failed: {0}")]
    Processor(#[from] ProcessorError),
}

/// Recursive research orchestrator
pub struct Orchestrator {
    config: ResearchConfig,
    resolver: Arc<dyn UrlResolver>,
    extractor: Arc<dyn ContentExtractor>,
    processor: SharedProcessor,
    visited: HashSet<String>,
    results: Vec<ResultNode>,
    rng: StdRng,
}

impl Orchestrator {
    pub fn new(
        config: ResearchConfig,
        resolver: Arc<dyn UrlResolver>,
        extractor: Arc<dyn ContentExtractor>,
        processor: SharedProcessor,
    ) -> Self {
        Self {
            config,
            resolver,
            extractor,
            processor,
            visited: HashSet::new(),
            results: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Orchestrator over live search and page fetching sharing one transport
    pub fn with_network(config: ResearchConfig, net: &NetConfig, processor: SharedProcessor) -> Self {
        let transport = Arc::new(ResilientTransport::new(net));
        let resolver = Arc::new(SearchResolver::new(transport.clone()));
        let extractor = Arc::new(PageExtractor::new(transport));
        Self::new(config, resolver, extractor, processor)
    }

    /// Non-empty nodes in completion order
    pub fn results(&self) -> &[ResultNode] {
        &self.results
    }

    pub fn visited(&self) -> &HashSet<String> {
        &self.visited
    }

    /// Forget visited URLs and accumulated results
    pub fn reset(&mut self) {
        self.visited.clear();
        self.results.clear();
    }

    /// Research a top-level query
    pub async fn research(&mut self, query: &str) -> ResultNode {
        let root = self.research_at(query.to_string(), 0).await;
        info!(
            "Research for '{}' finished: {} nodes, {} URLs visited",
            query,
            root.node_count(),
            self.visited.len()
        );
        root
    }

    /// Research `query` as if reached at `depth`.
    ///
    /// Never fails: a branch error is logged and yields a terminal node.
    pub fn research_at(&mut self, query: String, depth: usize) -> BoxFuture<'_, ResultNode> {
        Box::pin(async move {
            if depth >= self.config.max_depth {
                debug!("Depth limit reached for: {}", query);
                return ResultNode::terminal(query);
            }

            info!("Researching: {} (depth {})", query, depth);

            match self.explore(&query, depth).await {
                Ok(node) => node,
                Err(e) => {
                    error!("Error researching query '{}': {}", query, e);
                    ResultNode::terminal(query)
                }
            }
        })
    }

    /// Summary of every result so far; falls back to the heuristic summary
    pub async fn summarize(&self) -> String {
        match self.processor.summarize_results(&self.results).await {
            Ok(summary) => summary,
            Err(e) => {
                error!("Summary via {} failed: {}", self.processor.name(), e);
                HeuristicProcessor::new().summary(&self.results)
            }
        }
    }

    async fn explore(&mut self, query: &str, depth: usize) -> Result<ResultNode, ResearchError> {
        let urls = self.resolver.resolve_urls(query).await;
        let content = self.gather(&urls).await?;

        if content.is_empty() {
            warn!("No content gathered for: {}", query);
            return Ok(ResultNode::terminal(query));
        }

        let sub_queries = self.processor.generate_sub_queries(query, &content).await?;
        info!("Generated {} sub-queries for: {}", sub_queries.len(), query);

        let mut children = Vec::new();
        for sub_query in sub_queries.into_iter().take(self.config.sub_queries_per_node) {
            debug!("Exploring sub-query: {}", sub_query);
            children.push(self.research_at(sub_query, depth + 1).await);
        }

        let node = ResultNode {
            query: query.to_string(),
            content,
            sub_queries: children,
        };
        self.results.push(node.clone());

        Ok(node)
    }

    /// Fetch and filter the first few unvisited URLs
    async fn gather(&mut self, urls: &[String]) -> Result<Vec<ContentItem>, ResearchError> {
        let mut content = Vec::new();

        for url in urls.iter().take(self.config.urls_per_query) {
            if !self.visited.insert(url.clone()) {
                debug!("Skipping already visited URL: {}", url);
                continue;
            }

            info!("Processing URL: {}", url);
            let text = self.extractor.extract(url).await;

            if text.is_empty() {
                info!("No content extracted from {}", url);
            } else {
                let filtered = self.processor.filter_content(&text).await?;
                if !filtered.is_empty() {
                    content.push(ContentItem::new(url.clone(), filtered));
                }
            }

            self.pause().await;
        }

        Ok(content)
    }

    async fn pause(&mut self) {
        let jitter = self.config.delay_jitter_secs.abs();
        let offset = if jitter.is_finite() && jitter > 0.0 {
            self.rng.gen_range(-jitter..=jitter)
        } else {
            0.0
        };

        // non-finite delays never reach Duration::from_secs_f64
        let secs = (self.config.delay_secs + offset).max(0.0);
        if secs.is_finite() && secs > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(secs)).await;
        }
    }
}
