//! Burrow Core - result tree model and search endpoint registry
//!
//! This crate provides the foundational primitives:
//! - Research result tree (`ResultNode`, `ContentItem`)
//! - Search endpoint templates and the fallback URL set
//! - Anti-automation markers used by the search circuit breaker

pub mod model;
pub mod search_engines;

pub use model::*;
pub use search_engines::*;

/// Default maximum recursion depth
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Maximum URLs a search resolution returns
pub const MAX_SEARCH_RESULTS: usize = 5;

/// URLs fetched per query
pub const URLS_PER_QUERY: usize = 3;

/// Sub-queries explored per node
pub const SUB_QUERIES_PER_NODE: usize = 2;

/// Maximum length of filtered content, in characters
pub const MAX_FILTERED_CHARS: usize = 1000;
