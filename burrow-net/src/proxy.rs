//! Proxy pool and network configuration
//!
//! Outbound requests are routed through a small pool of HTTP proxies. The
//! pool greedily prefers the endpoint with the best success record and
//! heals itself when every endpoint has been marked failed.

use serde::Deserialize;
use thiserror::Error;

use crate::RetryPolicy;

/// Proxies used when no configuration is supplied
pub const DEFAULT_PROXIES: &[&str] = &[
    "http://165.225.38.32:10605",
    "http://165.225.38.68:10605",
    "http://164.92.105.75:8888",
    "http://51.159.115.233:3128",
    "http://20.111.54.16:8123",
];

/// Network configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Proxy addresses (empty = direct connections)
    pub proxies: Vec<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retry and backoff tuning
    pub retry: RetryPolicy,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            proxies: DEFAULT_PROXIES.iter().map(|p| p.to_string()).collect(),
            timeout_secs: 10,
            retry: RetryPolicy::default(),
        }
    }
}

impl NetConfig {
    /// Configuration without proxies
    pub fn direct() -> Self {
        Self {
            proxies: Vec::new(),
            ..Default::default()
        }
    }
}

/// Errors from the network layer
#[derive(Debug, Error)]
pub enum NetError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// One proxy address and its session record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub address: String,
    pub success_count: u32,
    pub failed: bool,
}

impl ProxyEndpoint {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            success_count: 0,
            failed: false,
        }
    }
}

/// Pool of proxy endpoints with greedy success-based selection
#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    endpoints: Vec<ProxyEndpoint>,
}

impl ProxyPool {
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoints: addresses.into_iter().map(ProxyEndpoint::new).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn endpoints(&self) -> &[ProxyEndpoint] {
        &self.endpoints
    }

    pub fn get(&self, index: usize) -> Option<&ProxyEndpoint> {
        self.endpoints.get(index)
    }

    /// Pick the next endpoint to use.
    ///
    /// Failed endpoints are skipped; when all have failed the marks are
    /// cleared and the whole pool is eligible again. Among candidates the
    /// highest `success_count` wins, earliest in pool order on ties.
    /// Returns `None` only for an empty pool.
    pub fn select(&mut self) -> Option<usize> {
        if self.endpoints.is_empty() {
            return None;
        }

        if self.endpoints.iter().all(|e| e.failed) {
            for endpoint in &mut self.endpoints {
                endpoint.failed = false;
            }
        }

        let mut best: Option<usize> = None;
        for (idx, endpoint) in self.endpoints.iter().enumerate() {
            if endpoint.failed {
                continue;
            }
            match best {
                Some(b) if self.endpoints[b].success_count >= endpoint.success_count => {}
                _ => best = Some(idx),
            }
        }

        best
    }

    pub fn record_success(&mut self, index: usize) {
        if let Some(endpoint) = self.endpoints.get_mut(index) {
            endpoint.success_count += 1;
        }
    }

    pub fn mark_failed(&mut self, index: usize) {
        if let Some(endpoint) = self.endpoints.get_mut(index) {
            endpoint.failed = true;
        }
    }

    pub fn failed_count(&self) -> usize {
        self.endpoints.iter().filter(|e| e.failed).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NetConfig::default();
        assert_eq!(config.proxies.len(), DEFAULT_PROXIES.len());
        assert_eq!(config.timeout_secs, 10);
        assert!(NetConfig::direct().proxies.is_empty());
    }

    #[test]
    fn test_empty_pool_selects_nothing() {
        let mut pool = ProxyPool::default();
        assert!(pool.is_empty());
        assert_eq!(pool.select(), None);
    }

    #[test]
    fn test_select_prefers_success_then_pool_order() {
        let mut pool = ProxyPool::new(["http://a:1", "http://b:1", "http://c:1"]);
        assert_eq!(pool.select(), Some(0));

        pool.record_success(2);
        assert_eq!(pool.select(), Some(2));

        pool.record_success(1);
        assert_eq!(pool.select(), Some(1));
    }

    #[test]
    fn test_select_skips_failed() {
        let mut pool = ProxyPool::new(["http://a:1", "http://b:1"]);
        pool.record_success(0);
        pool.mark_failed(0);
        assert_eq!(pool.select(), Some(1));
    }

    #[test]
    fn test_select_resets_when_all_failed() {
        let mut pool = ProxyPool::new(["http://a:1", "http://b:1"]);
        pool.mark_failed(0);
        pool.mark_failed(1);
        assert_eq!(pool.failed_count(), 2);

        assert_eq!(pool.select(), Some(0));
        assert_eq!(pool.failed_count(), 0);
    }
}
