//! Resilient transport
//!
//! Every outbound GET goes through here: proxy selection from the pool,
//! success/failure bookkeeping, and bounded retry with exponential backoff.
//! Exhausted retries are reported as `None`, not as an error.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{FetchResponse, HeaderRotator, HeaderSet, HttpFetcher, NetConfig, NetError, ProxyPool, ReqwestFetcher};

/// Retry and backoff tuning
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts per logical request
    pub max_retries: u32,
    /// Delay after the first failed attempt, doubled per attempt
    pub backoff_base_ms: u64,
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 1000,
            jitter_min_ms: 100,
            jitter_max_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff_base_ms: 0,
            jitter_min_ms: 0,
            jitter_max_ms: 0,
        }
    }

    /// Wait after failed attempt `attempt` (0-indexed): `base * 2^attempt` plus jitter
    pub fn delay_for<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        let exponential = self
            .backoff_base_ms
            .saturating_mul(1u64 << attempt.min(20));

        let jitter = if self.jitter_max_ms > self.jitter_min_ms {
            rng.gen_range(self.jitter_min_ms..=self.jitter_max_ms)
        } else {
            self.jitter_min_ms
        };

        Duration::from_millis(exponential.saturating_add(jitter))
    }
}

/// Proxy-rotating HTTP transport with retry
pub struct ResilientTransport {
    fetcher: Arc<dyn HttpFetcher>,
    pool: Mutex<ProxyPool>,
    headers: HeaderRotator,
    rng: Mutex<StdRng>,
    policy: RetryPolicy,
}

impl ResilientTransport {
    /// Transport backed by reqwest
    pub fn new(config: &NetConfig) -> Self {
        Self::with_fetcher(config, Arc::new(ReqwestFetcher::new(config.timeout_secs)))
    }

    pub fn with_fetcher(config: &NetConfig, fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self {
            fetcher,
            pool: Mutex::new(ProxyPool::new(config.proxies.iter().cloned())),
            headers: HeaderRotator::new(),
            rng: Mutex::new(StdRng::from_entropy()),
            policy: config.retry.clone(),
        }
    }

    /// Make header choice and jitter reproducible
    pub fn seeded(mut self, seed: u64) -> Self {
        self.headers = HeaderRotator::seeded(seed);
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn next_headers(&self) -> HeaderSet {
        self.headers.next_headers()
    }

    /// Copy of the pool state
    pub fn pool_snapshot(&self) -> ProxyPool {
        self.pool.lock().clone()
    }

    /// Single attempt through the best available proxy.
    ///
    /// Any status other than 200 counts as a failure and marks the proxy.
    pub async fn request(&self, url: &str, headers: &HeaderSet) -> Result<FetchResponse, NetError> {
        let selected = {
            let mut pool = self.pool.lock();
            pool.select()
                .and_then(|idx| pool.get(idx).map(|e| (idx, e.address.clone())))
        };

        let proxy = selected.as_ref().map(|(_, address)| address.as_str());
        let outcome = match self.fetcher.get(url, headers, proxy).await {
            Ok(response) if response.is_ok() => Ok(response),
            Ok(response) => Err(NetError::Status(response.status)),
            Err(e) => Err(e),
        };

        if let Some((idx, address)) = &selected {
            let mut pool = self.pool.lock();
            match &outcome {
                Ok(_) => pool.record_success(*idx),
                Err(e) => {
                    debug!("Proxy {} failed for {}: {}", address, url, e);
                    pool.mark_failed(*idx);
                }
            }
        }

        outcome
    }

    /// Up to `max_retries` attempts with fresh headers each time
    pub async fn request_with_retry(&self, url: &str, max_retries: u32) -> Option<FetchResponse> {
        for attempt in 0..max_retries {
            let headers = self.next_headers();

            match self.request(url, &headers).await {
                Ok(response) => return Some(response),
                Err(e) => {
                    warn!("Attempt {}/{} for {} failed: {}", attempt + 1, max_retries, url, e);
                    if attempt + 1 < max_retries {
                        self.backoff(attempt).await;
                    }
                }
            }
        }

        None
    }

    /// Sleep for the policy delay of `attempt`
    pub async fn backoff(&self, attempt: u32) {
        let delay = {
            let mut rng = self.rng.lock();
            self.policy.delay_for(attempt, &mut *rng)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
