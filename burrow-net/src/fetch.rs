//! HTTP fetching
//!
//! `HttpFetcher` performs a single GET, optionally through a proxy. The
//! reqwest implementation keeps one client per proxy address.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{redirect, Client, Proxy};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::{HeaderSet, NetError};

/// A completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Performs one HTTP GET
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &HeaderSet,
        proxy: Option<&str>,
    ) -> Result<FetchResponse, NetError>;
}

/// reqwest-backed fetcher
pub struct ReqwestFetcher {
    timeout: Duration,
    clients: Mutex<HashMap<Option<String>, Client>>,
}

impl ReqwestFetcher {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn client_for(&self, proxy: Option<&str>) -> Result<Client, NetError> {
        let key = proxy.map(str::to_string);
        let mut clients = self.clients.lock();

        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let mut builder = Client::builder()
            .timeout(self.timeout)
            .redirect(redirect::Policy::limited(10));

        if let Some(address) = proxy {
            let proxy = Proxy::all(address).map_err(|e| NetError::ClientBuild(e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| NetError::ClientBuild(e.to_string()))?;

        clients.insert(key, client.clone());
        Ok(client)
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(
        &self,
        url: &str,
        headers: &HeaderSet,
        proxy: Option<&str>,
    ) -> Result<FetchResponse, NetError> {
        let client = self.client_for(proxy)?;

        let mut request = client.get(url);
        for (name, value) in headers.pairs() {
            request = request.header(name, value);
        }

        debug!("GET {} via {}", url, proxy.unwrap_or("direct"));

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(FetchResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clients_are_cached_per_proxy() {
        let fetcher = ReqwestFetcher::new(5);
        fetcher.client_for(None).unwrap();
        fetcher.client_for(Some("http://127.0.0.1:3128")).unwrap();
        fetcher.client_for(Some("http://127.0.0.1:3128")).unwrap();

        assert_eq!(fetcher.clients.lock().len(), 2);
    }

    #[test]
    fn test_response_ok() {
        assert!(FetchResponse::ok("hi").is_ok());
        assert!(!FetchResponse { status: 503, body: String::new() }.is_ok());
    }
}
