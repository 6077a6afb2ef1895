//! Caching policy: precache on install, evict on activate, route on fetch.

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use url::Url;

use super::clients::Clients;
use super::event::ExtendableEvent;
use crate::cache::CacheDb;
use crate::http::{ProxyRequest, ProxyResponse};
use crate::network::Network;
use crate::Error;

/// Fixed settings a worker version is built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Generation identifier; the only cache that survives activation.
    pub cache_name: String,
    /// Absolute paths stored at install.
    pub precache: Vec<String>,
    /// Cached document served to navigations when the network is down.
    pub navigation_fallback: String,
    /// Origin the paths above resolve against.
    pub origin: Url,
}

impl ProxyConfig {
    /// Resolve an absolute path against the origin.
    pub fn resolve(&self, path: &str) -> Result<Url, Error> {
        self.origin
            .join(path)
            .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
    }
}

/// Result of a successful install.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InstallReport {
    pub cache_name: String,
    /// URLs stored during install, in precache order.
    pub precached: Vec<String>,
    /// Whether the worker asks the host to activate without waiting.
    pub skip_waiting: bool,
}

/// Result of a successful activation.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivateReport {
    pub kept: String,
    /// Superseded generations removed, with all their entries.
    pub deleted: Vec<String>,
    /// Clients that switched to this worker.
    pub claimed: usize,
}

/// Where a fetch response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Live response fetched by the proxy.
    Network,
    /// Stored response, no network involved.
    Cache,
    /// Cached navigation fallback served because the network failed.
    Fallback,
    /// The request bypassed the proxy entirely.
    Passthrough,
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: ProxyResponse,
    pub source: ResponseSource,
}

/// The caching proxy worker.
///
/// Holds no state of its own beyond configuration; everything it learns
/// goes into the durable store.
pub struct CacheProxy<N> {
    config: ProxyConfig,
    db: CacheDb,
    network: N,
}

impl<N: Network> CacheProxy<N> {
    pub fn new(config: ProxyConfig, db: CacheDb, network: N) -> Self {
        Self { config, db, network }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    /// Open the current generation and store every precache path.
    ///
    /// All-or-nothing: a network failure or a non-2xx response for any
    /// path fails the install and stores none of them.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let cache = self.db.open_cache(&self.config.cache_name).await?;

        let requests = self
            .config
            .precache
            .iter()
            .map(|path| Ok((path.as_str(), ProxyRequest::get(self.config.resolve(path)?))))
            .collect::<Result<Vec<_>, Error>>()?;

        let responses = try_join_all(requests.iter().map(|(path, request)| async move {
            let response = self.network.fetch(request).await.map_err(|e| Error::PrecacheFailed {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
            if !response.ok() {
                return Err(Error::PrecacheFailed { path: path.to_string(), reason: format!("status {}", response.status) });
            }
            Ok(response)
        }))
        .await?;

        let precached: Vec<String> = requests.iter().map(|(_, request)| request.cache_url()).collect();
        let pairs = requests.into_iter().map(|(_, request)| request).zip(responses).collect();
        cache.put_all(pairs).await?;

        tracing::info!(cache = %cache.name(), count = precached.len(), "precache complete");

        Ok(InstallReport { cache_name: self.config.cache_name.clone(), precached, skip_waiting: true })
    }

    /// Delete every generation but the current one, then claim open clients.
    ///
    /// Deletions finish before this returns; the first failure aborts.
    pub async fn activate(&self, clients: &Clients) -> Result<ActivateReport, Error> {
        let stale: Vec<String> = self
            .db
            .cache_names()
            .await?
            .into_iter()
            .filter(|name| *name != self.config.cache_name)
            .collect();

        try_join_all(stale.iter().map(|name| self.db.delete_cache(name))).await?;
        for name in &stale {
            tracing::info!(cache = %name, "deleted superseded cache");
        }

        let claimed = clients.claim(&self.config.cache_name).await;

        Ok(ActivateReport { kept: self.config.cache_name.clone(), deleted: stale, claimed })
    }

    /// Answer an intercepted request.
    ///
    /// Navigations are network-first with the cached fallback document;
    /// everything else is cache-first. Background cache writes are
    /// registered on `event`.
    pub async fn fetch(&self, request: &ProxyRequest, event: &mut ExtendableEvent) -> Result<FetchOutcome, Error> {
        if request.is_navigation() { self.network_first(request).await } else { self.cache_first(request, event).await }
    }

    async fn network_first(&self, request: &ProxyRequest) -> Result<FetchOutcome, Error> {
        let network_err = match self.network.fetch(request).await {
            Ok(response) => return Ok(FetchOutcome { response, source: ResponseSource::Network }),
            Err(e) if e.is_network() => e,
            Err(e) => return Err(e),
        };

        tracing::debug!(url = %request.url, "navigation failed, trying fallback: {network_err}");

        let fallback = ProxyRequest::get(self.config.resolve(&self.config.navigation_fallback)?);
        match self.db.match_any(&fallback).await {
            Ok(Some(response)) => Ok(FetchOutcome { response, source: ResponseSource::Fallback }),
            Ok(None) => Err(network_err),
            Err(e) => {
                tracing::warn!(url = %fallback.url, "fallback lookup failed: {e}");
                Err(network_err)
            }
        }
    }

    async fn cache_first(&self, request: &ProxyRequest, event: &mut ExtendableEvent) -> Result<FetchOutcome, Error> {
        if let Some(response) = self.db.match_any(request).await? {
            tracing::debug!(url = %request.url, "cache hit");
            return Ok(FetchOutcome { response, source: ResponseSource::Cache });
        }

        tracing::debug!(url = %request.url, "cache miss");
        let response = self.network.fetch(request).await?;

        let copy = response.clone();
        let db = self.db.clone();
        let cache_name = self.config.cache_name.clone();
        let key = request.clone();
        event.wait_until(async move {
            let stored = async {
                let cache = db.open_cache(&cache_name).await?;
                cache.put(&key, &copy).await
            }
            .await;
            if let Err(e) = &stored {
                tracing::warn!(url = %key.url, "cache write ignored: {e}");
            }
            stored
        });

        Ok(FetchOutcome { response, source: ResponseSource::Network })
    }
}
