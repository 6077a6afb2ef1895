//! Command implementations. Each returns the text to print on stdout.

use anyhow::Context;
use serde_json::json;
use swproxy_client::{FetchClient, FetchConfig};
use swproxy_core::worker::{Clients, EventKind, ExtendableEvent};
use swproxy_core::{AppConfig, CacheDb, CacheProxy, Network, ProxyRequest};

use crate::args::FetchArgs;

/// Open the store and build the worker for the configured generation.
pub async fn build_proxy(config: &AppConfig) -> anyhow::Result<CacheProxy<FetchClient>> {
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache store {}", config.db_path.display()))?;
    let network = FetchClient::new(FetchConfig::from(config))?;
    Ok(CacheProxy::new(config.proxy_config()?, db, network))
}

pub async fn install<N: Network>(proxy: &CacheProxy<N>) -> anyhow::Result<String> {
    let report = proxy.install().await?;
    tracing::info!(cache = %report.cache_name, precached = report.precached.len(), "installed");
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Evict stale generations. No pages are open in a one-shot process,
/// so there is nothing to claim.
pub async fn activate<N: Network>(proxy: &CacheProxy<N>) -> anyhow::Result<String> {
    let report = proxy.activate(&Clients::new()).await?;
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Fetch through the worker and wait for its background cache writes
/// before the process exits.
pub async fn fetch<N: Network>(proxy: &CacheProxy<N>, args: FetchArgs) -> anyhow::Result<String> {
    let url = swproxy_client::resolve(&proxy.config().origin, &args.url)?;
    let mut request = if args.navigate { ProxyRequest::navigate(url) } else { ProxyRequest::get(url) };
    for (name, value) in &args.headers {
        request = request.with_header(name, value);
    }

    let mut lifetime = ExtendableEvent::new(EventKind::Fetch);
    let outcome = proxy.fetch(&request, &mut lifetime).await?;
    for failure in lifetime.settled().await {
        tracing::warn!("cache write failed: {failure}");
    }

    if args.body {
        return Ok(String::from_utf8_lossy(&outcome.response.body).into_owned());
    }

    let summary = json!({
        "source": outcome.source,
        "url": outcome.response.url,
        "status": outcome.response.status,
        "content_type": outcome.response.content_type(),
        "size": outcome.response.body.len(),
    });
    Ok(serde_json::to_string_pretty(&summary)?)
}

pub async fn caches<N: Network>(proxy: &CacheProxy<N>) -> anyhow::Result<String> {
    let db = proxy.db();
    let mut caches = Vec::new();
    for name in db.cache_names().await? {
        let entries = db.open_cache(&name).await?.keys().await?;
        caches.push(json!({ "name": name, "entries": entries }));
    }
    Ok(serde_json::to_string_pretty(&json!({
        "current": proxy.config().cache_name,
        "caches": caches,
    }))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use swproxy_core::{Error, ProxyConfig, ProxyResponse};
    use url::Url;

    struct ShellNetwork;

    #[async_trait]
    impl Network for ShellNetwork {
        async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error> {
            match request.url.path() {
                "/favicon.png" => Ok(ProxyResponse::new(request.url.as_str(), 200, "png")),
                "/index.html" => Ok(ProxyResponse::new(request.url.as_str(), 200, "<html>shell</html>")),
                "/static/app.js" => Ok(ProxyResponse::new(request.url.as_str(), 200, "app")),
                _ => Err(Error::Network("offline".into())),
            }
        }
    }

    async fn proxy(db: CacheDb, cache_name: &str) -> CacheProxy<ShellNetwork> {
        let config = ProxyConfig {
            cache_name: cache_name.into(),
            precache: vec!["/favicon.png".into(), "/index.html".into()],
            navigation_fallback: "/index.html".into(),
            origin: Url::parse("http://127.0.0.1:5000").unwrap(),
        };
        CacheProxy::new(config, db, ShellNetwork)
    }

    fn fetch_args(url: &str) -> FetchArgs {
        FetchArgs { url: url.into(), navigate: false, headers: Vec::new(), body: false }
    }

    #[tokio::test]
    async fn test_install_then_activate_across_generations() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let v1 = proxy(db.clone(), "keyword-pro-v1").await;
        install(&v1).await.unwrap();

        let v2 = proxy(db.clone(), "keyword-pro-v2").await;
        install(&v2).await.unwrap();
        let out: serde_json::Value = serde_json::from_str(&activate(&v2).await.unwrap()).unwrap();
        assert_eq!(out["deleted"], json!(["keyword-pro-v1"]));
        assert_eq!(db.cache_names().await.unwrap(), vec!["keyword-pro-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_waits_for_cache_write() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let proxy = proxy(db, "keyword-pro-v2").await;

        let first: serde_json::Value = serde_json::from_str(&fetch(&proxy, fetch_args("/static/app.js")).await.unwrap()).unwrap();
        assert_eq!(first["source"], "network");

        let second: serde_json::Value = serde_json::from_str(&fetch(&proxy, fetch_args("/static/app.js")).await.unwrap()).unwrap();
        assert_eq!(second["source"], "cache");
        assert_eq!(second["size"], 3);
    }

    #[tokio::test]
    async fn test_fetch_body_and_offline_navigation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let proxy = proxy(db, "keyword-pro-v2").await;
        install(&proxy).await.unwrap();

        let args = FetchArgs { navigate: true, body: true, ..fetch_args("/reports/weekly") };
        assert_eq!(fetch(&proxy, args).await.unwrap(), "<html>shell</html>");
    }

    #[tokio::test]
    async fn test_caches_lists_current_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let proxy = proxy(db, "keyword-pro-v2").await;
        install(&proxy).await.unwrap();

        let out: serde_json::Value = serde_json::from_str(&caches(&proxy).await.unwrap()).unwrap();
        assert_eq!(out["current"], "keyword-pro-v2");
        assert_eq!(out["caches"][0]["entries"].as_array().unwrap().len(), 2);
    }
}
