//! Stub network and fixtures shared by the tool tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use swproxy_core::{CacheDb, CacheProxy, Error, Network, ProxyConfig, ProxyRequest, ProxyResponse, Registration};
use url::Url;

pub const ORIGIN: &str = "http://127.0.0.1:5000";

/// Serves fixed bodies by path; unknown paths are 404s.
#[derive(Default)]
pub struct StubNetwork {
    routes: Mutex<HashMap<String, &'static str>>,
    offline: AtomicBool,
}

impl StubNetwork {
    pub fn serve(&self, path: &str, body: &'static str) {
        self.routes.lock().unwrap().insert(path.to_string(), body);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("offline".into()));
        }
        let url = request.url.as_str();
        let body = self.routes.lock().unwrap().get(request.url.path()).copied();
        Ok(match body {
            Some(body) => ProxyResponse::new(url, 200, body),
            None => ProxyResponse::new(url, 404, "not found"),
        })
    }
}

/// A registration for generation `cache_name` over a stub serving the app shell.
pub async fn registration(cache_name: &str) -> Registration<StubNetwork> {
    let network = StubNetwork::default();
    network.serve("/favicon.png", "png");
    network.serve("/index.html", "<html>shell</html>");
    network.serve("/static/app.js", "console.log('app')");

    let db = CacheDb::open_in_memory().await.unwrap();
    let config = ProxyConfig {
        cache_name: cache_name.into(),
        precache: vec!["/favicon.png".into(), "/index.html".into()],
        navigation_fallback: "/index.html".into(),
        origin: Url::parse(ORIGIN).unwrap(),
    };
    Registration::new(CacheProxy::new(config, db, network))
}
