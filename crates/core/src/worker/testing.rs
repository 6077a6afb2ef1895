//! Scripted in-memory network for exercising the worker without sockets.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::Error;
use crate::http::{ProxyRequest, ProxyResponse};
use crate::network::Network;

pub(crate) const ORIGIN: &str = "https://news.example.com";

pub(crate) fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

enum Route {
    Serve(ProxyResponse),
    /// Transport failure.
    Reset(String),
    /// Failure before anything was sent, such as a request the client cannot build.
    Reject(String),
}

/// Serves scripted responses; unknown paths get a 404 like a real server.
#[derive(Default)]
pub(crate) struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Route>>,
    offline: Mutex<bool>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn serve(&self, path: &str, body: &'static str) {
        let response = ProxyResponse::new(url(path).as_str(), 200, body).with_header("content-type", "text/plain");
        self.respond(path, response);
    }

    pub(crate) fn respond(&self, path: &str, response: ProxyResponse) {
        self.routes.lock().unwrap().insert(url(path).to_string(), Route::Serve(response));
    }

    pub(crate) fn fail(&self, path: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url(path).to_string(), Route::Reset("connection reset".into()));
    }

    pub(crate) fn reject(&self, path: &str, reason: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url(path).to_string(), Route::Reject(reason.into()));
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    pub(crate) fn calls_for(&self, path: &str) -> usize {
        let target = url(path).to_string();
        self.calls.lock().unwrap().iter().filter(|c| **c == target).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error> {
        let key = request.cache_url();
        self.calls.lock().unwrap().push(key.clone());

        if *self.offline.lock().unwrap() {
            return Err(Error::Network(format!("offline: {key}")));
        }

        match self.routes.lock().unwrap().get(&key) {
            Some(Route::Serve(response)) => Ok(response.clone()),
            Some(Route::Reset(reason)) => Err(Error::Network(reason.clone())),
            Some(Route::Reject(reason)) => Err(Error::InvalidInput(reason.clone())),
            None => Ok(ProxyResponse::new(key, 404, "not found")),
        }
    }
}
