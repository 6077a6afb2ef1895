//! Request and response model shared by the proxy, the store and the network layer.
//!
//! Bodies are `Bytes`, so duplicating a response for the cache is a
//! reference-count bump rather than a copy of the payload.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// Header map with lowercased names.
pub type Headers = BTreeMap<String, String>;

/// How the request was initiated by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document load.
    Navigate,
    #[default]
    NoCors,
    Cors,
    SameOrigin,
}

impl RequestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMode::Navigate => "navigate",
            RequestMode::NoCors => "no-cors",
            RequestMode::Cors => "cors",
            RequestMode::SameOrigin => "same-origin",
        }
    }
}

impl std::str::FromStr for RequestMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "navigate" => Ok(RequestMode::Navigate),
            "no-cors" => Ok(RequestMode::NoCors),
            "cors" => Ok(RequestMode::Cors),
            "same-origin" => Ok(RequestMode::SameOrigin),
            other => Err(format!("unknown request mode: {other}")),
        }
    }
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    pub url: Url,
    /// Uppercased HTTP method.
    pub method: String,
    pub mode: RequestMode,
    pub headers: Headers,
    /// Page that issued the request, if the host tracks clients.
    pub client_id: Option<String>,
}

impl ProxyRequest {
    /// A sub-resource GET request.
    pub fn get(url: Url) -> Self {
        Self { url, method: "GET".into(), mode: RequestMode::default(), headers: Headers::new(), client_id: None }
    }

    /// A top-level navigation.
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, ..Self::get(url) }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_ascii_uppercase();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// URL used as the store key; fragments never reach the network.
    pub fn cache_url(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.into()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// A response, either live from the network or read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl ProxyResponse {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            url: url.into(),
            status,
            status_text: String::new(),
            headers: Headers::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// 2xx status.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Lowercased header names listed in `Vary`, sorted and deduplicated.
    pub fn vary_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .header("vary")
            .map(|v| {
                v.split(',')
                    .map(|n| n.trim().to_ascii_lowercase())
                    .filter(|n| !n.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names.dedup();
        names
    }
}
