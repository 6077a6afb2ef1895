//! cache_match tool implementation.
//!
//! Looks up a stored response without going to the network.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swproxy_core::{CacheProxy, Error, Network, ProxyRequest};

use crate::error::ToolError;
use crate::tools::{ResponseView, json_result};

/// Parameters for the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchParams {
    /// Absolute URL, or a path resolved against the origin.
    pub url: String,

    /// Restrict the lookup to one generation. Searches all, oldest first, when omitted.
    #[serde(default)]
    pub cache_name: Option<String>,

    /// Request headers, used when the stored response varies on them.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Output from the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchOutput {
    pub response: ResponseView,
}

/// Implementation of the cache_match tool.
pub async fn match_impl<N: Network>(proxy: &CacheProxy<N>, params: CacheMatchParams) -> Result<CallToolResult, McpError> {
    let url = swproxy_client::resolve(&proxy.config().origin, &params.url)
        .map_err(|e| ToolError::InvalidInput(e.to_string()))?;

    let mut request = ProxyRequest::get(url);
    for (name, value) in &params.headers {
        request = request.with_header(name, value);
    }

    let db = proxy.db();
    let found = match &params.cache_name {
        Some(name) => {
            if db.has_cache(name).await? {
                db.open_cache(name).await?.match_request(&request).await?
            } else {
                None
            }
        }
        None => db.match_any(&request).await?,
    };
    let response = found.ok_or_else(|| Error::CacheMiss(request.cache_url()))?;

    Ok(json_result(&CacheMatchOutput { response: ResponseView::from(&response) })?)
}
