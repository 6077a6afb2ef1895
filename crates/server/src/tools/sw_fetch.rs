//! sw_fetch tool implementation.
//!
//! Delivers a fetch event to the worker. The response is returned as soon
//! as the worker produces it; cache writes the worker deferred keep running
//! in the background until they settle.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swproxy_core::worker::{EventKind, ExtendableEvent, ResponseSource};
use swproxy_core::{Network, ProxyRequest, Registration, RequestMode};

use super::{ResponseView, json_result};
use crate::error::ToolError;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path such as "/index.html" resolved against the origin.
    pub url: String,

    /// Request mode: "navigate" for page loads, otherwise "no-cors" (default),
    /// "cors" or "same-origin".
    #[serde(default)]
    pub mode: RequestMode,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Identifier of the page issuing the request.
    #[serde(default)]
    pub client_id: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// Where the response came from.
    pub source: ResponseSource,
    pub response: ResponseView,
    /// Background tasks still running when the response was returned.
    pub pending: usize,
}

/// Build the intercepted request from tool parameters.
fn build_request(origin: &url::Url, params: SwFetchParams) -> Result<ProxyRequest, ToolError> {
    if params.method.trim().is_empty() {
        return Err(ToolError::InvalidInput("method cannot be empty".into()));
    }
    let url = swproxy_client::resolve(origin, &params.url).map_err(|e| ToolError::InvalidInput(e.to_string()))?;

    let mut request = ProxyRequest::get(url).with_method(params.method.trim());
    request.mode = params.mode;
    for (name, value) in &params.headers {
        request = request.with_header(name, value);
    }
    if let Some(id) = params.client_id {
        request = request.with_client(id);
    }
    Ok(request)
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl<N: Network>(
    registration: &Registration<N>, params: SwFetchParams,
) -> Result<CallToolResult, McpError> {
    let request = build_request(&registration.proxy().config().origin, params)?;

    let mut lifetime = ExtendableEvent::new(EventKind::Fetch);
    let outcome = registration.fetch(&request, &mut lifetime).await?;

    let output = SwFetchOutput {
        source: outcome.source,
        response: ResponseView::from(&outcome.response),
        pending: lifetime.pending(),
    };

    if lifetime.pending() > 0 {
        tokio::spawn(async move {
            for failure in lifetime.settled().await {
                tracing::warn!("fetch event extension failed: {failure}");
            }
        });
    }

    Ok(json_result(&output)?)
}
