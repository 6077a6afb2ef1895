//! MCP tool implementations.
//!
//! Lifecycle and fetch tools deliver events to the registered worker;
//! cache tools read the store directly.

pub mod cache;
pub mod sw_clients;
pub mod sw_fetch;
pub mod sw_lifecycle;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swproxy_core::ProxyResponse;

use crate::error::ToolError;

/// A response as returned to the tool caller.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResponseView {
    /// URL the response was produced for, after redirects.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    /// Body as text; omitted when it is not valid UTF-8.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Exact body bytes, standard base64.
    pub body_base64: String,
    /// Body size in bytes.
    pub size: usize,
}

impl From<&ProxyResponse> for ResponseView {
    fn from(response: &ProxyResponse) -> Self {
        Self {
            url: response.url.clone(),
            status: response.status,
            status_text: response.status_text.clone(),
            headers: response.headers.clone(),
            body: std::str::from_utf8(&response.body).ok().map(str::to_string),
            body_base64: STANDARD.encode(&response.body),
            size: response.body.len(),
        }
    }
}

/// Serialize a tool output as a pretty JSON text result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, ToolError> {
    let json = serde_json::to_string_pretty(output)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Pull the JSON text back out of a successful tool result.
#[cfg(test)]
pub(crate) fn result_json(result: &CallToolResult) -> serde_json::Value {
    let text = result.content[0]
        .as_text()
        .map(|t| t.text.clone())
        .unwrap_or_default();
    serde_json::from_str(&text).unwrap()
}
