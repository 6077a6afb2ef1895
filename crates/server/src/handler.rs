//! MCP server handler implementation.
//!
//! The host shim for the caching proxy: each tool call is delivered to the
//! registered worker as a lifecycle or fetch event, or inspects its store.
use std::sync::Arc;

use crate::tools::cache::{CacheMatchParams, list_impl, match_impl};
use crate::tools::sw_clients::{ClientCloseParams, client_close_impl};
use crate::tools::sw_fetch::{SwFetchParams, fetch_impl};
use crate::tools::sw_lifecycle::{activate_impl, install_impl, status_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swproxy_client::FetchClient;
use swproxy_core::Registration;

/// The main MCP server handler for sw-proxy.
#[derive(Clone)]
pub struct ProxyServer {
    tool_router: ToolRouter<Self>,
    registration: Arc<Registration<FetchClient>>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ProxyServer {
    /// Create a new server handler around a registered worker.
    pub fn new(registration: Arc<Registration<FetchClient>>) -> Self {
        Self { tool_router: Self::tool_router(), registration }
    }

    #[tool(description = "Report the worker's lifecycle state, cache generation and open client count.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(self.registration.as_ref()).await
    }

    /// Deliver an install event: open the current cache generation and precache
    /// its static resources, then activate if the worker skips waiting.
    #[tool(description = "Install the worker: store every precache path in the current cache generation (all-or-nothing), then activate it unless it must wait for older clients.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(self.registration.as_ref()).await
    }

    /// Deliver an activate event: evict superseded generations and claim clients.
    #[tool(description = "Activate an installed worker: delete every other cache generation and claim all open clients.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(self.registration.as_ref()).await
    }

    /// Deliver a fetch event.
    ///
    /// Navigations are network-first with an offline fallback document;
    /// other requests are cache-first and populate the cache on a miss.
    #[tool(description = "Fetch a URL or origin-relative path through the caching proxy. mode=navigate uses network-first with offline fallback; other modes are cache-first.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(self.registration.as_ref(), params.0).await
    }

    #[tool(description = "Tell the host a page has closed so it stops tracking that client_id.")]
    async fn sw_client_close(&self, params: Parameters<ClientCloseParams>) -> Result<CallToolResult, McpError> {
        client_close_impl(self.registration.as_ref(), params.0).await
    }

    #[tool(description = "List cache generations and the entries stored in each.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(self.registration.proxy().db()).await
    }

    #[tool(description = "Look up the stored response for a URL or origin-relative path without touching the network.")]
    async fn cache_match(&self, params: Parameters<CacheMatchParams>) -> Result<CallToolResult, McpError> {
        match_impl(self.registration.proxy(), params.0).await
    }
}

impl ServerHandler for ProxyServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "sw-proxy".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
