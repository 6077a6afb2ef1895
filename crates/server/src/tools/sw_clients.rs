//! sw_client_close tool implementation.
//!
//! Tells the host a page has gone away so it stops tracking the client.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swproxy_core::{Network, Registration};

use super::json_result;
use crate::error::ToolError;

/// Parameters for the sw_client_close tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientCloseParams {
    /// Identifier the page used as `client_id` on its fetches.
    pub client_id: String,
}

/// Output from the sw_client_close tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientCloseOutput {
    pub client_id: String,
    /// False if the host did not know this client.
    pub closed: bool,
    /// Clients still open.
    pub clients: usize,
}

/// Implementation of the sw_client_close tool.
pub async fn client_close_impl<N: Network>(
    registration: &Registration<N>, params: ClientCloseParams,
) -> Result<CallToolResult, McpError> {
    let client_id = params.client_id.trim();
    if client_id.is_empty() {
        return Err(ToolError::InvalidInput("client_id cannot be empty".into()).into());
    }

    let closed = registration.clients().disconnect(client_id).await;
    tracing::debug!(client = %client_id, closed, "client closed");

    let output = ClientCloseOutput {
        client_id: client_id.to_string(),
        closed,
        clients: registration.clients().len().await,
    };
    Ok(json_result(&output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::result_json;
    use crate::tools::sw_fetch::{SwFetchParams, fetch_impl};
    use crate::tools::testing::registration;
    use swproxy_core::RequestMode;

    fn close(id: &str) -> ClientCloseParams {
        ClientCloseParams { client_id: id.into() }
    }

    fn fetch_from(client_id: &str, mode: RequestMode) -> SwFetchParams {
        SwFetchParams {
            url: "/favicon.png".into(),
            mode,
            method: "GET".into(),
            headers: Default::default(),
            client_id: Some(client_id.into()),
        }
    }

    #[tokio::test]
    async fn test_closing_clients_keeps_registry_bounded() {
        let reg = registration("keyword-pro-v2").await;
        reg.update().await.unwrap();

        for i in 0..50 {
            let id = format!("tab-{i}");
            fetch_impl(&reg, fetch_from(&id, RequestMode::NoCors)).await.unwrap();
            let json = result_json(&client_close_impl(&reg, close(&id)).await.unwrap());
            assert_eq!(json["closed"], true);
        }

        assert!(reg.clients().is_empty().await);
    }

    #[tokio::test]
    async fn test_close_controlled_client() {
        let reg = registration("keyword-pro-v2").await;
        reg.update().await.unwrap();
        fetch_impl(&reg, fetch_from("tab-1", RequestMode::Navigate)).await.unwrap();
        assert_eq!(reg.clients().controller("tab-1").await.as_deref(), Some("keyword-pro-v2"));

        let json = result_json(&client_close_impl(&reg, close("tab-1")).await.unwrap());
        assert_eq!(json["clients"], 0);
        assert_eq!(reg.clients().controller("tab-1").await, None);
    }

    #[tokio::test]
    async fn test_close_unknown_client() {
        let reg = registration("keyword-pro-v2").await;
        let json = result_json(&client_close_impl(&reg, close("tab-9")).await.unwrap());
        assert_eq!(json["closed"], false);
    }

    #[tokio::test]
    async fn test_close_rejects_empty_id() {
        let reg = registration("keyword-pro-v2").await;
        let err = client_close_impl(&reg, close("  ")).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
