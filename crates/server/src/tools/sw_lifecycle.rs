//! sw_status, sw_install and sw_activate tool implementations.
//!
//! Deliver lifecycle events to the registered worker and report the result.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swproxy_core::{Network, Registration, WorkerState};

use super::json_result;

/// Output from the sw_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwStatusOutput {
    pub state: WorkerState,
    /// Generation this worker version owns.
    pub cache_name: String,
    /// Generations currently in the store, oldest first.
    pub caches: Vec<String>,
    /// Open clients known to the host.
    pub clients: usize,
}

/// Implementation of the sw_status tool.
pub async fn status_impl<N: Network>(registration: &Registration<N>) -> Result<CallToolResult, McpError> {
    let output = SwStatusOutput {
        state: registration.state().await,
        cache_name: registration.proxy().config().cache_name.clone(),
        caches: registration.proxy().db().cache_names().await?,
        clients: registration.clients().len().await,
    };
    Ok(json_result(&output)?)
}

/// Implementation of the sw_install tool.
///
/// Installs, then activates straight away when the worker skips waiting,
/// so fetches go through the new generation without a separate activate call.
pub async fn install_impl<N: Network>(registration: &Registration<N>) -> Result<CallToolResult, McpError> {
    let report = registration.update().await?;
    Ok(json_result(&report)?)
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl<N: Network>(registration: &Registration<N>) -> Result<CallToolResult, McpError> {
    let report = registration.activate().await?;
    Ok(json_result(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::result_json;
    use crate::tools::sw_fetch::{SwFetchParams, fetch_impl};
    use crate::tools::testing::registration;

    #[tokio::test]
    async fn test_status_before_install() {
        let reg = registration("keyword-pro-v2").await;
        let json = result_json(&status_impl(&reg).await.unwrap());
        assert_eq!(json["state"], "parsed");
        assert_eq!(json["cache_name"], "keyword-pro-v2");
        assert_eq!(json["caches"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_install_activates_when_skipping_waiting() {
        let reg = registration("keyword-pro-v2").await;
        reg.proxy().db().open_cache("keyword-pro-v1").await.unwrap();

        let json = result_json(&install_impl(&reg).await.unwrap());
        assert_eq!(json["install"]["skip_waiting"], true);
        assert_eq!(json["install"]["precached"].as_array().unwrap().len(), 2);
        assert_eq!(json["activation"]["kept"], "keyword-pro-v2");
        assert_eq!(json["activation"]["deleted"][0], "keyword-pro-v1");

        let status = result_json(&status_impl(&reg).await.unwrap());
        assert_eq!(status["state"], "activated");
        assert_eq!(status["caches"], serde_json::json!(["keyword-pro-v2"]));
    }

    #[tokio::test]
    async fn test_install_after_failed_startup_serves_from_cache() {
        let reg = registration("keyword-pro-v2").await;
        reg.proxy().network().set_offline(true);
        assert!(reg.update().await.is_err());
        assert_eq!(reg.state().await, WorkerState::Redundant);

        reg.proxy().network().set_offline(false);
        install_impl(&reg).await.unwrap();
        assert_eq!(reg.state().await, WorkerState::Activated);

        let params = SwFetchParams {
            url: "/favicon.png".into(),
            mode: Default::default(),
            method: "GET".into(),
            headers: Default::default(),
            client_id: None,
        };
        let fetched = result_json(&fetch_impl(&reg, params).await.unwrap());
        assert_eq!(fetched["source"], "cache");
    }

    #[tokio::test]
    async fn test_activate_after_install_is_rejected() {
        let reg = registration("keyword-pro-v2").await;
        install_impl(&reg).await.unwrap();
        let err = activate_impl(&reg).await.unwrap_err();
        assert_eq!(err.code.0, -32014);
    }

    #[tokio::test]
    async fn test_activate_before_install_is_an_error() {
        let reg = registration("keyword-pro-v2").await;
        let err = activate_impl(&reg).await.unwrap_err();
        assert_eq!(err.code.0, -32014);
    }

    #[tokio::test]
    async fn test_install_offline_fails() {
        let reg = registration("keyword-pro-v2").await;
        reg.proxy().network().set_offline(true);

        assert!(install_impl(&reg).await.is_err());
        let status = result_json(&status_impl(&reg).await.unwrap());
        assert_eq!(status["state"], "redundant");
    }
}
