//! cache_list tool implementation.
//!
//! Lists cache generations and the entries stored in each.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swproxy_core::{CacheDb, CacheEntryMeta};

use crate::tools::json_result;

/// One cache generation and its entries.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGeneration {
    pub name: String,
    pub entries: Vec<CacheEntryMeta>,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    /// Generations, oldest first.
    pub caches: Vec<CacheGeneration>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(db: &CacheDb) -> Result<CallToolResult, McpError> {
    let mut caches = Vec::new();
    for name in db.cache_names().await? {
        let entries = db.open_cache(&name).await?.keys().await?;
        caches.push(CacheGeneration { name, entries });
    }

    Ok(json_result(&CacheListOutput { caches })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::result_json;
    use swproxy_core::{ProxyRequest, ProxyResponse};
    use url::Url;

    #[tokio::test]
    async fn test_list_empty() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let json = result_json(&list_impl(&db).await.unwrap());
        assert_eq!(json["caches"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_list_generations_with_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_cache("keyword-pro-v1").await.unwrap();
        let current = db.open_cache("keyword-pro-v2").await.unwrap();

        let url = Url::parse("http://127.0.0.1:5000/favicon.png").unwrap();
        let response = ProxyResponse::new(url.as_str(), 200, "png").with_header("content-type", "image/png");
        current.put(&ProxyRequest::get(url), &response).await.unwrap();

        let json = result_json(&list_impl(&db).await.unwrap());
        let caches = json["caches"].as_array().unwrap();
        assert_eq!(caches.len(), 2);
        assert_eq!(caches[0]["name"], "keyword-pro-v1");
        assert_eq!(caches[0]["entries"].as_array().unwrap().len(), 0);
        assert_eq!(caches[1]["name"], "keyword-pro-v2");
        assert_eq!(caches[1]["entries"][0]["url"], "http://127.0.0.1:5000/favicon.png");
        assert_eq!(caches[1]["entries"][0]["content_type"], "image/png");
    }
}
