//! The network seam the proxy falls through to.

use std::sync::Arc;

use async_trait::async_trait;

use crate::Error;
use crate::http::{ProxyRequest, ProxyResponse};

/// Performs live requests on behalf of the proxy.
///
/// HTTP error statuses are responses, not failures: an implementation
/// returns `Err` only when no response could be obtained at all.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error>;
}

#[async_trait]
impl<N: Network + ?Sized> Network for Arc<N> {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error> {
        (**self).fetch(request).await
    }
}
