//! Core types and shared functionality for sw-proxy.
//!
//! This crate provides:
//! - Generation-scoped response cache with SQLite backend
//! - Request/response model shared by the network layer and the hosts
//! - The caching proxy worker and its lifecycle host
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod network;
pub mod worker;

pub use cache::{CacheDb, CacheEntryMeta, CacheHandle};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Headers, ProxyRequest, ProxyResponse, RequestMode};
pub use network::Network;
pub use worker::{CacheProxy, ProxyConfig, Registration, WorkerEvent, WorkerState};
