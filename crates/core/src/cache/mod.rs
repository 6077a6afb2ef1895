//! SQLite-backed storage for named cache generations.
//!
//! Mirrors the host cache-storage API: a set of named caches, each a
//! mapping from request identity to a stored response. It supports:
//!
//! - Open/has/keys/delete by generation name
//! - Vary-aware match and put per cache, and match across all caches
//! - Atomic multi-entry put for install-time precaching
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CacheEntryMeta;
pub use storage::CacheHandle;
