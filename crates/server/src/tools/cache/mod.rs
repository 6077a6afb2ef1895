//! Cache-related MCP tools.
//!
//! This module provides read-only tools for inspecting cache storage.

pub mod list;
pub mod matching;

pub use list::list_impl;
pub use matching::{CacheMatchParams, match_impl};
