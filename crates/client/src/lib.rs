//! Network layer for sw-proxy.
//!
//! This crate provides the live HTTP implementation of the core `Network`
//! trait and URL resolution against the proxied application's origin.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, UrlError, canonicalize, resolve};
