//! Request-identity cache key generation.

use sha2::{Digest, Sha256};

use crate::http::Headers;

/// Compute the store key for a request.
///
/// Identity is the method, the fragment-free URL and the request's values
/// for the headers named by the stored response's `Vary`.
pub fn compute_cache_key(method: &str, url: &str, vary_signature: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    hasher.update(vary_signature.as_bytes());
    hex::encode(hasher.finalize())
}

/// Serialize the request's values for the given `Vary` header names.
///
/// `names` must already be lowercased and sorted. Absent headers
/// contribute an empty value so "missing" and "present" differ.
pub fn vary_signature(names: &[String], headers: &Headers) -> String {
    names
        .iter()
        .map(|name| format!("{name}={}", headers.get(name).map(String::as_str).unwrap_or("")))
        .collect::<Vec<_>>()
        .join("\n")
}
