//! Row-level operations on stored responses.
//!
//! These run on the tokio-rusqlite worker thread inside `Connection::call`,
//! so they take a plain `rusqlite::Connection` and owned inputs.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

use super::hash::{compute_cache_key, vary_signature};
use crate::Error;
use crate::http::{Headers, ProxyRequest, ProxyResponse};

/// Summary of a stored entry, without its body.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheEntryMeta {
    pub cache_name: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub size: usize,
    pub stored_at: String,
}

/// Whether `request` selects an entry stored with these `Vary` names and signature.
fn vary_matches(names: &[String], signature: &str, request: &ProxyRequest) -> bool {
    if names.iter().any(|n| n == "*") {
        return false;
    }
    vary_signature(names, &request.headers) == signature
}

fn split_names(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reject what the cache API refuses to store.
pub(crate) fn check_storable(request: &ProxyRequest, response: &ProxyResponse) -> Result<(), Error> {
    if !request.is_get() {
        return Err(Error::InvalidInput(format!(
            "only GET requests can be cached: {} {}",
            request.method, request.url
        )));
    }
    if !matches!(request.url.scheme(), "http" | "https") {
        return Err(Error::InvalidInput(format!("unsupported scheme: {}", request.url.scheme())));
    }
    if response.status == 206 {
        return Err(Error::InvalidInput(format!("partial response cannot be cached: {}", request.url)));
    }
    if response.vary_names().iter().any(|n| n == "*") {
        return Err(Error::InvalidInput(format!("Vary: * response cannot be cached: {}", request.url)));
    }
    Ok(())
}

/// Find the first stored response that `request` selects.
///
/// With `cache_name` unset, caches are searched in creation order.
pub(crate) fn find_match(
    conn: &rusqlite::Connection, cache_name: Option<&str>, request: &ProxyRequest,
) -> Result<Option<ProxyResponse>, Error> {
    if !request.is_get() {
        return Ok(None);
    }

    let mut stmt = conn.prepare(
        "SELECT e.vary_names, e.vary_signature, e.response_url, e.status, e.status_text, e.headers_json, e.body
         FROM entries e JOIN caches c ON c.name = e.cache_name
         WHERE e.method = 'GET' AND e.url = ?1 AND (?2 IS NULL OR e.cache_name = ?2)
         ORDER BY c.rowid ASC, e.stored_at ASC",
    )?;

    let mut rows = stmt.query(params![request.cache_url(), cache_name])?;
    while let Some(row) = rows.next()? {
        let names = split_names(&row.get::<_, String>(0)?);
        let signature: String = row.get(1)?;
        if !vary_matches(&names, &signature, request) {
            continue;
        }

        let headers_json: String = row.get(5)?;
        let headers: Headers = serde_json::from_str(&headers_json)?;
        let body: Vec<u8> = row.get(6)?;
        return Ok(Some(ProxyResponse {
            url: row.get(2)?,
            status: row.get(3)?,
            status_text: row.get(4)?,
            headers,
            body: Bytes::from(body),
        }));
    }

    Ok(None)
}

/// Delete the entries in `cache_name` that `request` selects.
pub(crate) fn remove_matching(
    conn: &rusqlite::Connection, cache_name: &str, request: &ProxyRequest,
) -> Result<u64, Error> {
    if !request.is_get() {
        return Ok(0);
    }

    let selected: Vec<String> = {
        let mut stmt = conn.prepare(
            "SELECT key_hash, vary_names, vary_signature FROM entries
             WHERE cache_name = ?1 AND method = 'GET' AND url = ?2",
        )?;
        let rows = stmt
            .query_map(params![cache_name, request.cache_url()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .filter(|(_, names, signature)| vary_matches(&split_names(names), signature, request))
            .map(|(key_hash, _, _)| key_hash)
            .collect()
    };

    let mut deleted = 0u64;
    for key_hash in &selected {
        deleted += conn.execute(
            "DELETE FROM entries WHERE cache_name = ?1 AND key_hash = ?2",
            params![cache_name, key_hash],
        )? as u64;
    }
    Ok(deleted)
}

/// Replace whatever `request` selects in `cache_name` with `response`.
pub(crate) fn insert(
    conn: &rusqlite::Connection, cache_name: &str, request: &ProxyRequest, response: &ProxyResponse,
) -> Result<(), Error> {
    remove_matching(conn, cache_name, request)?;

    let url = request.cache_url();
    let names = response.vary_names();
    let signature = vary_signature(&names, &request.headers);
    let key_hash = compute_cache_key("GET", &url, &signature);
    let headers_json = serde_json::to_string(&response.headers)?;

    conn.execute(
        "INSERT INTO entries (
            cache_name, key_hash, method, url, vary_names, vary_signature,
            response_url, status, status_text, headers_json, body, stored_at
        ) VALUES (?1, ?2, 'GET', ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(cache_name, key_hash) DO UPDATE SET
            response_url = excluded.response_url,
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            cache_name,
            key_hash,
            url,
            names.join(","),
            signature,
            &response.url,
            response.status,
            &response.status_text,
            headers_json,
            response.body.as_ref(),
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Entries of one cache in insertion order.
pub(crate) fn list(conn: &rusqlite::Connection, cache_name: &str) -> Result<Vec<CacheEntryMeta>, Error> {
    let mut stmt = conn.prepare(
        "SELECT method, url, status, headers_json, length(body), stored_at FROM entries
         WHERE cache_name = ?1 ORDER BY stored_at ASC, rowid ASC",
    )?;

    let rows = stmt
        .query_map(params![cache_name], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u16>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(method, url, status, headers_json, size, stored_at)| {
            let headers: Headers = serde_json::from_str(&headers_json)?;
            Ok(CacheEntryMeta {
                cache_name: cache_name.to_string(),
                method,
                url,
                status,
                content_type: headers.get("content-type").cloned(),
                size: size as usize,
                stored_at,
            })
        })
        .collect()
}
