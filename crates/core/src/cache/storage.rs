//! Named cache generations and per-cache operations.

use tokio_rusqlite::params;

use super::connection::CacheDb;
use super::entries::{self, CacheEntryMeta};
use crate::Error;
use crate::http::{ProxyRequest, ProxyResponse};

/// A single named cache within the store.
#[derive(Clone, Debug)]
pub struct CacheHandle {
    db: CacheDb,
    name: String,
}

impl CacheDb {
    /// Open the named cache, creating it if absent.
    pub async fn open_cache(&self, name: &str) -> Result<CacheHandle, Error> {
        let owned = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
                    params![owned, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(CacheHandle { db: self.clone(), name: name.to_string() })
    }

    /// Whether a cache with this name exists.
    pub async fn has_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of every cache, in creation order.
    pub async fn cache_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a cache and every entry in it.
    ///
    /// Returns false if no cache had that name.
    pub async fn delete_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Match a request against every cache, oldest cache first.
    pub async fn match_any(&self, request: &ProxyRequest) -> Result<Option<ProxyResponse>, Error> {
        let request = request.clone();
        self.conn
            .call(move |conn| entries::find_match(conn, None, &request))
            .await
            .map_err(Error::from)
    }
}

impl CacheHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stored response selected by `request`, if any.
    pub async fn match_request(&self, request: &ProxyRequest) -> Result<Option<ProxyResponse>, Error> {
        let name = self.name.clone();
        let request = request.clone();
        self.db
            .conn
            .call(move |conn| entries::find_match(conn, Some(&name), &request))
            .await
            .map_err(Error::from)
    }

    /// Store `response` under `request`, replacing what the request selected before.
    pub async fn put(&self, request: &ProxyRequest, response: &ProxyResponse) -> Result<(), Error> {
        entries::check_storable(request, response)?;

        let name = self.name.clone();
        let request = request.clone();
        let response = response.clone();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                entries::insert(&tx, &name, &request, &response)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store every pair in one transaction: either all land or none do.
    pub async fn put_all(&self, pairs: Vec<(ProxyRequest, ProxyResponse)>) -> Result<(), Error> {
        for (request, response) in &pairs {
            entries::check_storable(request, response)?;
        }

        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for (request, response) in &pairs {
                    entries::insert(&tx, &name, request, response)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the entries `request` selects. Returns true if any were removed.
    pub async fn delete(&self, request: &ProxyRequest) -> Result<bool, Error> {
        let name = self.name.clone();
        let request = request.clone();
        self.db
            .conn
            .call(move |conn| entries::remove_matching(conn, &name, &request))
            .await
            .map_err(Error::from)
            .map(|count| count > 0)
    }

    /// Summaries of every entry in this cache.
    pub async fn keys(&self) -> Result<Vec<CacheEntryMeta>, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| entries::list(conn, &name))
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn get(path: &str) -> ProxyRequest {
        ProxyRequest::get(Url::parse("https://example.com").unwrap().join(path).unwrap())
    }

    fn ok(path: &str, body: &'static str) -> ProxyResponse {
        ProxyResponse::new(format!("https://example.com{path}"), 200, body).with_header("content-type", "text/plain")
    }

    #[tokio::test]
    async fn test_open_creates_once() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(!db.has_cache("v1").await.unwrap());

        db.open_cache("v1").await.unwrap();
        db.open_cache("v1").await.unwrap();

        assert!(db.has_cache("v1").await.unwrap());
        assert_eq!(db.cache_names().await.unwrap(), vec!["v1".to_string()]);
    }

    #[tokio::test]
    async fn test_cache_names_creation_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_cache("b").await.unwrap();
        db.open_cache("a").await.unwrap();
        assert_eq!(db.cache_names().await.unwrap(), vec!["b".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("v1").await.unwrap();

        cache.put(&get("/app.js"), &ok("/app.js", "console.log(1)")).await.unwrap();

        let hit = cache.match_request(&get("/app.js")).await.unwrap().unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.body.as_ref(), b"console.log(1)");
        assert_eq!(hit.content_type(), Some("text/plain"));

        assert!(cache.match_request(&get("/missing.js")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_match_ignores_fragment() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("v1").await.unwrap();
        cache.put(&get("/archive.html"), &ok("/archive.html", "list")).await.unwrap();

        assert!(cache.match_request(&get("/archive.html#latest")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("v1").await.unwrap();

        cache.put(&get("/style.css"), &ok("/style.css", "old")).await.unwrap();
        cache.put(&get("/style.css"), &ok("/style.css", "new")).await.unwrap();

        let hit = cache.match_request(&get("/style.css")).await.unwrap().unwrap();
        assert_eq!(hit.body.as_ref(), b"new");
        assert_eq!(cache.keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_rejects_non_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("v1").await.unwrap();

        let result = cache.put(&get("/analyze").with_method("POST"), &ok("/analyze", "{}")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(cache.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_rejects_partial_response() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("v1").await.unwrap();

        let partial = ProxyResponse::new("https://example.com/video.mp4", 206, "chunk");
        let result = cache.put(&get("/video.mp4"), &partial).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_non_get_never_matches() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("v1").await.unwrap();
        cache.put(&get("/analyze"), &ok("/analyze", "{}")).await.unwrap();

        assert!(cache.match_request(&get("/analyze").with_method("POST")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_vary_aware_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("v1").await.unwrap();

        let korean = get("/index.html").with_header("Accept-Language", "ko-KR");
        let english = get("/index.html").with_header("Accept-Language", "en-US");
        let response = ok("/index.html", "안녕").with_header("Vary", "Accept-Language");

        cache.put(&korean, &response).await.unwrap();

        assert!(cache.match_request(&korean).await.unwrap().is_some());
        assert!(cache.match_request(&english).await.unwrap().is_none());

        cache
            .put(&english, &ok("/index.html", "hello").with_header("Vary", "Accept-Language"))
            .await
            .unwrap();
        assert_eq!(cache.keys().await.unwrap().len(), 2);
        let hit = cache.match_request(&english).await.unwrap().unwrap();
        assert_eq!(hit.body.as_ref(), b"hello");
    }

    #[tokio::test]
    async fn test_vary_star_rejected() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("v1").await.unwrap();

        let result = cache.put(&get("/live"), &ok("/live", "x").with_header("Vary", "*")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_put_all_is_atomic() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("v1").await.unwrap();

        let pairs = vec![
            (get("/favicon.png"), ok("/favicon.png", "png")),
            (get("/submit").with_method("POST"), ok("/submit", "nope")),
        ];
        assert!(cache.put_all(pairs).await.is_err());
        assert!(cache.keys().await.unwrap().is_empty());

        let pairs = vec![(get("/favicon.png"), ok("/favicon.png", "png")), (get("/index.html"), ok("/index.html", "<html>"))];
        cache.put_all(pairs).await.unwrap();
        assert_eq!(cache.keys().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("v1").await.unwrap();
        cache.put(&get("/app.js"), &ok("/app.js", "x")).await.unwrap();

        assert!(cache.delete(&get("/app.js")).await.unwrap());
        assert!(!cache.delete(&get("/app.js")).await.unwrap());
        assert!(cache.match_request(&get("/app.js")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_cache_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let v1 = db.open_cache("v1").await.unwrap();
        v1.put(&get("/app.js"), &ok("/app.js", "old")).await.unwrap();

        assert!(db.delete_cache("v1").await.unwrap());
        assert!(!db.delete_cache("v1").await.unwrap());
        assert!(db.match_any(&get("/app.js")).await.unwrap().is_none());

        let reopened = db.open_cache("v1").await.unwrap();
        assert!(reopened.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_into_deleted_cache_fails() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let v1 = db.open_cache("v1").await.unwrap();
        db.delete_cache("v1").await.unwrap();

        assert!(v1.put(&get("/app.js"), &ok("/app.js", "x")).await.is_err());
    }

    #[tokio::test]
    async fn test_match_any_prefers_oldest_cache() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let v1 = db.open_cache("v1").await.unwrap();
        let v2 = db.open_cache("v2").await.unwrap();
        v2.put(&get("/app.js"), &ok("/app.js", "v2")).await.unwrap();
        v1.put(&get("/app.js"), &ok("/app.js", "v1")).await.unwrap();

        let hit = db.match_any(&get("/app.js")).await.unwrap().unwrap();
        assert_eq!(hit.body.as_ref(), b"v1");
    }

    #[tokio::test]
    async fn test_keys_metadata() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("v1").await.unwrap();
        cache.put(&get("/favicon.png"), &ok("/favicon.png", "12345")).await.unwrap();

        let keys = cache.keys().await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].cache_name, "v1");
        assert_eq!(keys[0].url, "https://example.com/favicon.png");
        assert_eq!(keys[0].method, "GET");
        assert_eq!(keys[0].size, 5);
        assert_eq!(keys[0].content_type.as_deref(), Some("text/plain"));
    }
}
