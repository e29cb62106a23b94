//! Time-bounded cache of whole rendered pages.
//!
//! Entries are keyed by path and query string. A hit is served without
//! running the handler, so pages may be stale for up to the TTL; [`PageCache::clear`]
//! drops everything at once.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes, to_bytes},
    extract::State,
    http::{HeaderMap, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct CachedPage {
    headers: HeaderMap,
    body: Bytes,
    stored_at: Instant,
}

/// Page cache shared by all requests.
#[derive(Clone)]
pub struct PageCache {
    entries: Arc<RwLock<HashMap<String, CachedPage>>>,
    ttl: Duration,
}

impl PageCache {
    /// Create an empty cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh headers and body stored under `key`.
    pub async fn get(&self, key: &str) -> Option<(HeaderMap, Bytes)> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|page| page.stored_at.elapsed() < self.ttl)
            .map(|page| (page.headers.clone(), page.body.clone()))
    }

    /// Store a page under `key`, replacing any previous entry.
    pub async fn insert(&self, key: String, headers: HeaderMap, body: Bytes) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CachedPage {
                headers,
                body,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
        debug!("Page cache cleared");
    }

    /// Drop expired entries.
    pub async fn purge_expired(&self) {
        let ttl = self.ttl;
        self.entries
            .write()
            .await
            .retain(|_, page| page.stored_at.elapsed() < ttl);
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Serve GET requests from the cache, populating it on a miss.
///
/// Only `200 OK` responses are stored.
pub async fn cache_pages(
    State(cache): State<PageCache>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.method() != Method::GET {
        return next.run(req).await;
    }

    let key = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_string(), ToString::to_string);

    if let Some((headers, body)) = cache.get(&key).await {
        debug!(key = %key, "Page cache hit");
        return (StatusCode::OK, headers, body).into_response();
    }

    debug!(key = %key, "Page cache miss");
    let response = next.run(req).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let body = match to_bytes(body, usize::MAX).await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, key = %key, "Failed to buffer page for caching");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    cache.purge_expired().await;
    cache.insert(key, parts.headers.clone(), body.clone()).await;

    Response::from_parts(parts, Body::from(body))
}
