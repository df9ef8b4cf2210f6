//! Query cache keyed by resource path and query string.
//!
//! Reads go through [`QueryCache::get_or_fetch`]; successful mutations drop
//! every entry of the resource they touched so the next read refetches.

use chrono::{DateTime, Utc};
use crm_core::CrmResult;
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    resource: String,
    query: String,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    fetched_at: DateTime<Utc>,
}

/// Invalidation counters observed when a fetch started. A fetch whose
/// resource was invalidated meanwhile must not store its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Generation {
    all: u64,
    resource: u64,
}

pub struct QueryCache {
    entries: DashMap<CacheKey, CacheEntry>,
    /// Per top-level resource, bumped by `invalidate_resource`.
    generations: DashMap<String, u64>,
    /// Bumped by `invalidate_all`.
    epoch: AtomicU64,
    enabled: bool,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Top-level resource of a path: `leads/42` and `leads` both belong to `leads`.
fn resource_of(path: &str) -> &str {
    let path = path.trim_start_matches('/');
    path.split('/').next().unwrap_or(path)
}

impl QueryCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            generations: DashMap::new(),
            epoch: AtomicU64::new(0),
            enabled: true,
        }
    }

    /// A cache that never stores anything; every read hits the network.
    pub fn disabled() -> Self {
        Self {
            entries: DashMap::new(),
            generations: DashMap::new(),
            epoch: AtomicU64::new(0),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn key(path: &str, query: &str) -> CacheKey {
        CacheKey {
            resource: path.trim_matches('/').to_string(),
            query: query.to_string(),
        }
    }

    fn generation(&self, path: &str) -> Generation {
        Generation {
            all: self.epoch.load(Ordering::Acquire),
            resource: self
                .generations
                .get(resource_of(path))
                .map(|g| *g.value())
                .unwrap_or(0),
        }
    }

    pub fn get(&self, path: &str, query: &str) -> Option<serde_json::Value> {
        self.entries
            .get(&Self::key(path, query))
            .map(|e| e.value().value.clone())
    }

    /// When the entry for `(path, query)` was stored.
    pub fn fetched_at(&self, path: &str, query: &str) -> Option<DateTime<Utc>> {
        self.entries
            .get(&Self::key(path, query))
            .map(|e| e.value().fetched_at)
    }

    pub fn insert(&self, path: &str, query: &str, value: serde_json::Value) {
        if !self.enabled {
            return;
        }
        self.entries.insert(
            Self::key(path, query),
            CacheEntry {
                value,
                fetched_at: Utc::now(),
            },
        );
    }

    /// Serve `(path, query)` from the cache or run `fetch` and store its
    /// result. Errors are returned and never cached, and neither is a result
    /// whose resource was invalidated while the fetch was in flight.
    pub async fn get_or_fetch<F, Fut>(&self, path: &str, query: &str, fetch: F) -> CrmResult<serde_json::Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CrmResult<serde_json::Value>>,
    {
        if let Some(hit) = self.get(path, query) {
            metrics::counter!("query_cache.hit").increment(1);
            return Ok(hit);
        }
        metrics::counter!("query_cache.miss").increment(1);
        let started = self.generation(path);
        let value = fetch().await?;
        if self.generation(path) == started {
            self.insert(path, query, value.clone());
        } else {
            debug!(path = %path, query = %query, "Discarding fetch overtaken by invalidation");
        }
        Ok(value)
    }

    /// Drop every entry belonging to the resource of `path`, lists and
    /// details alike. Returns how many were removed.
    pub fn invalidate_resource(&self, path: &str) -> usize {
        let resource = resource_of(path);
        *self.generations.entry(resource.to_string()).or_insert(0) += 1;
        let before = self.entries.len();
        self.entries
            .retain(|key, _| resource_of(&key.resource) != resource);
        let removed = before.saturating_sub(self.entries.len());
        debug!(resource = %resource, removed, "Query cache invalidated");
        removed
    }

    pub fn invalidate_all(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::CrmError;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_get_or_fetch_caches_success_only() {
        let cache = QueryCache::new();
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        for _ in 0..3 {
            let value = cache
                .get_or_fetch("leads", "page=1", move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({ "data": [] }))
                })
                .await
                .unwrap();
            assert_eq!(value, json!({ "data": [] }));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.fetched_at("leads", "page=1").is_some());

        let err = cache
            .get_or_fetch("students", "", || async { Err(CrmError::Transport("down".into())) })
            .await;
        assert!(err.is_err());
        assert!(cache.get("students", "").is_none());
    }

    #[test]
    fn test_invalidate_resource_drops_lists_and_details() {
        let cache = QueryCache::new();
        cache.insert("leads", "page=1", json!(1));
        cache.insert("leads", "page=2", json!(2));
        cache.insert("leads/l1", "", json!(3));
        cache.insert("leads-archive", "", json!(4));
        cache.insert("students", "page=1", json!(5));

        assert_eq!(cache.invalidate_resource("/leads/l1"), 3);
        assert_eq!(cache.len(), 2);
        assert!(cache.get("students", "page=1").is_some());
        assert!(cache.get("leads-archive", "").is_some());

        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_cache_always_fetches() {
        let cache = QueryCache::disabled();
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        for _ in 0..2 {
            cache
                .get_or_fetch("faqs", "", move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(json!([]))
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_overtaken_by_invalidation_is_not_stored() {
        let cache = QueryCache::new();
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let read = cache.get_or_fetch("leads", "page=1", move || async move {
            let _ = started_tx.send(());
            let _ = release_rx.await;
            Ok(json!("before-mutation"))
        });
        let mutate = async {
            started_rx.await.unwrap();
            cache.invalidate_resource("leads/l1");
            release_tx.send(()).unwrap();
        };
        let (value, ()) = tokio::join!(read, mutate);

        assert_eq!(value.unwrap(), json!("before-mutation"));
        assert!(cache.get("leads", "page=1").is_none());

        let refetched = cache
            .get_or_fetch("leads", "page=1", || async { Ok(json!("after-mutation")) })
            .await
            .unwrap();
        assert_eq!(refetched, json!("after-mutation"));
        assert_eq!(cache.get("leads", "page=1"), Some(json!("after-mutation")));
    }

    #[tokio::test]
    async fn test_invalidate_all_also_discards_in_flight_fetch() {
        let cache = QueryCache::new();
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let read = cache.get_or_fetch("students", "", move || async move {
            let _ = started_tx.send(());
            let _ = release_rx.await;
            Ok(json!([]))
        });
        let reset = async {
            started_rx.await.unwrap();
            cache.invalidate_all();
            release_tx.send(()).unwrap();
        };
        let (value, ()) = tokio::join!(read, reset);

        assert!(value.is_ok());
        assert!(cache.is_empty());
    }
}
