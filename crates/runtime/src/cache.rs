//! In-memory result cache keyed by exact query text.
//!
//! Explicitly constructed and injected into the engine so tests can supply
//! isolated instances. No query normalization is performed: two textually
//! different renderings of the same logical query are distinct entries.
//! There is no invalidation API; TTL and capacity bound staleness and
//! memory when configured, with both unset entries live for the process
//! lifetime.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use sightline_common::config::QueryCacheConfig;
use sightline_common::models::Row;
use sightline_error::{Result, SightlineError};

pub struct ResultCache {
    enabled: bool,
    cache: Cache<String, Arc<Vec<Row>>>,
}

impl ResultCache {
    pub fn new(config: &QueryCacheConfig) -> Self {
        let mut builder = Cache::builder();
        if let Some(max_entries) = config.max_entries {
            builder = builder.max_capacity(max_entries);
        }
        if let Some(ttl) = config.ttl_seconds {
            builder = builder.time_to_live(Duration::from_secs(ttl));
        }

        debug!(
            target: "cache",
            enabled = config.enabled,
            max_entries = ?config.max_entries,
            ttl_seconds = ?config.ttl_seconds,
            "Initializing result cache"
        );

        Self {
            enabled: config.enabled,
            cache: builder.build(),
        }
    }

    pub async fn get(&self, sql: &str) -> Option<Arc<Vec<Row>>> {
        if !self.enabled {
            return None;
        }
        self.cache.get(sql).await
    }

    pub async fn insert(&self, sql: String, rows: Arc<Vec<Row>>) {
        if !self.enabled {
            return;
        }
        self.cache.insert(sql, rows).await;
    }

    /// Look up `sql`, running `fetch` on a miss.
    ///
    /// moka's `try_get_with` is atomic per key, so concurrent identical
    /// misses share a single fetch. Errors are returned to every waiter and
    /// never cached.
    pub async fn get_or_fetch<F>(&self, sql: &str, fetch: F) -> Result<Arc<Vec<Row>>>
    where
        F: Future<Output = Result<Vec<Row>>>,
    {
        if !self.enabled {
            return Ok(Arc::new(fetch.await?));
        }

        self.cache
            .try_get_with(sql.to_string(), async move { fetch.await.map(Arc::new) })
            .await
            .map_err(|e: Arc<SightlineError>| e.as_ref().clone())
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}
