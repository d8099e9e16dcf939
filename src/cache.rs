//! Single-slot TTL caches owned by the adapters.
//!
//! Each cache is an explicit object injected into the adapter that uses it,
//! so tests can share, inspect, or pre-seed one. The slot is overwritten
//! wholesale on every successful refresh.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// A cached value and the instant it was stored.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    fetched_at: Instant,
}

/// One value with a freshness window.
///
/// `get_or_refresh` holds the slot's async lock across the refresh, so
/// concurrent callers serialize behind one upstream call instead of
/// dogpiling it.
#[derive(Debug)]
pub struct TtlCache<T> {
    slot: Mutex<Option<CacheEntry<T>>>,
    ttl: Duration,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached value, if still inside the freshness window.
    pub async fn get(&self) -> Option<T> {
        let slot = self.slot.lock().await;
        slot.as_ref()
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| e.value.clone())
    }

    /// The last stored value regardless of age.
    pub async fn get_stale(&self) -> Option<T> {
        let slot = self.slot.lock().await;
        slot.as_ref().map(|e| e.value.clone())
    }

    pub async fn put(&self, value: T) {
        let mut slot = self.slot.lock().await;
        *slot = Some(CacheEntry {
            value,
            fetched_at: Instant::now(),
        });
    }

    /// Drop the slot so the next read refreshes.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        *slot = None;
    }

    /// Serve the cached value while fresh; otherwise run `refresh` and store
    /// its result. A failed refresh falls back to the stale value when one
    /// exists, and only errors when the slot is empty.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(entry) = slot.as_ref() {
            if entry.fetched_at.elapsed() < self.ttl {
                return Ok(entry.value.clone());
            }
        }
        match refresh().await {
            Ok(value) => {
                *slot = Some(CacheEntry {
                    value: value.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(value)
            }
            Err(err) => {
                if let Some(entry) = slot.as_ref() {
                    tracing::warn!(error = ?err, "refresh failed; serving stale cache entry");
                    return Ok(entry.value.clone());
                }
                Err(err)
            }
        }
    }
}
