// src/poller.rs
//! Per-domain refresh bookkeeping and the background timers that drive it.
//!
//! Each data domain owns a [`DomainState`]: the latest snapshot plus a
//! generation counter and an in-flight guard. Refreshes for one domain never
//! overlap (a second attempt is skipped, not queued), and a completion whose
//! generation has been superseded is discarded instead of clobbering newer
//! data.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::sources::air_quality::AirQualityFeed;
use crate::sources::fires::DetectionSource;
use crate::sources::incidents::IncidentScraper;
use crate::sources::types::{AirQuality, FireDetection, IncidentStats, Sourced};

/// Latest value for one domain plus the flags a consumer renders.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            last_updated: None,
        }
    }
}

/// What a call to [`DomainState::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Snapshot replaced with fresh data.
    Applied,
    /// Fetch failed; error flag set, last good data kept.
    Failed,
    /// Another refresh already in flight; nothing ran.
    Skipped,
    /// Completed after being superseded; result thrown away.
    Discarded,
}

/// Refresh bookkeeping for one data domain.
#[derive(Debug)]
pub struct DomainState<T> {
    name: &'static str,
    snapshot: RwLock<Snapshot<T>>,
    generation: AtomicU64,
    in_flight: Mutex<()>,
}

impl<T: Clone> DomainState<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            snapshot: RwLock::new(Snapshot::default()),
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(()),
        }
    }

    pub async fn snapshot(&self) -> Snapshot<T> {
        self.snapshot.read().await.clone()
    }

    /// Test hook: invalidate the refresh currently in flight so its
    /// completion is discarded without touching the snapshot. Production
    /// refreshes are serialized, so nothing outside tests can supersede one.
    #[cfg(test)]
    fn supersede(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Run one refresh cycle: loading flag up, fetch, then either a snapshot
    /// replace (success) or an error flag with the last good data kept.
    pub async fn refresh<F, Fut>(&self, fetch: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::debug!(domain = self.name, "refresh already in flight; skipping");
            return RefreshOutcome::Skipped;
        };
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut snap = self.snapshot.write().await;
            snap.loading = true;
        }

        let outcome = fetch().await;

        if self.generation.load(Ordering::SeqCst) != generation {
            counter!("poll_discarded_total").increment(1);
            tracing::debug!(domain = self.name, generation, "discarding superseded refresh");
            let mut snap = self.snapshot.write().await;
            snap.loading = false;
            return RefreshOutcome::Discarded;
        }

        let mut snap = self.snapshot.write().await;
        snap.loading = false;
        let result = match outcome {
            Ok(data) => {
                snap.data = Some(data);
                snap.error = None;
                snap.last_updated = Some(Utc::now());
                RefreshOutcome::Applied
            }
            Err(err) => {
                tracing::warn!(domain = self.name, error = ?err, "refresh failed; keeping last snapshot");
                snap.error = Some(format!("{err:#}"));
                RefreshOutcome::Failed
            }
        };
        drop(snap);

        counter!("poll_runs_total").increment(1);
        gauge!("poll_last_run_ts").set(Utc::now().timestamp() as f64);
        result
    }
}

/// Incident stats and air quality travel together as one domain, the way
/// the dashboard renders them.
#[derive(Debug, Clone, Serialize)]
pub struct StatsBundle {
    pub incidents: Sourced<IncidentStats>,
    pub air_quality: Sourced<AirQuality>,
}

/// Serve the stats snapshot, re-scraping first when it is older than
/// `max_age` (or absent). Concurrent callers ride the same in-flight
/// refresh; landing on the domain while it is busy returns the current
/// snapshot as-is.
pub async fn refresh_stats(
    state: &DomainState<StatsBundle>,
    incidents: &IncidentScraper,
    air: &AirQualityFeed,
    max_age: Duration,
) -> Snapshot<StatsBundle> {
    let snap = state.snapshot().await;
    if !needs_refresh(&snap, max_age) {
        return snap;
    }
    state
        .refresh(|| async {
            let (incidents, air_quality) = tokio::join!(incidents.fetch(), air.fetch());
            Ok(StatsBundle {
                incidents,
                air_quality,
            })
        })
        .await;
    state.snapshot().await
}

fn needs_refresh<T>(snap: &Snapshot<T>, max_age: Duration) -> bool {
    match snap.last_updated {
        None => true,
        Some(t) => {
            let age = Utc::now().signed_duration_since(t);
            age >= TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX)
        }
    }
}

/// Owns the background timers; aborting them is the teardown path.
#[derive(Default)]
pub struct Poller {
    handles: Vec<JoinHandle<()>>,
}

impl Poller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire-detection timer: refresh immediately, then on every interval
    /// tick. The fetch date rolls over with the wall clock.
    pub fn spawn_fires(
        &mut self,
        state: Arc<DomainState<Vec<FireDetection>>>,
        feed: Arc<dyn DetectionSource>,
        interval: Duration,
    ) {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let source = feed.clone();
                let date = Utc::now().date_naive();
                let outcome = state
                    .refresh(|| async move { source.fetch_latest(date).await })
                    .await;
                let count = state.snapshot().await.data.map(|d| d.len()).unwrap_or(0);
                tracing::info!(
                    target: "poll",
                    domain = "fires",
                    source = feed.name(),
                    ?outcome,
                    detections = count,
                    "fire poll tick"
                );
            }
        });
        self.handles.push(handle);
    }

    /// Cancel every timer. Idempotent.
    pub fn shutdown(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.shutdown();
    }
}
