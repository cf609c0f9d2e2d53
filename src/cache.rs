//! Process-wide effect-group cache.
//!
//! Readers load an immutable [`CacheSnapshot`] without locking. A refresh
//! builds a complete new snapshot from the [`GroupStore`] and publishes it
//! with one atomic swap, so readers see either the old or the new state and
//! never a half-built map. Refreshes are serialized by a mutex.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::effect::EffectGroup;
use crate::error::StoreError;
use crate::observability::metrics;
use crate::store::GroupStore;

/// Immutable view of every cached group.
#[derive(Debug, Default)]
pub struct CacheSnapshot {
    groups: HashMap<String, Arc<EffectGroup>>,
    halos: HashMap<String, Arc<EffectGroup>>,
}

impl CacheSnapshot {
    /// Full group for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<EffectGroup>> {
        self.groups.get(id)
    }

    /// Halo-only view for `id`.
    #[must_use]
    pub fn get_halo(&self, id: &str) -> Option<&Arc<EffectGroup>> {
        self.halos.get(id)
    }

    /// Number of cached groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn insert(&mut self, group: EffectGroup) {
        let halo = Arc::new(group.halo_view());
        self.halos.insert(group.id.clone(), halo);
        self.groups.insert(group.id.clone(), Arc::new(group));
    }
}

/// Outcome of a refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Ids that were loaded into the cache.
    pub loaded: Vec<String>,
    /// Ids that were skipped, with the reason.
    pub skipped: Vec<(String, String)>,
}

/// Cache of resolved effect groups, shared by every scheduler.
#[derive(Debug)]
pub struct EffectCache {
    snapshot: ArcSwap<CacheSnapshot>,
    refresh_lock: Mutex<()>,
}

impl Default for EffectCache {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(CacheSnapshot::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Rebuilds the cache from `store`.
    ///
    /// A document that fails to load is logged and left out; it never aborts
    /// the refresh.
    ///
    /// # Errors
    ///
    /// Returns the error from [`GroupStore::list_ids`]. The previous snapshot
    /// stays published in that case.
    pub async fn refresh(&self, store: &dyn GroupStore) -> Result<RefreshReport, StoreError> {
        let _guard = self.refresh_lock.lock().await;

        let ids = store.list_ids().await.inspect_err(|e| {
            warn!(error = %e, "effect cache refresh failed; keeping previous snapshot");
        })?;

        let mut next = CacheSnapshot::default();
        let mut report = RefreshReport::default();

        for id in ids {
            match store.load(&id).await {
                Ok(group) => {
                    debug!(group = %id, effects = group.effects.len(), "cached effect group");
                    next.insert(group);
                    report.loaded.push(id);
                }
                Err(e) => {
                    warn!(group = %id, error = %e, "skipping effect group");
                    report.skipped.push((id, e.to_string()));
                }
            }
        }

        let cached = next.len();
        self.snapshot.store(Arc::new(next));
        metrics::record_cache_refresh(cached);
        info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            "effect cache refreshed"
        );
        Ok(report)
    }

    /// Looks up the full group for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<EffectGroup>> {
        self.snapshot.load().get(id).cloned()
    }

    /// Looks up the halo-only view for `id`.
    #[must_use]
    pub fn get_halo(&self, id: &str) -> Option<Arc<EffectGroup>> {
        self.snapshot.load().get_halo(id).cloned()
    }

    /// Current snapshot, for callers that need several consistent lookups.
    #[must_use]
    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        self.snapshot.load_full()
    }

    /// Sorted ids of every cached group.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.snapshot.load().groups.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of cached groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    /// Returns `true` when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }
}
