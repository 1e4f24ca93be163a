use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::domain::rules::RuleSet;
use crate::pricing::scope::ScopeKey;
use crate::repository::{RepositoryError, RuleRepository};

/// Per-scope snapshot cache in front of a [`RuleRepository`].
///
/// Rule sets change rarely relative to evaluation volume, so each scope key
/// holds one complete snapshot for up to `ttl`. Invariants:
/// - at most one concurrent refresh per scope key (later callers wait on the
///   in-flight refresh and reuse its result),
/// - readers only ever observe a fully loaded snapshot; a refresh swaps the
///   whole `Arc` in one assignment,
/// - a failed refresh propagates the repository error instead of serving an
///   expired snapshot, matching the engine's fail-closed posture.
pub struct RuleSnapshotCache<R> {
    inner: R,
    ttl: Duration,
    entries: RwLock<HashMap<ScopeKey, CacheSlot>>,
}

#[derive(Clone)]
struct CacheSlot {
    snapshot: Option<CachedSnapshot>,
    refresh: Arc<Mutex<()>>,
}

impl Default for CacheSlot {
    fn default() -> Self {
        Self { snapshot: None, refresh: Arc::new(Mutex::new(())) }
    }
}

#[derive(Clone)]
struct CachedSnapshot {
    rules: Arc<RuleSet>,
    loaded_at: Instant,
}

impl<R> RuleSnapshotCache<R>
where
    R: RuleRepository,
{
    pub fn new(inner: R, ttl: Duration) -> Self {
        Self { inner, ttl, entries: RwLock::new(HashMap::new()) }
    }

    pub async fn get(&self, scope: &ScopeKey) -> Result<Arc<RuleSet>, RepositoryError> {
        if let Some(snapshot) = self.fresh_snapshot(scope).await {
            return Ok(snapshot);
        }

        let gate = self.refresh_gate(scope).await;
        let _guard = gate.lock().await;

        // another caller may have refreshed while we waited on the gate
        if let Some(snapshot) = self.fresh_snapshot(scope).await {
            return Ok(snapshot);
        }

        let loaded = Arc::new(self.inner.get_applicable_rules(scope).await?);
        debug!(
            event_name = "pricing.cache.refreshed",
            template_id = scope.template_id.as_ref().map(|id| id.0.as_str()).unwrap_or("any"),
            "rule snapshot refreshed"
        );

        let mut entries = self.entries.write().await;
        let slot = entries.entry(scope.clone()).or_default();
        slot.snapshot =
            Some(CachedSnapshot { rules: Arc::clone(&loaded), loaded_at: Instant::now() });
        Ok(loaded)
    }

    /// Drop the snapshot for one scope; the next `get` reloads it.
    pub async fn invalidate(&self, scope: &ScopeKey) {
        let mut entries = self.entries.write().await;
        if let Some(slot) = entries.get_mut(scope) {
            slot.snapshot = None;
        }
    }

    pub async fn invalidate_all(&self) {
        let mut entries = self.entries.write().await;
        for slot in entries.values_mut() {
            slot.snapshot = None;
        }
    }

    async fn fresh_snapshot(&self, scope: &ScopeKey) -> Option<Arc<RuleSet>> {
        let entries = self.entries.read().await;
        let snapshot = entries.get(scope)?.snapshot.as_ref()?;
        if snapshot.loaded_at.elapsed() < self.ttl {
            Some(Arc::clone(&snapshot.rules))
        } else {
            None
        }
    }

    async fn refresh_gate(&self, scope: &ScopeKey) -> Arc<Mutex<()>> {
        let mut entries = self.entries.write().await;
        Arc::clone(&entries.entry(scope.clone()).or_default().refresh)
    }
}

#[async_trait]
impl<R> RuleRepository for RuleSnapshotCache<R>
where
    R: RuleRepository,
{
    async fn get_applicable_rules(&self, scope: &ScopeKey) -> Result<RuleSet, RepositoryError> {
        Ok(self.get(scope).await?.as_ref().clone())
    }
}
