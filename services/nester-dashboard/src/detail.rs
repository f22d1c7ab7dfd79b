//! Detail Cache: memoized per-probe detail fetched on demand
//!
//! Each id owns a slot holding a `watch` channel of its entry. The first
//! `get` for an id spawns the fetch; every concurrent `get` subscribes to the
//! same slot and waits for it to settle. `invalidate` detaches the slot, so a
//! fetch still in flight answers its own waiters but never repopulates the map.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;

use crate::client::ApiClient;
use crate::error::Result;
use crate::model::{ProbeLogs, Report, Timestamp};

/// Loads one kind of detail for an entity id
#[async_trait]
pub trait DetailFetcher<T>: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<T>;
}

/// Cached state of one entity's detail
#[derive(Debug, PartialEq)]
pub struct DetailEntry<T> {
    pub loading: bool,
    /// Last successful payload, kept across later failures and refetches
    pub payload: Option<Arc<T>>,
    pub error: Option<String>,
    pub fetched_at: Option<Timestamp>,
}

impl<T> DetailEntry<T> {
    fn loading() -> Self {
        Self {
            loading: true,
            payload: None,
            error: None,
            fetched_at: None,
        }
    }

    fn abandoned() -> Self {
        Self {
            loading: false,
            payload: None,
            error: Some("detail fetch abandoned".to_string()),
            fetched_at: None,
        }
    }
}

impl<T> Clone for DetailEntry<T> {
    fn clone(&self) -> Self {
        Self {
            loading: self.loading,
            payload: self.payload.clone(),
            error: self.error.clone(),
            fetched_at: self.fetched_at,
        }
    }
}

type EntrySender<T> = Arc<watch::Sender<DetailEntry<T>>>;

struct Slot<T> {
    tx: EntrySender<T>,
    /// Set once a fetch succeeds and a TTL is configured
    expires_at: Option<Instant>,
}

struct CacheInner<T> {
    name: &'static str,
    fetcher: Arc<dyn DetailFetcher<T>>,
    ttl: Option<Duration>,
    slots: Mutex<HashMap<String, Slot<T>>>,
}

/// Cloneable handle to a detail cache
pub struct DetailCache<T> {
    inner: Arc<CacheInner<T>>,
}

impl<T> Clone for DetailCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync + 'static> DetailCache<T> {
    pub fn new(name: &'static str, fetcher: Arc<dyn DetailFetcher<T>>, ttl: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                name,
                fetcher,
                ttl,
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Cached entry for `id`, fetching it first when missing or expired
    pub async fn get(&self, id: &str) -> DetailEntry<T> {
        let mut rx = self.subscribe(id).await;
        let entry = match rx.wait_for(|entry| !entry.loading).await {
            Ok(entry) => entry.clone(),
            Err(_) => DetailEntry::abandoned(),
        };
        entry
    }

    /// Current entry without triggering a fetch
    pub async fn peek(&self, id: &str) -> Option<DetailEntry<T>> {
        let slots = self.inner.slots.lock().await;
        slots.get(id).map(|slot| slot.tx.borrow().clone())
    }

    /// Forget `id`; the next `get` refetches
    pub async fn invalidate(&self, id: &str) -> bool {
        let removed = self.inner.slots.lock().await.remove(id).is_some();
        if removed {
            tracing::debug!("Invalidated {} detail for '{}'", self.inner.name, id);
        }
        removed
    }

    pub async fn clear(&self) {
        self.inner.slots.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.inner.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn subscribe(&self, id: &str) -> watch::Receiver<DetailEntry<T>> {
        let mut slots = self.inner.slots.lock().await;

        if let Some(slot) = slots.get_mut(id) {
            let expired = slot.expires_at.is_some_and(|at| Instant::now() >= at);
            if !expired || slot.tx.borrow().loading {
                return slot.tx.subscribe();
            }

            tracing::debug!("{} detail for '{}' expired, refetching", self.inner.name, id);
            slot.expires_at = None;
            slot.tx.send_modify(|entry| entry.loading = true);
            let rx = slot.tx.subscribe();
            self.spawn_fetch(id, Arc::clone(&slot.tx));
            return rx;
        }

        let (tx, rx) = watch::channel(DetailEntry::loading());
        let tx = Arc::new(tx);
        slots.insert(
            id.to_string(),
            Slot {
                tx: Arc::clone(&tx),
                expires_at: None,
            },
        );
        self.spawn_fetch(id, tx);
        rx
    }

    fn spawn_fetch(&self, id: &str, tx: EntrySender<T>) {
        let inner = Arc::clone(&self.inner);
        let id = id.to_string();

        tokio::spawn(async move {
            tracing::debug!("Fetching {} detail for '{}'", inner.name, id);
            let result = inner.fetcher.fetch(&id).await;
            let succeeded = result.is_ok();

            tx.send_modify(|entry| {
                entry.loading = false;
                match result {
                    Ok(payload) => {
                        entry.payload = Some(Arc::new(payload));
                        entry.error = None;
                        entry.fetched_at = Some(Utc::now());
                    }
                    Err(e) => {
                        tracing::warn!("Fetching {} detail for '{}' failed: {}", inner.name, id, e);
                        entry.error = Some(e.to_string());
                    }
                }
            });

            if let (true, Some(ttl)) = (succeeded, inner.ttl) {
                let mut slots = inner.slots.lock().await;
                if let Some(slot) = slots.get_mut(&id) {
                    if Arc::ptr_eq(&slot.tx, &tx) {
                        slot.expires_at = Some(Instant::now() + ttl);
                    }
                }
            }
        });
    }
}

/// Log tail of a probe
pub struct LogsFetcher {
    api: Arc<ApiClient>,
}

impl LogsFetcher {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DetailFetcher<ProbeLogs> for LogsFetcher {
    async fn fetch(&self, id: &str) -> Result<ProbeLogs> {
        self.api.probe_logs(id).await
    }
}

/// Full latest report of a probe, shown as its equipment list
pub struct EquipmentFetcher {
    api: Arc<ApiClient>,
}

impl EquipmentFetcher {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DetailFetcher<Report> for EquipmentFetcher {
    async fn fetch(&self, id: &str) -> Result<Report> {
        self.api.probe_report(id).await
    }
}

pub type LogsCache = DetailCache<ProbeLogs>;
pub type EquipmentCache = DetailCache<Report>;

pub fn logs_cache(api: Arc<ApiClient>, ttl: Option<Duration>) -> LogsCache {
    DetailCache::new("logs", Arc::new(LogsFetcher::new(api)), ttl)
}

pub fn equipment_cache(api: Arc<ApiClient>, ttl: Option<Duration>) -> EquipmentCache {
    DetailCache::new("equipment", Arc::new(EquipmentFetcher::new(api)), ttl)
}
