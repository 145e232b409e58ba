//! Stale-while-revalidate entity cache.
//!
//! One entry per [`EntityKind`]. Reads follow three rules:
//!
//! 1. Younger than the hard TTL: serve the cached value. If it is also older
//!    than the soft TTL, kick off a background refresh.
//! 2. A fetch is already in flight: await it (single-flight).
//! 3. Otherwise start a fetch.
//!
//! Fetches run as spawned tasks, so they complete and populate the cache even
//! when every caller has gone away. Successful fetches are persisted to the
//! session store as `{data, fetchedAt}` and restored by
//! [`EntityCache::hydrate`].
//!
//! ## Example
//!
//! ```rust,ignore
//! let cache = EntityCache::new(api, session, CacheConfig::from_env());
//! cache.hydrate().await;
//!
//! let collections = cache.collections(&creds, FetchMode::Cached).await?;
//! cache.invalidate(EntityKind::Collections).await;
//! ```

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use folio_core::logging::SUBSYSTEM_CACHE;
use folio_core::storage::{load_json, save_json};
use folio_core::{
    defaults, Clock, Collection, Credentials, DocumentApi, DocumentPage, Error, KeyValueStore,
    PageRequest, Result, SystemClock,
};

use crate::config::CacheConfig;

/// Entity types held by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Collections,
    Documents,
}

impl EntityKind {
    pub const ALL: [EntityKind; 2] = [EntityKind::Collections, EntityKind::Documents];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Collections => "collections",
            EntityKind::Documents => "documents",
        }
    }

    /// Session storage key of the persisted snapshot.
    pub fn session_key(&self) -> &'static str {
        match self {
            EntityKind::Collections => defaults::SESSION_KEY_COLLECTIONS,
            EntityKind::Documents => defaults::SESSION_KEY_DOCUMENTS,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a read treats the cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Serve fresh data, join an in-flight fetch, or fetch.
    #[default]
    Cached,
    /// Always issue a new fetch.
    Force,
    /// Like `Cached`, but never schedules a background refresh. Used by
    /// refreshes themselves.
    Background,
}

/// Notification emitted when an entry changes.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    /// A fetch succeeded and replaced the entry.
    Refreshed(EntityKind),
    /// The entry was cleared.
    Invalidated(EntityKind),
    /// A fetch failed. Prior data is untouched.
    FetchFailed { kind: EntityKind, error: String },
}

type SharedFetch<T> = Shared<BoxFuture<'static, Result<Arc<T>>>>;

struct Slot<T> {
    data: Option<Arc<T>>,
    fetched_at: Option<DateTime<Utc>>,
    /// In-flight fetch tagged with its fetch ID.
    inflight: Option<(u64, SharedFetch<T>)>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            data: None,
            fetched_at: None,
            inflight: None,
        }
    }
}

impl<T> Slot<T> {
    /// Cached value and its age in milliseconds.
    fn current(&self, now: DateTime<Utc>) -> Option<(Arc<T>, i64)> {
        match (&self.data, self.fetched_at) {
            (Some(data), Some(at)) => Some((data.clone(), (now - at).num_milliseconds())),
            _ => None,
        }
    }
}

/// Persisted form of an entry.
#[derive(Serialize)]
struct SnapshotRef<'a, T> {
    data: &'a T,
    #[serde(rename = "fetchedAt")]
    fetched_at: i64,
}

#[derive(Deserialize)]
struct Snapshot<T> {
    data: T,
    #[serde(rename = "fetchedAt")]
    fetched_at: i64,
}

/// Binds a cached value type to its slot and its fetch.
trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: EntityKind;

    fn slot(inner: &Inner) -> &Mutex<Slot<Self>>;

    fn fetch(
        api: Arc<dyn DocumentApi>,
        creds: Credentials,
        config: &CacheConfig,
    ) -> BoxFuture<'static, Result<Self>>;
}

impl Entity for Vec<Collection> {
    const KIND: EntityKind = EntityKind::Collections;

    fn slot(inner: &Inner) -> &Mutex<Slot<Self>> {
        &inner.collections
    }

    fn fetch(
        api: Arc<dyn DocumentApi>,
        creds: Credentials,
        _config: &CacheConfig,
    ) -> BoxFuture<'static, Result<Self>> {
        async move { api.list_collections(&creds).await }.boxed()
    }
}

impl Entity for DocumentPage {
    const KIND: EntityKind = EntityKind::Documents;

    fn slot(inner: &Inner) -> &Mutex<Slot<Self>> {
        &inner.documents
    }

    fn fetch(
        api: Arc<dyn DocumentApi>,
        creds: Credentials,
        config: &CacheConfig,
    ) -> BoxFuture<'static, Result<Self>> {
        let page = PageRequest {
            limit: Some(config.documents_page_limit),
            offset: None,
        };
        async move { api.list_documents(page, &creds).await }.boxed()
    }
}

struct Inner {
    api: Arc<dyn DocumentApi>,
    session: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    collections: Mutex<Slot<Vec<Collection>>>,
    documents: Mutex<Slot<DocumentPage>>,
    revalidating: Mutex<HashSet<EntityKind>>,
    last_credentials: Mutex<Option<Credentials>>,
    next_fetch_id: AtomicU64,
    events: broadcast::Sender<CacheEvent>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn ttl_ms(ttl: std::time::Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

/// Shared cache service. Cloning is cheap and every clone sees the same
/// entries.
#[derive(Clone)]
pub struct EntityCache {
    inner: Arc<Inner>,
}

enum Decision<T> {
    Hit { data: Arc<T>, age_ms: i64 },
    Join(SharedFetch<T>),
    Fetch(SharedFetch<T>),
}

impl EntityCache {
    /// Create a cache on the system clock.
    pub fn new(
        api: Arc<dyn DocumentApi>,
        session: Arc<dyn KeyValueStore>,
        config: CacheConfig,
    ) -> Self {
        Self::with_clock(api, session, config, Arc::new(SystemClock))
    }

    /// Create a cache measuring entry age against `clock`.
    pub fn with_clock(
        api: Arc<dyn DocumentApi>,
        session: Arc<dyn KeyValueStore>,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(defaults::EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                api,
                session,
                clock,
                config,
                collections: Mutex::new(Slot::default()),
                documents: Mutex::new(Slot::default()),
                revalidating: Mutex::new(HashSet::new()),
                last_credentials: Mutex::new(None),
                next_fetch_id: AtomicU64::new(1),
                events,
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// The backend this cache fetches from.
    pub fn api(&self) -> Arc<dyn DocumentApi> {
        self.inner.api.clone()
    }

    /// Subscribe to entry changes.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    /// Collections list.
    pub async fn collections(
        &self,
        creds: &Credentials,
        mode: FetchMode,
    ) -> Result<Arc<Vec<Collection>>> {
        self.get_cached::<Vec<Collection>>(creds, mode).await
    }

    /// Documents list (first page of `documents_page_limit` items).
    pub async fn documents(
        &self,
        creds: &Credentials,
        mode: FetchMode,
    ) -> Result<Arc<DocumentPage>> {
        self.get_cached::<DocumentPage>(creds, mode).await
    }

    /// Current collections without fetching.
    pub fn peek_collections(&self) -> Option<Arc<Vec<Collection>>> {
        lock(&self.inner.collections).data.clone()
    }

    /// Current documents without fetching.
    pub fn peek_documents(&self) -> Option<Arc<DocumentPage>> {
        lock(&self.inner.documents).data.clone()
    }

    /// When `kind` was last fetched successfully.
    pub fn fetched_at(&self, kind: EntityKind) -> Option<DateTime<Utc>> {
        match kind {
            EntityKind::Collections => lock(&self.inner.collections).fetched_at,
            EntityKind::Documents => lock(&self.inner.documents).fetched_at,
        }
    }

    /// Whether `kind` holds data older than the soft TTL.
    pub fn is_soft_stale(&self, kind: EntityKind) -> bool {
        let now = self.inner.clock.now();
        let age = match kind {
            EntityKind::Collections => lock(&self.inner.collections).current(now).map(|c| c.1),
            EntityKind::Documents => lock(&self.inner.documents).current(now).map(|c| c.1),
        };
        matches!(age, Some(age) if age > ttl_ms(self.inner.config.soft_ttl))
    }

    /// Credentials of the most recent foreground read.
    pub fn last_credentials(&self) -> Option<Credentials> {
        lock(&self.inner.last_credentials).clone()
    }

    /// Clear `kind` and drop its persisted snapshot.
    pub async fn invalidate(&self, kind: EntityKind) {
        match kind {
            EntityKind::Collections => *lock(&self.inner.collections) = Slot::default(),
            EntityKind::Documents => *lock(&self.inner.documents) = Slot::default(),
        }

        if let Err(e) = self.inner.session.remove(kind.session_key()).await {
            warn!(subsystem = SUBSYSTEM_CACHE, entity = %kind, error = %e, "Failed to remove snapshot");
        }

        debug!(subsystem = SUBSYSTEM_CACHE, entity = %kind, "Cache invalidated");
        let _ = self.inner.events.send(CacheEvent::Invalidated(kind));
    }

    /// Refresh `kind` without blocking the caller. At most one background
    /// refresh per kind runs at a time; failures are logged and dropped.
    pub fn revalidate_in_background(&self, kind: EntityKind, creds: &Credentials) {
        if !lock(&self.inner.revalidating).insert(kind) {
            debug!(subsystem = SUBSYSTEM_CACHE, entity = %kind, "Revalidation already running");
            return;
        }

        let cache = self.clone();
        let creds = creds.clone();
        tokio::spawn(async move {
            let result = match kind {
                EntityKind::Collections => cache
                    .refresh::<Vec<Collection>>(creds)
                    .await
                    .map(|_| ()),
                EntityKind::Documents => cache.refresh::<DocumentPage>(creds).await.map(|_| ()),
            };

            lock(&cache.inner.revalidating).remove(&kind);

            if let Err(e) = result {
                warn!(
                    subsystem = SUBSYSTEM_CACHE,
                    entity = %kind,
                    error = %e,
                    "Background revalidation failed"
                );
            }
        });
    }

    /// Revalidate every soft-stale kind with the last used credentials.
    /// Returns the kinds that were scheduled.
    pub fn revalidate_stale(&self) -> Vec<EntityKind> {
        let creds = self.last_credentials().unwrap_or_default();
        let stale: Vec<EntityKind> = EntityKind::ALL
            .into_iter()
            .filter(|kind| self.is_soft_stale(*kind))
            .collect();

        for kind in &stale {
            self.revalidate_in_background(*kind, &creds);
        }

        if !stale.is_empty() {
            debug!(subsystem = SUBSYSTEM_CACHE, count = stale.len(), "Passive revalidation");
        }
        stale
    }

    /// Restore entries from session snapshots. Malformed snapshots are
    /// ignored. Returns the number of entries restored.
    pub async fn hydrate(&self) -> usize {
        let mut restored = 0;
        if self.hydrate_kind::<Vec<Collection>>().await {
            restored += 1;
        }
        if self.hydrate_kind::<DocumentPage>().await {
            restored += 1;
        }
        info!(subsystem = SUBSYSTEM_CACHE, restored, "Cache hydrated from session");
        restored
    }

    async fn hydrate_kind<T: Entity>(&self) -> bool {
        let key = T::KIND.session_key();
        let Some(snapshot) = load_json::<Snapshot<T>>(self.inner.session.as_ref(), key).await
        else {
            return false;
        };
        let Some(fetched_at) = DateTime::<Utc>::from_timestamp_millis(snapshot.fetched_at) else {
            warn!(subsystem = SUBSYSTEM_CACHE, key, "Discarding snapshot with invalid timestamp");
            return false;
        };

        let mut slot = lock(T::slot(&self.inner));
        slot.data = Some(Arc::new(snapshot.data));
        slot.fetched_at = Some(fetched_at);
        true
    }

    fn remember(&self, creds: &Credentials) {
        *lock(&self.inner.last_credentials) = Some(creds.clone());
    }

    async fn get_cached<T: Entity>(&self, creds: &Credentials, mode: FetchMode) -> Result<Arc<T>> {
        let kind = T::KIND;
        if mode != FetchMode::Background {
            self.remember(creds);
        }

        let decision = {
            let mut slot = lock(T::slot(&self.inner));
            let now = self.inner.clock.now();
            let hit = match mode {
                FetchMode::Force => None,
                _ => slot
                    .current(now)
                    .filter(|(_, age)| *age < ttl_ms(self.inner.config.hard_ttl)),
            };

            let joinable = mode != FetchMode::Force;
            let inflight = slot
                .inflight
                .as_ref()
                .filter(|_| joinable)
                .map(|(_, pending)| pending.clone());

            match (hit, inflight) {
                (Some((data, age_ms)), _) => Decision::Hit { data, age_ms },
                (None, Some(pending)) => Decision::Join(pending),
                (None, None) => Decision::Fetch(self.start_fetch(&mut slot, creds.clone())),
            }
        };

        match decision {
            Decision::Hit { data, age_ms } => {
                debug!(subsystem = SUBSYSTEM_CACHE, entity = %kind, age_ms, "Cache hit");
                if mode == FetchMode::Cached && age_ms > ttl_ms(self.inner.config.soft_ttl) {
                    self.revalidate_in_background(kind, creds);
                }
                Ok(data)
            }
            Decision::Join(pending) => {
                debug!(subsystem = SUBSYSTEM_CACHE, entity = %kind, "Joining in-flight fetch");
                pending.await
            }
            Decision::Fetch(pending) => pending.await,
        }
    }

    /// Join the in-flight fetch of `T`, or start one.
    async fn refresh<T: Entity>(&self, creds: Credentials) -> Result<Arc<T>> {
        let pending = {
            let mut slot = lock(T::slot(&self.inner));
            let inflight = slot.inflight.as_ref().map(|(_, pending)| pending.clone());
            match inflight {
                Some(pending) => pending,
                None => self.start_fetch(&mut slot, creds),
            }
        };
        pending.await
    }

    /// Spawn a fetch and register it as the in-flight fetch of the slot.
    fn start_fetch<T: Entity>(&self, slot: &mut Slot<T>, creds: Credentials) -> SharedFetch<T> {
        let fetch_id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
        debug!(subsystem = SUBSYSTEM_CACHE, entity = %T::KIND, fetch_id, "Starting fetch");

        let cache = self.clone();
        let handle = tokio::spawn(async move { cache.run_fetch::<T>(fetch_id, creds).await });
        let pending: SharedFetch<T> = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(Error::Internal(format!("fetch task failed: {}", e))),
            }
        }
        .boxed()
        .shared();

        slot.inflight = Some((fetch_id, pending.clone()));
        pending
    }

    async fn run_fetch<T: Entity>(self, fetch_id: u64, creds: Credentials) -> Result<Arc<T>> {
        let kind = T::KIND;
        let start = Instant::now();
        let result = T::fetch(self.inner.api.clone(), creds, &self.inner.config).await;

        match result {
            Ok(value) => {
                let data = Arc::new(value);
                let fetched_at = self.inner.clock.now();
                {
                    let mut slot = lock(T::slot(&self.inner));
                    slot.data = Some(data.clone());
                    slot.fetched_at = Some(fetched_at);
                    if matches!(slot.inflight, Some((id, _)) if id == fetch_id) {
                        slot.inflight = None;
                    }
                }

                let snapshot = SnapshotRef {
                    data: data.as_ref(),
                    fetched_at: fetched_at.timestamp_millis(),
                };
                if let Err(e) =
                    save_json(self.inner.session.as_ref(), kind.session_key(), &snapshot).await
                {
                    warn!(subsystem = SUBSYSTEM_CACHE, entity = %kind, error = %e, "Failed to persist snapshot");
                }

                debug!(
                    subsystem = SUBSYSTEM_CACHE,
                    entity = %kind,
                    fetch_id,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Fetch complete"
                );
                let _ = self.inner.events.send(CacheEvent::Refreshed(kind));
                Ok(data)
            }
            Err(e) => {
                {
                    let mut slot = lock(T::slot(&self.inner));
                    if matches!(slot.inflight, Some((id, _)) if id == fetch_id) {
                        slot.inflight = None;
                    }
                }

                debug!(subsystem = SUBSYSTEM_CACHE, entity = %kind, fetch_id, error = %e, "Fetch failed");
                let _ = self.inner.events.send(CacheEvent::FetchFailed {
                    kind,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::mock::{MockDocumentApi, MockOp};
    use folio_core::{ManualClock, MemoryStore};

    fn cache_with(api: MockDocumentApi, clock: Arc<ManualClock>) -> EntityCache {
        EntityCache::with_clock(
            Arc::new(api),
            Arc::new(MemoryStore::new()),
            CacheConfig::default(),
            clock,
        )
    }

    #[test]
    fn test_entity_kind_keys() {
        assert_eq!(EntityKind::Collections.session_key(), "cache.collections.v1");
        assert_eq!(EntityKind::Documents.session_key(), "cache.documents.v1");
        assert_eq!(EntityKind::Documents.to_string(), "documents");
    }

    #[test]
    fn test_slot_age() {
        let now = Utc::now();
        let slot = Slot {
            data: Some(Arc::new(1)),
            fetched_at: Some(now - chrono::Duration::seconds(5)),
            inflight: None,
        };
        let (_, age) = slot.current(now).unwrap();
        assert_eq!(age, 5_000);
        assert!(Slot::<i32>::default().current(now).is_none());
    }

    #[tokio::test]
    async fn test_force_bypasses_fresh_entry() {
        let api = MockDocumentApi::new().with_collection(1, "A");
        let cache = cache_with(api.clone(), Arc::new(ManualClock::default()));
        let creds = Credentials::new();

        cache.collections(&creds, FetchMode::Cached).await.unwrap();
        cache.collections(&creds, FetchMode::Force).await.unwrap();
        assert_eq!(api.calls(MockOp::ListCollections), 2);
    }

    #[tokio::test]
    async fn test_background_mode_does_not_record_credentials() {
        let api = MockDocumentApi::new();
        let cache = cache_with(api, Arc::new(ManualClock::default()));

        cache
            .collections(&Credentials::new().with_token("bg"), FetchMode::Background)
            .await
            .unwrap();
        assert!(cache.last_credentials().is_none());

        cache
            .collections(&Credentials::new().with_token("fg"), FetchMode::Cached)
            .await
            .unwrap();
        assert_eq!(
            cache.last_credentials().and_then(|c| c.token).as_deref(),
            Some("fg")
        );
    }

    #[tokio::test]
    async fn test_documents_fetch_uses_page_limit() {
        let mut api = MockDocumentApi::new();
        for id in 0..120 {
            api = api.with_document(id, &format!("doc-{}.pdf", id), None);
        }
        let cache = cache_with(api, Arc::new(ManualClock::default()));

        let page = cache
            .documents(&Credentials::new(), FetchMode::Cached)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 100);
        assert_eq!(page.total, 120);
    }
}
