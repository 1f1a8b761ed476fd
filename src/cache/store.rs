//! Keyed query storage.
//!
//! Every entry holds the last loaded value, the last load error, a timestamp
//! and at most one in-flight load. Concurrent readers of the same key share
//! that load; it is spawned on the Tokio runtime so it finishes and populates
//! the cache even if every reader stops waiting.

use std::any::Any;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use metrics::counter;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::config::{CacheConfig, QueryOptions};
use super::keys::QueryKey;
use super::lock::mutex_lock;
use super::observer::QueryObserver;

pub(crate) type Erased = Arc<dyn Any + Send + Sync>;
pub(crate) type LoadResult = Result<Erased, QueryError>;
type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;
pub(crate) type ErasedLoader = Arc<dyn Fn() -> BoxFuture<'static, LoadResult> + Send + Sync>;

const HIT_TOTAL: &str = "roster_query_cache_hit_total";
const MISS_TOTAL: &str = "roster_query_cache_miss_total";
const FETCH_TOTAL: &str = "roster_query_fetch_total";
const FETCH_ERROR_TOTAL: &str = "roster_query_fetch_error_total";
const INVALIDATE_TOTAL: &str = "roster_query_invalidate_total";

/// Failure observed through the query cache.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// The loader failed. Use [`QueryError::downcast_ref`] to inspect it.
    #[error("{0}")]
    Load(Arc<dyn StdError + Send + Sync>),
    #[error("cached value for {key} is not a `{expected}`")]
    TypeMismatch {
        key: QueryKey,
        expected: &'static str,
    },
    #[error("query {key} was removed from the cache")]
    Removed { key: QueryKey },
}

impl QueryError {
    pub fn load<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Load(Arc::new(error))
    }

    /// Borrow the loader's error as its concrete type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Self::Load(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// Point-in-time view of an entry, handed to observers.
#[derive(Clone)]
pub(crate) struct EntrySnapshot {
    pub data: Option<Erased>,
    pub error: Option<QueryError>,
    pub updated_at: Option<Instant>,
    pub invalidated: bool,
    pub is_fetching: bool,
}

struct InFlight {
    id: u64,
    load: SharedLoad,
}

struct Entry {
    data: Option<Erased>,
    error: Option<QueryError>,
    updated_at: Option<Instant>,
    invalidated: bool,
    generation: u64,
    in_flight: Option<InFlight>,
    refetch: Option<ErasedLoader>,
    version: watch::Sender<u64>,
}

impl Entry {
    fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            data: None,
            error: None,
            updated_at: None,
            invalidated: false,
            generation: 0,
            in_flight: None,
            refetch: None,
            version,
        }
    }

    fn fresh_data(&self, now: Instant, stale_time: Duration) -> Option<Erased> {
        if self.invalidated {
            return None;
        }
        let updated_at = self.updated_at?;
        if now.saturating_duration_since(updated_at) < stale_time {
            self.data.clone()
        } else {
            None
        }
    }

    fn has_observers(&self) -> bool {
        self.version.receiver_count() > 0
    }

    fn notify(&self) {
        self.version.send_modify(|version| *version += 1);
    }

    fn snapshot(&self) -> EntrySnapshot {
        EntrySnapshot {
            data: self.data.clone(),
            error: self.error.clone(),
            updated_at: self.updated_at,
            invalidated: self.invalidated,
            is_fetching: self.in_flight.is_some(),
        }
    }
}

struct Inner {
    config: CacheConfig,
    entries: Mutex<HashMap<QueryKey, Entry>>,
    next_load: AtomicU64,
}

impl Inner {
    /// Attach to the entry's in-flight load or start one with `loader`.
    fn join_or_start(self: &Arc<Self>, key: &QueryKey, entry: &mut Entry, loader: &ErasedLoader) -> SharedLoad {
        if let Some(in_flight) = &entry.in_flight {
            debug!(%key, load_id = in_flight.id, "joining in-flight query");
            return in_flight.load.clone();
        }
        let in_flight = self.new_load(key, entry, loader);
        let load = in_flight.load.clone();
        entry.in_flight = Some(in_flight);
        load
    }

    /// Start a background load that nobody awaits directly.
    fn spawn_load(self: &Arc<Self>, key: &QueryKey, entry: &mut Entry, loader: &ErasedLoader) {
        let in_flight = self.new_load(key, entry, loader);
        entry.in_flight = Some(in_flight);
    }

    /// The loader itself runs inside the spawned task, after the entries
    /// lock is released, so it may call back into the client.
    fn new_load(self: &Arc<Self>, key: &QueryKey, entry: &mut Entry, loader: &ErasedLoader) -> InFlight {
        let id = self.next_load.fetch_add(1, Ordering::Relaxed);
        let generation = entry.generation;
        let loader = Arc::clone(loader);
        let weak = Arc::downgrade(self);
        let task_key = key.clone();

        let load = async move {
            let result = loader().await;
            if let Some(inner) = weak.upgrade() {
                inner.settle(&task_key, id, generation, &result);
            }
            result
        }
        .boxed()
        .shared();

        counter!(FETCH_TOTAL).increment(1);
        debug!(%key, load_id = id, generation, "query fetch started");
        entry.notify();
        tokio::spawn(load.clone());
        InFlight { id, load }
    }

    fn settle(self: &Arc<Self>, key: &QueryKey, id: u64, generation: u64, result: &LoadResult) {
        let mut entries = mutex_lock(&self.entries, "settle");
        let Some(entry) = entries.get_mut(key) else {
            debug!(%key, load_id = id, "query removed before its load settled");
            return;
        };
        if entry.in_flight.as_ref().map(|in_flight| in_flight.id) != Some(id) {
            return;
        }
        entry.in_flight = None;

        match result {
            Ok(data) => {
                entry.data = Some(Arc::clone(data));
                entry.error = None;
                entry.updated_at = Some(Instant::now());
                entry.invalidated = entry.generation != generation;
                debug!(%key, load_id = id, stale = entry.invalidated, "query fetch settled");
            }
            Err(error) => {
                counter!(FETCH_ERROR_TOTAL).increment(1);
                warn!(%key, load_id = id, error = %error, "query fetch failed");
                entry.error = Some(error.clone());
            }
        }
        entry.notify();

        // Invalidated mid-flight while someone is still watching: load again.
        if result.is_ok()
            && entry.invalidated
            && entry.has_observers()
            && let Some(loader) = entry.refetch.clone()
        {
            self.spawn_load(key, entry, &loader);
        }
    }
}

/// Shared handle to one query cache. Clones address the same store.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl QueryClient {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                entries: Mutex::new(HashMap::new()),
                next_load: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Return the cached value if it is fresh, otherwise load it once and
    /// share the result with every concurrent caller for `key`.
    pub async fn ensure_data<T, F, Fut, E>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        loader: F,
    ) -> Result<Arc<T>, QueryError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        let pending = {
            let mut entries = mutex_lock(&self.inner.entries, "ensure_data");
            let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
            if let Some(data) = entry.fresh_data(Instant::now(), options.stale_time) {
                counter!(HIT_TOTAL).increment(1);
                debug!(%key, "query cache hit");
                return downcast(&key, data);
            }
            counter!(MISS_TOTAL).increment(1);
            self.inner.join_or_start(&key, entry, &erase(loader))
        };
        downcast(&key, pending.await?)
    }

    /// Load regardless of freshness, joining a load already in flight.
    pub async fn fetch<T, F, Fut, E>(&self, key: QueryKey, loader: F) -> Result<Arc<T>, QueryError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        let pending = self.fetch_erased(&key, &erase(loader));
        downcast(&key, pending.await?)
    }

    /// Subscribe to `key`. The current value, fresh or stale, is available
    /// immediately from the observer; a missing or stale value triggers one
    /// background load. Must be called inside a Tokio runtime.
    pub fn observe<T, F, Fut, E>(&self, key: QueryKey, options: QueryOptions, loader: F) -> QueryObserver<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        let loader = erase(loader);
        let receiver = {
            let mut entries = mutex_lock(&self.inner.entries, "observe");
            let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
            entry.refetch = Some(Arc::clone(&loader));

            if entry.fresh_data(Instant::now(), options.stale_time).is_some() {
                counter!(HIT_TOTAL).increment(1);
            } else {
                counter!(MISS_TOTAL).increment(1);
                if entry.in_flight.is_none() {
                    if entry.data.is_some() {
                        debug!(%key, "serving stale query while revalidating");
                    }
                    self.inner.spawn_load(&key, entry, &loader);
                }
            }
            entry.version.subscribe()
        };
        QueryObserver::new(self.clone(), key, options, loader, receiver)
    }

    /// Cached value regardless of freshness.
    pub fn get_query_data<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let data = {
            let entries = mutex_lock(&self.inner.entries, "get_query_data");
            entries.get(key)?.data.clone()?
        };
        downcast(key, data)
            .inspect_err(|error| warn!(%key, error = %error, "cached query has another type"))
            .ok()
    }

    /// Store `value` as fresh data for `key`.
    pub fn set_query_data<T: Send + Sync + 'static>(&self, key: QueryKey, value: T) {
        self.update_query_data(key, |_: Option<&T>| value);
    }

    /// Replace the value for `key` with `update(current)`, atomically.
    ///
    /// `update` runs while the store is locked and must not call back into
    /// this client.
    pub fn update_query_data<T, F>(&self, key: QueryKey, update: F)
    where
        T: Send + Sync + 'static,
        F: FnOnce(Option<&T>) -> T,
    {
        let mut entries = mutex_lock(&self.inner.entries, "update_query_data");
        let entry = entries.entry(key).or_insert_with(Entry::new);
        let current = entry.data.as_ref().and_then(|data| data.downcast_ref::<T>());
        let next: Erased = Arc::new(update(current));
        entry.data = Some(next);
        entry.error = None;
        entry.updated_at = Some(Instant::now());
        entry.invalidated = false;
        entry.notify();
    }

    /// Mark every entry under `prefix` stale without dropping its data.
    ///
    /// Entries with a live observer are reloaded in the background right
    /// away; the rest reload on their next read. Returns the number of
    /// entries marked.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut entries = mutex_lock(&self.inner.entries, "invalidate");
        let mut marked = 0;
        for (key, entry) in entries.iter_mut().filter(|(key, _)| key.starts_with(prefix)) {
            entry.invalidated = true;
            entry.generation += 1;
            marked += 1;
            entry.notify();

            if entry.in_flight.is_none()
                && entry.has_observers()
                && let Some(loader) = entry.refetch.clone()
            {
                self.inner.spawn_load(key, entry, &loader);
            }
        }

        counter!(INVALIDATE_TOTAL).increment(marked as u64);
        debug!(%prefix, marked, "queries invalidated");
        marked
    }

    /// Drop every entry under `prefix`. Observers of removed entries see
    /// [`QueryError::Removed`].
    pub fn remove(&self, prefix: &QueryKey) -> usize {
        let mut entries = mutex_lock(&self.inner.entries, "remove");
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        debug!(%prefix, removed, "queries removed");
        removed
    }

    /// Run a mutation and, only if it succeeds, invalidate `invalidates`.
    pub async fn write<T, E, Fut>(&self, mutation: Fut, invalidates: &[QueryKey]) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let output = mutation.await?;
        for key in invalidates {
            self.invalidate(key);
        }
        Ok(output)
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.inner.entries, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn fetch_erased(&self, key: &QueryKey, loader: &ErasedLoader) -> SharedLoad {
        let mut entries = mutex_lock(&self.inner.entries, "fetch");
        let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
        self.inner.join_or_start(key, entry, loader)
    }

    pub(crate) fn snapshot(&self, key: &QueryKey) -> Option<EntrySnapshot> {
        mutex_lock(&self.inner.entries, "snapshot")
            .get(key)
            .map(Entry::snapshot)
    }
}

fn erase<T, F, Fut, E>(loader: F) -> ErasedLoader
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: StdError + Send + Sync + 'static,
{
    Arc::new(move || {
        let fetch = loader();
        async move {
            fetch
                .await
                .map(|value| Arc::new(value) as Erased)
                .map_err(QueryError::load)
        }
        .boxed()
    })
}

pub(crate) fn downcast<T: Send + Sync + 'static>(key: &QueryKey, data: Erased) -> Result<Arc<T>, QueryError> {
    data.downcast::<T>().map_err(|_| QueryError::TypeMismatch {
        key: key.clone(),
        expected: std::any::type_name::<T>(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use tokio::time::sleep;

    use super::*;
    use crate::cache::{QueryStatus, UserKeys};

    #[derive(Debug, Error)]
    #[error("upstream failed: {0}")]
    struct Upstream(&'static str);

    fn counting_loader(
        calls: &Arc<AtomicUsize>,
    ) -> impl Fn() -> BoxFuture<'static, Result<Vec<u64>, Upstream>> + Send + Sync + 'static {
        let calls = Arc::clone(calls);
        move || {
            let calls = Arc::clone(&calls);
            async move {
                let call = calls.fetch_add(1, Ordering::SeqCst) as u64;
                sleep(Duration::from_millis(50)).await;
                Ok(vec![call + 1])
            }
            .boxed()
        }
    }

    fn minutes(count: u64) -> QueryOptions {
        QueryOptions::stale_after(Duration::from_secs(count * 60))
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_reads_share_one_load() {
        let client = QueryClient::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let (first, second) = tokio::join!(
            client.ensure_data(UserKeys::lists(), minutes(5), counting_loader(&calls)),
            client.ensure_data(UserKeys::lists(), minutes(5), counting_loader(&calls)),
        );

        let first = first.expect("first read");
        let second = second.expect("second read");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_data_is_served_without_loading() {
        let client = QueryClient::default();
        let calls = Arc::new(AtomicUsize::new(0));

        client
            .ensure_data(UserKeys::lists(), minutes(5), counting_loader(&calls))
            .await
            .expect("load");
        tokio::time::advance(Duration::from_secs(60)).await;
        let cached = client
            .ensure_data(UserKeys::lists(), minutes(5), counting_loader(&calls))
            .await
            .expect("hit");

        assert_eq!(*cached, vec![1]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_data_is_reloaded() {
        let client = QueryClient::default();
        let calls = Arc::new(AtomicUsize::new(0));

        client
            .ensure_data(UserKeys::lists(), minutes(5), counting_loader(&calls))
            .await
            .expect("load");
        tokio::time::advance(Duration::from_secs(5 * 60)).await;
        let reloaded = client
            .ensure_data(UserKeys::lists(), minutes(5), counting_loader(&calls))
            .await
            .expect("reload");

        assert_eq!(*reloaded, vec![2]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_write_invalidates_dependent_reads() {
        let client = QueryClient::default();
        let calls = Arc::new(AtomicUsize::new(0));
        client
            .ensure_data(UserKeys::lists(), minutes(5), counting_loader(&calls))
            .await
            .expect("load");

        let created = client
            .write(async { Ok::<_, Upstream>(11_u64) }, &[UserKeys::lists()])
            .await
            .expect("write");
        assert_eq!(created, 11);

        let after = client
            .ensure_data(UserKeys::lists(), minutes(5), counting_loader(&calls))
            .await
            .expect("reload");
        assert_eq!(*after, vec![2]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_leaves_cache_fresh() {
        let client = QueryClient::default();
        let calls = Arc::new(AtomicUsize::new(0));
        client
            .ensure_data(UserKeys::lists(), minutes(5), counting_loader(&calls))
            .await
            .expect("load");

        let result = client
            .write(async { Err::<u64, _>(Upstream("rejected")) }, &[UserKeys::lists()])
            .await;
        assert!(result.is_err());

        client
            .ensure_data(UserKeys::lists(), minutes(5), counting_loader(&calls))
            .await
            .expect("hit");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation_matches_descendants_only() {
        let client = QueryClient::default();
        client.set_query_data(UserKeys::lists(), vec![1_u64]);
        client.set_query_data(UserKeys::detail(1), 1_u64);
        client.set_query_data(UserKeys::posts(1), vec![10_u64]);
        client.set_query_data(UserKeys::detail(2), 2_u64);

        assert_eq!(client.invalidate(&UserKeys::detail(1)), 2);
        assert_eq!(client.invalidate(&UserKeys::all()), 4);
        assert_eq!(client.len(), 4);
        assert_eq!(client.get_query_data::<u64>(&UserKeys::detail(2)).as_deref(), Some(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_load_keeps_previous_data() {
        let client = QueryClient::default();
        client.set_query_data(UserKeys::detail(3), 3_u64);
        client.invalidate(&UserKeys::detail(3));

        let error = client
            .ensure_data(UserKeys::detail(3), minutes(5), || async {
                Err::<u64, _>(Upstream("offline"))
            })
            .await
            .expect_err("load fails");

        assert_eq!(error.downcast_ref::<Upstream>().map(|e| e.0), Some("offline"));
        assert_eq!(client.get_query_data::<u64>(&UserKeys::detail(3)).as_deref(), Some(&3));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_load_still_populates_cache() {
        let client = QueryClient::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let read = client.ensure_data(UserKeys::lists(), minutes(5), counting_loader(&calls));
        let timed_out = tokio::time::timeout(Duration::from_millis(10), read).await;
        assert!(timed_out.is_err());

        sleep(Duration::from_millis(100)).await;
        assert_eq!(
            client.get_query_data::<Vec<u64>>(&UserKeys::lists()).as_deref(),
            Some(&vec![1])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn type_mismatch_is_reported() {
        let client = QueryClient::default();
        client.set_query_data(UserKeys::detail(4), "four".to_string());

        let error = client
            .ensure_data(UserKeys::detail(4), minutes(5), || async { Ok::<u64, Upstream>(4) })
            .await
            .expect_err("mismatch");
        assert!(matches!(error, QueryError::TypeMismatch { .. }));
        assert!(client.get_query_data::<u64>(&UserKeys::detail(4)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn observer_serves_stale_data_while_revalidating() {
        let client = QueryClient::default();
        let calls = Arc::new(AtomicUsize::new(0));
        client.set_query_data(UserKeys::lists(), vec![0_u64]);
        tokio::time::advance(Duration::from_secs(10 * 60)).await;

        let mut observer = client.observe(UserKeys::lists(), minutes(5), counting_loader(&calls));
        let state = observer.state();
        assert_eq!(state.data.as_deref(), Some(&vec![0]));
        assert!(state.is_stale);
        assert!(state.is_fetching);
        assert_eq!(state.status, QueryStatus::Success);

        let state = observer.settled().await.expect("settled");
        assert_eq!(state.data.as_deref(), Some(&vec![1]));
        assert!(!state.is_stale);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation_refetches_observed_queries() {
        let client = QueryClient::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut observer = client.observe(UserKeys::lists(), minutes(5), counting_loader(&calls));
        observer.settled().await.expect("first load");

        client.invalidate(&UserKeys::all());
        let state = observer.state();
        assert!(state.is_fetching);

        let state = observer.settled().await.expect("refetch");
        assert_eq!(state.data.as_deref(), Some(&vec![2]));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation_during_load_triggers_another_load() {
        let client = QueryClient::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut observer = client.observe(UserKeys::lists(), minutes(5), counting_loader(&calls));

        client.invalidate(&UserKeys::lists());
        let state = observer.settled().await.expect("settled");

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(state.data.as_deref(), Some(&vec![2]));
        assert!(!state.is_stale);
    }

    #[tokio::test(start_paused = true)]
    async fn removing_a_query_ends_its_observers() {
        let client = QueryClient::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut observer = client.observe(UserKeys::detail(9), minutes(5), counting_loader(&calls));
        observer.settled().await.expect("loaded");

        assert_eq!(client.remove(&UserKeys::details()), 1);
        assert!(client.is_empty());
        assert!(matches!(observer.changed().await, Err(QueryError::Removed { .. })));
        assert_eq!(observer.state().status, QueryStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn removed_observer_ignores_a_reloaded_key() {
        let client = QueryClient::default();
        client.set_query_data(UserKeys::detail(1), 1_u64);
        let mut observer = client.observe(UserKeys::detail(1), minutes(5), || async {
            Ok::<u64, Upstream>(1)
        });

        client.remove(&UserKeys::detail(1));
        let reloaded = client
            .ensure_data(UserKeys::detail(1), minutes(5), || async { Ok::<u64, Upstream>(2) })
            .await
            .expect("reloaded");
        assert_eq!(*reloaded, 2);
        client.set_query_data(UserKeys::detail(1), 3_u64);

        let state = observer.state();
        assert_eq!(state.status, QueryStatus::Error);
        assert!(state.data.is_none());
        assert!(matches!(state.error, Some(QueryError::Removed { .. })));
        assert!(matches!(observer.changed().await, Err(QueryError::Removed { .. })));
        assert!(matches!(observer.refetch().await, Err(QueryError::Removed { .. })));
        assert_eq!(client.get_query_data::<u64>(&UserKeys::detail(1)).as_deref(), Some(&3));
    }

    #[tokio::test(start_paused = true)]
    async fn refetch_recovers_from_a_failed_load() {
        let client = QueryClient::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = {
            let calls = Arc::clone(&calls);
            move || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        Err(Upstream("offline"))
                    } else {
                        Ok(vec![1_u64])
                    }
                }
            }
        };

        let mut observer = client.observe(UserKeys::lists(), minutes(5), loader);
        let failed = observer.settled().await.expect("settled");
        assert_eq!(failed.status, QueryStatus::Error);
        assert!(failed.data.is_none());

        let data = observer.refetch().await.expect("retry succeeds");
        assert_eq!(*data, vec![1]);
        let state = observer.state();
        assert_eq!(state.status, QueryStatus::Success);
        assert!(state.error.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn loaders_may_read_the_client_they_fill() {
        let client = QueryClient::default();
        client.set_query_data(UserKeys::detail(1), 41_u64);

        let reader = client.clone();
        let mut observer = client.observe(UserKeys::lists(), minutes(5), move || {
            let seed = reader
                .get_query_data::<u64>(&UserKeys::detail(1))
                .map_or(0, |value| *value);
            async move { Ok::<_, Upstream>(vec![seed + 1]) }
        });

        let state = observer.settled().await.expect("settled");
        assert_eq!(state.data.as_deref(), Some(&vec![42]));
    }

    #[tokio::test(start_paused = true)]
    async fn update_query_data_sees_current_value() {
        let client = QueryClient::default();
        client.set_query_data(UserKeys::lists(), vec![1_u64, 2]);
        client.update_query_data(UserKeys::lists(), |current: Option<&Vec<u64>>| {
            let mut next = vec![3];
            next.extend(current.into_iter().flatten().copied());
            next
        });
        assert_eq!(
            client.get_query_data::<Vec<u64>>(&UserKeys::lists()).as_deref(),
            Some(&vec![3, 1, 2])
        );
    }
}
