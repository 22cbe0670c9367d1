//! In-memory memoization of loaded price series.
//!
//! Entries are keyed by normalized ticker and date range. With the default
//! [`CachePolicy`] an entry lives until it is invalidated or the cache is
//! dropped; a TTL and an entry bound can be opted into.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, RwLock};

use crate::{DateRange, PriceSeries, Ticker};

/// Cache key: one entry per (ticker, range).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub ticker: Ticker,
    pub range: DateRange,
}

impl SeriesKey {
    pub fn new(ticker: Ticker, range: DateRange) -> Self {
        Self { ticker, range }
    }
}

/// Expiry and size rules for [`SeriesCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CachePolicy {
    /// Entries older than this are treated as absent. `None` never expires.
    pub ttl: Option<Duration>,
    /// Upper bound on stored entries; the oldest fetch is evicted first.
    pub max_entries: Option<usize>,
}

impl CachePolicy {
    /// Keep everything for the lifetime of the cache.
    pub const fn unbounded() -> Self {
        Self {
            ttl: None,
            max_entries: None,
        }
    }

    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub const fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    series: Arc<PriceSeries>,
    fetched_at: OffsetDateTime,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Option<Duration>, now: OffsetDateTime) -> bool {
        match ttl {
            None => true,
            Some(ttl) => now - self.fetched_at <= ttl,
        }
    }
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<SeriesKey, CacheEntry>,
    policy: CachePolicy,
}

impl CacheInner {
    fn get(&self, key: &SeriesKey) -> Option<Arc<PriceSeries>> {
        let now = OffsetDateTime::now_utc();
        self.map
            .get(key)
            .filter(|entry| entry.is_fresh(self.policy.ttl, now))
            .map(|entry| Arc::clone(&entry.series))
    }

    fn put(&mut self, key: SeriesKey, series: Arc<PriceSeries>) {
        let now = OffsetDateTime::now_utc();
        if let Some(ttl) = self.policy.ttl {
            self.map.retain(|_, entry| entry.is_fresh(Some(ttl), now));
        }

        if let Some(max) = self.policy.max_entries {
            while !self.map.contains_key(&key) && self.map.len() >= max.max(1) {
                let oldest = self
                    .map
                    .iter()
                    .min_by_key(|(_, entry)| entry.fetched_at)
                    .map(|(key, _)| key.clone());
                match oldest {
                    Some(oldest) => {
                        tracing::debug!(
                            ticker = %oldest.ticker,
                            range = %oldest.range,
                            "evicting oldest cached series"
                        );
                        self.map.remove(&oldest);
                    }
                    None => break,
                }
            }
        }

        self.map.insert(
            key,
            CacheEntry {
                series,
                fetched_at: now,
            },
        );
    }
}

/// Thread-safe series cache with per-key fetch coordination.
#[derive(Debug, Clone)]
pub struct SeriesCache {
    inner: Arc<RwLock<CacheInner>>,
    inflight: Arc<Mutex<HashMap<SeriesKey, Arc<AsyncMutex<()>>>>>,
}

impl Default for SeriesCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

impl SeriesCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner {
                map: HashMap::new(),
                policy,
            })),
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn policy(&self) -> CachePolicy {
        self.inner.read().await.policy
    }

    /// Cached series for `key`, if present and fresh.
    pub async fn get(&self, key: &SeriesKey) -> Option<Arc<PriceSeries>> {
        self.inner.read().await.get(key)
    }

    /// Stores a series, replacing any previous entry for `key`.
    pub async fn put(&self, key: SeriesKey, series: Arc<PriceSeries>) {
        self.inner.write().await.put(key, series);
    }

    /// Removes the entry for `key`. Returns whether one was stored.
    pub async fn invalidate(&self, key: &SeriesKey) -> bool {
        self.inner.write().await.map.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.inner.write().await.map.clear();
    }

    /// Stored entries, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// When the entry for `key` was stored.
    pub async fn fetched_at(&self, key: &SeriesKey) -> Option<OffsetDateTime> {
        self.inner
            .read()
            .await
            .map
            .get(key)
            .map(|entry| entry.fetched_at)
    }

    /// Waits for exclusive fetch rights on `key`.
    ///
    /// Callers holding the returned guard are the only ones fetching that
    /// key; others queue here and should re-check the cache once admitted.
    /// Cancelling a queued caller releases its claim on the slot.
    pub async fn lock_fetch(&self, key: &SeriesKey) -> FetchGuard {
        let mutex = {
            let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            // slots left behind by callers cancelled after a hand-off
            inflight.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(inflight.entry(key.clone()).or_default())
        };
        let slot = FetchSlot {
            key: key.clone(),
            inflight: Arc::clone(&self.inflight),
            mutex: Some(Arc::clone(&mutex)),
        };
        let lock = mutex.lock_owned().await;
        FetchGuard {
            _lock: lock,
            _slot: slot,
        }
    }

    #[cfg(test)]
    fn inflight_len(&self) -> usize {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Exclusive right to fetch one key, released on drop.
#[derive(Debug)]
pub struct FetchGuard {
    // dropped before the slot so the lock is free when the slot is reclaimed
    _lock: OwnedMutexGuard<()>,
    _slot: FetchSlot,
}

/// One caller's claim on a key's fetch mutex, waiting or holding.
#[derive(Debug)]
struct FetchSlot {
    key: SeriesKey,
    inflight: Arc<Mutex<HashMap<SeriesKey, Arc<AsyncMutex<()>>>>>,
    mutex: Option<Arc<AsyncMutex<()>>>,
}

impl Drop for FetchSlot {
    fn drop(&mut self) {
        drop(self.mutex.take());
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        // only the map holds the slot once nobody is waiting on it
        let idle = inflight
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1);
        if idle {
            inflight.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::PriceObservation;

    fn key(ticker: &str) -> SeriesKey {
        SeriesKey::new(
            Ticker::parse(ticker).expect("ticker"),
            DateRange::new(date!(2023 - 01 - 01), date!(2023 - 01 - 05)).expect("range"),
        )
    }

    fn series(key: &SeriesKey) -> Arc<PriceSeries> {
        let bar = PriceObservation::new(date!(2023 - 01 - 03), 10.0, 11.0, 9.0, 10.5, 1_000)
            .expect("bar");
        Arc::new(PriceSeries::new(key.ticker.clone(), key.range, vec![bar]))
    }

    #[tokio::test]
    async fn stores_and_returns_shared_series() {
        let cache = SeriesCache::default();
        let acme = key("ACME");

        assert!(cache.get(&acme).await.is_none());
        let stored = series(&acme);
        cache.put(acme.clone(), Arc::clone(&stored)).await;

        let hit = cache.get(&acme).await.expect("cached");
        assert!(Arc::ptr_eq(&hit, &stored));
        assert!(cache.fetched_at(&acme).await.is_some());
    }

    #[tokio::test]
    async fn invalidate_and_clear_remove_entries() {
        let cache = SeriesCache::default();
        let acme = key("ACME");
        let goog = key("GOOG");
        cache.put(acme.clone(), series(&acme)).await;
        cache.put(goog.clone(), series(&goog)).await;

        assert!(cache.invalidate(&acme).await);
        assert!(!cache.invalidate(&acme).await);
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn expired_entries_read_as_missing() {
        let cache = SeriesCache::new(CachePolicy::unbounded().with_ttl(Duration::from_millis(50)));
        let acme = key("ACME");
        cache.put(acme.clone(), series(&acme)).await;
        assert!(cache.get(&acme).await.is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get(&acme).await.is_none());
    }

    #[tokio::test]
    async fn bounded_cache_evicts_oldest_fetch() {
        let cache = SeriesCache::new(CachePolicy::unbounded().with_max_entries(2));
        let (a, b, c) = (key("AAA"), key("BBB"), key("CCC"));

        cache.put(a.clone(), series(&a)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.put(b.clone(), series(&b)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.put(c.clone(), series(&c)).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get(&a).await.is_none());
        assert!(cache.get(&b).await.is_some());
        assert!(cache.get(&c).await.is_some());
    }

    #[tokio::test]
    async fn replacing_a_key_does_not_evict_others() {
        let cache = SeriesCache::new(CachePolicy::unbounded().with_max_entries(2));
        let (a, b) = (key("AAA"), key("BBB"));
        cache.put(a.clone(), series(&a)).await;
        cache.put(b.clone(), series(&b)).await;
        cache.put(a.clone(), series(&a)).await;

        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn fetch_slot_is_released_after_guard_drops() {
        let cache = SeriesCache::default();
        let acme = key("ACME");

        let guard = cache.lock_fetch(&acme).await;
        assert_eq!(cache.inflight_len(), 1);
        drop(guard);
        assert_eq!(cache.inflight_len(), 0);
    }

    #[tokio::test]
    async fn cancelled_waiter_does_not_leave_a_fetch_slot() {
        let cache = SeriesCache::default();
        let acme = key("ACME");
        let holder = cache.lock_fetch(&acme).await;

        // queue a second caller behind the holder, then give up on it
        let mut waiter = Box::pin(cache.lock_fetch(&acme));
        let queued = tokio::time::timeout(Duration::from_millis(10), &mut waiter).await;
        assert!(queued.is_err());

        // the lock is handed to the waiter, which is cancelled before it runs
        drop(holder);
        assert_eq!(cache.inflight_len(), 1);
        drop(waiter);
        assert_eq!(cache.inflight_len(), 0);

        // the key can be locked again afterwards
        let again = tokio::time::timeout(Duration::from_secs(1), cache.lock_fetch(&acme)).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn waiter_cancelled_while_holder_runs_is_cleaned_up_on_release() {
        let cache = SeriesCache::default();
        let acme = key("ACME");
        let holder = cache.lock_fetch(&acme).await;

        let waited =
            tokio::time::timeout(Duration::from_millis(10), cache.lock_fetch(&acme)).await;
        assert!(waited.is_err());
        assert_eq!(cache.inflight_len(), 1);

        drop(holder);
        assert_eq!(cache.inflight_len(), 0);
    }
}
