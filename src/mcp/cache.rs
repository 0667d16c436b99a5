//! Capacity-bounded, least-recently-used keyed store
//!
//! [`BoundedCache`] holds at most `capacity` entries. Inserting a new key into
//! a full cache first evicts the entry with the oldest access time. Access
//! time comes from an injected [`Clock`] so recency can be driven
//! deterministically in tests.
//!
//! All mutation (insert, evict, recency refresh) happens inside one mutex
//! critical section that covers only the map operation. Callers must never
//! build values while holding it; [`BoundedCache::insert_if_absent`] gives
//! them an atomic publish step to use after an unlocked build instead.

use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Source of access timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests and simulations
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock() = at;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Counters exposed for health reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub len: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct CacheEntry<V> {
    value: V,
    last_accessed: DateTime<Utc>,
    // Breaks timestamp ties: lower means touched earlier.
    access_seq: u64,
}

impl<V> CacheEntry<V> {
    fn touch(&mut self, now: DateTime<Utc>, seq: u64) {
        self.last_accessed = now;
        self.access_seq = seq;
    }
}

struct CacheState<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    next_seq: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K: Eq + Hash + Clone, V> CacheState<K, V> {
    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Removes the entry with the smallest `(last_accessed, access_seq)`
    fn evict_lru(&mut self) -> Option<K> {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| (entry.last_accessed, entry.access_seq))
            .map(|(key, _)| key.clone())?;

        self.entries.remove(&victim);
        self.evictions += 1;
        Some(victim)
    }

    /// Inserts a key known to be absent, evicting first when full
    fn insert_new(
        &mut self,
        capacity: usize,
        key: K,
        value: V,
        now: DateTime<Utc>,
        seq: u64,
    ) -> Option<K> {
        let evicted = if self.entries.len() >= capacity {
            self.evict_lru()
        } else {
            None
        };

        self.entries.insert(
            key,
            CacheEntry {
                value,
                last_accessed: now,
                access_seq: seq,
            },
        );

        evicted
    }
}

/// Thread-safe LRU cache with a hard capacity bound
///
/// Values are cloned out on read, so `V` is normally an `Arc`.
///
/// # Invariants
///
/// * `len() <= capacity()` after every operation
/// * the entry evicted on overflow has the oldest access time; equal times
///   fall back to the order in which the entries were last touched
/// * `contains` never changes recency
pub struct BoundedCache<K, V> {
    capacity: NonZeroUsize,
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState<K, V>>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Display,
    V: Clone,
{
    /// Creates an empty cache using the wall clock
    ///
    /// # Errors
    ///
    /// * `ConfigError::InvalidCapacity` - `capacity` is zero
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        Self::with_clock(capacity, Arc::new(SystemClock))
    }

    /// Creates an empty cache reading access times from `clock`
    pub fn with_clock(capacity: usize, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(ConfigError::InvalidCapacity(capacity))?;

        Ok(Self {
            capacity,
            clock,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                next_seq: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        })
    }

    /// Looks up `key`, refreshing its access time when present
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let seq = state.next_seq();

        match state.entries.get_mut(key) {
            Some(entry) => {
                entry.touch(now, seq);
                state.hits += 1;
                Some(entry.value.clone())
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Stores `value` under `key`
    ///
    /// Overwriting an existing key refreshes its access time and never
    /// evicts. Inserting a new key into a full cache evicts exactly one
    /// entry first.
    ///
    /// # Returns
    ///
    /// * `Some(key)` - the key evicted to make room
    /// * `None` - nothing was evicted
    pub fn set(&self, key: K, value: V) -> Option<K> {
        let now = self.clock.now();
        let evicted = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let seq = state.next_seq();

            if let Some(entry) = state.entries.get_mut(&key) {
                entry.value = value;
                entry.touch(now, seq);
                None
            } else {
                state.insert_new(self.capacity.get(), key, value, now, seq)
            }
        };

        if let Some(evicted_key) = &evicted {
            tracing::info!(evicted = %evicted_key, "Evicted least recently used cache entry");
        }

        evicted
    }

    /// Publishes `value` unless another caller got there first
    ///
    /// If `key` is already present the stored value is touched and returned
    /// and `value` is dropped. Otherwise `value` is inserted as in [`set`].
    ///
    /// # Returns
    ///
    /// The value now stored under `key`, and whether `value` was the one
    /// inserted.
    ///
    /// [`set`]: BoundedCache::set
    pub fn insert_if_absent(&self, key: K, value: V) -> (V, bool) {
        let now = self.clock.now();
        let (stored, inserted, evicted) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let seq = state.next_seq();

            if let Some(entry) = state.entries.get_mut(&key) {
                entry.touch(now, seq);
                (entry.value.clone(), false, None)
            } else {
                let stored = value.clone();
                let evicted = state.insert_new(self.capacity.get(), key, value, now, seq);
                (stored, true, evicted)
            }
        };

        if let Some(evicted_key) = &evicted {
            tracing::info!(evicted = %evicted_key, "Evicted least recently used cache entry");
        }

        (stored, inserted)
    }

    /// Membership check without touching recency
    pub fn contains(&self, key: &K) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            len: state.entries.len(),
            capacity: self.capacity.get(),
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn cache_with_clock(capacity: usize) -> (BoundedCache<String, Arc<String>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = BoundedCache::with_clock(capacity, clock.clone()).expect("valid capacity");
        (cache, clock)
    }

    fn value(s: &str) -> Arc<String> {
        Arc::new(s.to_string())
    }

    #[test]
    fn test_zero_capacity_is_config_error() {
        let result = BoundedCache::<String, Arc<String>>::new(0);
        assert!(matches!(result, Err(ConfigError::InvalidCapacity(0))));
    }

    #[test]
    fn test_evicts_least_recently_inserted() {
        let (cache, clock) = cache_with_clock(2);

        cache.set("u1".to_string(), value("a"));
        clock.advance(Duration::seconds(1));
        cache.set("u2".to_string(), value("b"));
        clock.advance(Duration::seconds(1));
        let evicted = cache.set("u3".to_string(), value("c"));

        assert_eq!(evicted.as_deref(), Some("u1"));
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&"u1".to_string()));
        assert!(cache.contains(&"u2".to_string()));
        assert!(cache.contains(&"u3".to_string()));
    }

    #[test]
    fn test_get_protects_entry_from_eviction() {
        let (cache, clock) = cache_with_clock(2);

        cache.set("u1".to_string(), value("a"));
        clock.advance(Duration::seconds(1));
        cache.set("u2".to_string(), value("b"));
        clock.advance(Duration::seconds(1));
        assert!(cache.get(&"u1".to_string()).is_some());
        clock.advance(Duration::seconds(1));
        let evicted = cache.set("u3".to_string(), value("c"));

        assert_eq!(evicted.as_deref(), Some("u2"));
        assert!(cache.contains(&"u1".to_string()));
        assert!(!cache.contains(&"u2".to_string()));
        assert!(cache.contains(&"u3".to_string()));
    }

    #[test]
    fn test_touched_first_key_survives_and_oldest_untouched_goes() {
        let capacity = 5;
        let (cache, clock) = cache_with_clock(capacity);

        cache.set("k0".to_string(), value("0"));
        for i in 1..capacity {
            clock.advance(Duration::seconds(1));
            cache.set(format!("k{}", i), value("x"));
            clock.advance(Duration::seconds(1));
            cache.get(&"k0".to_string());
        }

        clock.advance(Duration::seconds(1));
        let evicted = cache.set("k_new".to_string(), value("new"));

        assert_eq!(evicted.as_deref(), Some("k1"));
        assert!(cache.contains(&"k0".to_string()));
        assert_eq!(cache.len(), capacity);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let (cache, clock) = cache_with_clock(3);

        for i in 0..20 {
            clock.advance(Duration::milliseconds(10));
            cache.set(format!("user-{}", i), value("v"));
            assert!(cache.len() <= cache.capacity());
        }

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().evictions, 17);
    }

    #[test]
    fn test_capacity_one_replaces_sole_entry() {
        let (cache, _clock) = cache_with_clock(1);

        cache.set("u1".to_string(), value("a"));
        let evicted = cache.set("u2".to_string(), value("b"));

        assert_eq!(evicted.as_deref(), Some("u1"));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&"u2".to_string()));
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let (cache, _clock) = cache_with_clock(2);

        cache.set("u1".to_string(), value("a"));
        cache.set("u2".to_string(), value("b"));
        let evicted = cache.set("u1".to_string(), value("a2"));

        assert_eq!(evicted, None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"u1".to_string()).as_deref().map(String::as_str), Some("a2"));
    }

    #[test]
    fn test_overwrite_refreshes_recency() {
        let (cache, clock) = cache_with_clock(2);

        cache.set("u1".to_string(), value("a"));
        clock.advance(Duration::seconds(1));
        cache.set("u2".to_string(), value("b"));
        clock.advance(Duration::seconds(1));
        cache.set("u1".to_string(), value("a2"));
        clock.advance(Duration::seconds(1));

        assert_eq!(cache.set("u3".to_string(), value("c")).as_deref(), Some("u2"));
    }

    #[test]
    fn test_contains_does_not_refresh_recency() {
        let (cache, clock) = cache_with_clock(2);

        cache.set("u1".to_string(), value("a"));
        clock.advance(Duration::seconds(1));
        cache.set("u2".to_string(), value("b"));
        clock.advance(Duration::seconds(1));
        assert!(cache.contains(&"u1".to_string()));

        assert_eq!(cache.set("u3".to_string(), value("c")).as_deref(), Some("u1"));
    }

    #[test]
    fn test_equal_timestamps_evict_earliest_touched() {
        // Clock never moves, so only the access order separates entries.
        let (cache, _clock) = cache_with_clock(2);

        cache.set("u1".to_string(), value("a"));
        cache.set("u2".to_string(), value("b"));
        cache.get(&"u1".to_string());

        assert_eq!(cache.set("u3".to_string(), value("c")).as_deref(), Some("u2"));
    }

    #[test]
    fn test_repeated_get_returns_same_value() {
        let (cache, _clock) = cache_with_clock(2);
        cache.set("u1".to_string(), value("a"));

        let first = cache.get(&"u1".to_string()).expect("cached");
        let second = cache.get(&"u1".to_string()).expect("cached");

        assert!(Arc::ptr_eq(&first, &second));
        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.len, 1);
    }

    #[test]
    fn test_get_missing_is_none() {
        let (cache, _clock) = cache_with_clock(2);
        assert!(cache.get(&"ghost".to_string()).is_none());
        assert_eq!(cache.stats().misses, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_if_absent_keeps_first_value() {
        let (cache, _clock) = cache_with_clock(2);

        let first = value("winner");
        let (stored, inserted) = cache.insert_if_absent("u1".to_string(), first.clone());
        assert!(inserted);
        assert!(Arc::ptr_eq(&stored, &first));

        let (stored, inserted) = cache.insert_if_absent("u1".to_string(), value("loser"));
        assert!(!inserted);
        assert!(Arc::ptr_eq(&stored, &first));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_insert_if_absent_evicts_when_full() {
        let (cache, clock) = cache_with_clock(1);

        cache.insert_if_absent("u1".to_string(), value("a"));
        clock.advance(Duration::seconds(1));
        let (_, inserted) = cache.insert_if_absent("u2".to_string(), value("b"));

        assert!(inserted);
        assert_eq!(cache.len(), 1);
        assert!(!cache.contains(&"u1".to_string()));
    }

    #[test]
    fn test_concurrent_sets_respect_capacity() {
        let cache = Arc::new(BoundedCache::<String, Arc<String>>::new(8).expect("valid capacity"));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        cache.set(format!("t{}-{}", t, i), Arc::new(String::new()));
                        assert!(cache.len() <= 8);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("thread panicked");
        }

        let stats = cache.stats();
        assert_eq!(stats.len, 8);
        assert_eq!(stats.evictions, 8 * 200 - 8);
    }
}
