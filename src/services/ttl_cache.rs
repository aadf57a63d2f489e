use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// Key-value cache whose entries expire `ttl` after they were last written.
/// Writes are upserts: the last writer wins and re-arms the TTL.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The live value for `key`, if any. Expired entries read as absent.
    pub fn get(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: K, value: V, now: DateTime<Utc>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Clones of every live entry, in no particular order.
    pub fn live_entries(&self, now: DateTime<Utc>) -> Vec<(K, V)>
    where
        K: Clone,
    {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .filter(|(_, entry)| entry.expires_at > now)
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixed_timestamp;

    #[test]
    fn entries_expire_after_the_ttl() {
        let clock = ManualClock::new(fixed_timestamp());
        let cache = TtlCache::new(Duration::hours(24));
        cache.insert("a", 1, clock.now());

        clock.advance(Duration::hours(23));
        assert_eq!(cache.get(&"a", clock.now()), Some(1));

        clock.advance(Duration::hours(1));
        assert_eq!(cache.get(&"a", clock.now()), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.purge_expired(clock.now()), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn rewriting_re_arms_the_ttl() {
        let clock = ManualClock::new(fixed_timestamp());
        let cache = TtlCache::new(Duration::hours(1));
        cache.insert("a", 1, clock.now());
        clock.advance(Duration::minutes(50));
        cache.insert("a", 2, clock.now());
        clock.advance(Duration::minutes(50));
        assert_eq!(cache.get(&"a", clock.now()), Some(2));
    }

    #[test]
    fn live_entries_skip_expired_ones() {
        let clock = ManualClock::new(fixed_timestamp());
        let cache = TtlCache::new(Duration::hours(2));
        cache.insert("old", 1, clock.now());
        clock.advance(Duration::hours(1));
        cache.insert("new", 2, clock.now());
        clock.advance(Duration::hours(1));
        assert_eq!(cache.live_entries(clock.now()), vec![("new", 2)]);
    }

    #[test]
    fn clear_drops_everything() {
        let cache = TtlCache::new(Duration::hours(1));
        let now = fixed_timestamp();
        cache.insert(1, "x", now);
        cache.insert(2, "y", now);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&1, now), None);
    }
}
