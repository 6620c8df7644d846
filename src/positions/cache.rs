use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Map whose entries expire a fixed time after insertion.
///
/// Expired entries are invisible to [`TtlCache::get`] but stay allocated
/// until they are overwritten or [`TtlCache::purge_expired`] runs.
pub struct TtlCache<K, V, C = SystemClock> {
    entries: HashMap<K, Entry<V>>,
    ttl: Duration,
    clock: C,
}

impl<K: Eq + Hash, V> TtlCache<K, V, SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<K: Eq + Hash, V, C: Clock> TtlCache<K, V, C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            clock,
        }
    }

    fn is_fresh(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) < self.ttl
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let now = self.clock.now();
        self.entries
            .get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| &entry.value)
    }

    /// Time left before `key` expires, `None` when absent or already stale.
    pub fn remaining<Q>(&self, key: &Q) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let now = self.clock.now();
        let entry = self.entries.get(key)?;
        let age = now.saturating_duration_since(entry.stored_at);
        self.ttl.checked_sub(age).filter(|left| !left.is_zero())
    }

    pub fn insert(&mut self, key: K, value: V) {
        let stored_at = self.clock.now();
        self.entries.insert(key, Entry { value, stored_at });
    }

    pub fn invalidate<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.remove(key).map(|entry| entry.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drops every stale entry and returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.stored_at) < ttl);
        before - self.entries.len()
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[derive(Clone)]
    struct ManualClock {
        now: Rc<Cell<Instant>>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: Rc::new(Cell::new(Instant::now())),
            }
        }

        fn advance(&self, by: Duration) {
            self.now.set(self.now.get() + by);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.now.get()
        }
    }

    fn cache(ttl_secs: u64) -> (TtlCache<String, u32, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (
            TtlCache::with_clock(Duration::from_secs(ttl_secs), clock.clone()),
            clock,
        )
    }

    #[test]
    fn entries_expire_after_ttl() {
        let (mut cache, clock) = cache(30);
        cache.insert("m".to_owned(), 1);
        assert_eq!(cache.get("m"), Some(&1));

        clock.advance(Duration::from_secs(29));
        assert_eq!(cache.get("m"), Some(&1));
        assert_eq!(cache.remaining("m"), Some(Duration::from_secs(1)));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get("m"), None);
        assert_eq!(cache.remaining("m"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn insert_refreshes_the_timestamp() {
        let (mut cache, clock) = cache(10);
        cache.insert("m".to_owned(), 1);
        clock.advance(Duration::from_secs(8));
        cache.insert("m".to_owned(), 2);
        clock.advance(Duration::from_secs(8));
        assert_eq!(cache.get("m"), Some(&2));
    }

    #[test]
    fn invalidate_and_clear_remove_entries() {
        let (mut cache, _clock) = cache(10);
        cache.insert("a".to_owned(), 1);
        cache.insert("b".to_owned(), 2);

        assert_eq!(cache.invalidate("a"), Some(1));
        assert_eq!(cache.invalidate("a"), None);
        assert_eq!(cache.get("b"), Some(&2));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn purge_drops_only_stale_entries() {
        let (mut cache, clock) = cache(10);
        cache.insert("old".to_owned(), 1);
        clock.advance(Duration::from_secs(6));
        cache.insert("new".to_owned(), 2);
        clock.advance(Duration::from_secs(6));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("new"), Some(&2));
    }

    #[test]
    fn zero_ttl_never_serves() {
        let (mut cache, _clock) = cache(0);
        cache.insert("m".to_owned(), 1);
        assert_eq!(cache.get("m"), None);
    }
}
