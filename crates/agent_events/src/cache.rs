use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, SystemTime};

use crate::clock::{Clock, SystemClock};

/// How long a discovered device id stays valid.
pub const DEVICE_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    stored_at: SystemTime,
}

/// Key/value cache with a fixed time-to-live, owned by a single component.
#[derive(Debug)]
pub struct TtlCache<K, V, C = SystemClock> {
    ttl: Duration,
    clock: C,
    entries: HashMap<K, Entry<V>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V, SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<K: Eq + Hash, V: Clone, C: Clock> TtlCache<K, V, C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            ttl,
            clock,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn insert(&mut self, key: K, value: V) {
        let stored_at = self.clock.now();
        self.entries.insert(key, Entry { value, stored_at });
    }

    /// Returns a live entry; an expired one is evicted.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let entry = self.entries.get(key)?;
        // A clock that went backwards counts as fresh.
        let age = now.duration_since(entry.stored_at).unwrap_or_default();
        if age < self.ttl {
            return Some(entry.value.clone());
        }
        self.entries.remove(key);
        None
    }

    pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, key: K, make: F) -> V {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = make();
        self.insert(key, value.clone());
        value
    }

    pub fn invalidate(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn entries_expire_after_ttl() {
        let clock = ManualClock::default();
        let mut cache = TtlCache::with_clock(DEVICE_CACHE_TTL, clock.clone());
        cache.insert("device", "emulator-5554".to_string());

        clock.advance(Duration::from_secs(299));
        assert_eq!(cache.get(&"device").as_deref(), Some("emulator-5554"));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(&"device"), None);
        assert!(!cache.invalidate(&"device"));
    }

    #[test]
    fn get_or_insert_with_only_computes_on_miss() {
        let clock = ManualClock::default();
        let mut cache = TtlCache::with_clock(Duration::from_secs(10), clock.clone());
        let mut lookups = 0;
        let mut lookup = |cache: &mut TtlCache<&'static str, String, ManualClock>| {
            cache.get_or_insert_with("device", || {
                lookups += 1;
                format!("device-{lookups}")
            })
        };

        assert_eq!(lookup(&mut cache), "device-1");
        assert_eq!(lookup(&mut cache), "device-1");
        clock.advance(Duration::from_secs(10));
        assert_eq!(lookup(&mut cache), "device-2");
        assert_eq!(lookups, 2);
    }

    #[test]
    fn caches_are_independent() {
        let clock = ManualClock::default();
        let mut a = TtlCache::with_clock(DEVICE_CACHE_TTL, clock.clone());
        let b: TtlCache<&str, String, ManualClock> = TtlCache::with_clock(DEVICE_CACHE_TTL, clock);
        a.insert("device", "emulator-5554".to_string());
        assert!(b.entries.is_empty());
        a.clear();
        assert_eq!(a.get(&"device"), None);
    }
}
