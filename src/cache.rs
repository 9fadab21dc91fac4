//! A time-windowed map used for the scrape and feed caches.
//!
//! Entries expire `ttl` after insertion. Expired entries are dropped lazily on
//! lookup; there is no background sweeper since every cache is owned by a
//! single session.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// A map whose entries live for a fixed window after insertion.
///
/// Values are cloned out on lookup, so `V` is usually cheap to clone or
/// behind an `Arc`. Lookups take `&mut self` because they evict expired
/// entries.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, (Instant, V)>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create an empty cache whose entries expire `ttl` after insertion.
    /// A zero `ttl` disables caching.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// The live value for `key`, if any.
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Store `value`, replacing any previous entry and restarting its window.
    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    /// Lookup as of `now`; an entry is live while `now - inserted < ttl`.
    pub fn get_at(&mut self, key: &K, now: Instant) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some((inserted, _)) => now.saturating_duration_since(*inserted) >= self.ttl,
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|(_, v)| v.clone())
    }

    /// Insert as of `now`.
    pub fn insert_at(&mut self, key: K, value: V, now: Instant) {
        self.entries.insert(key, (now, value));
    }
}
