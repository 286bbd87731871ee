//! In-process short-TTL memoization, the second half of C1's responsibility
//! (spec §5 "Shared resources": per-provider caches in memory guarded by a
//! per-provider lock with a double-checked short TTL).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry<T> {
    value: T,
    expires_at: Instant,
}

/// A small per-key memo table with a single TTL, e.g. one per operation
/// (`waiting_times`, `routes`, `vehicles`) on a provider adapter.
pub struct MemoCache<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry<T>>>,
}

impl<T: Clone> MemoCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Double-checked read: a second caller racing the same miss will simply
    /// redo the fetch, which is cheaper than holding the lock across an
    /// await point.
    pub fn get(&self, key: &str) -> Option<T> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).filter(|e| Instant::now() < e.expires_at).map(|e| e.value.clone())
    }

    pub fn set(&self, key: impl Into<String>, value: T) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.into(),
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// The most recent value for `key`, even if its TTL has lapsed. Used for
    /// the rate-limiter back-pressure fallback (spec §5): serve stale data
    /// rather than block or queue.
    pub fn get_stale(&self, key: &str) -> Option<T> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).map(|e| e.value.clone())
    }

    /// Seeds `key` with an already-expired entry, so `get()` misses but
    /// `get_stale()` still returns it. Test-only: exercises the rate-limiter
    /// back-pressure path, which `set` (fresh for `ttl`) cannot reach.
    #[cfg(test)]
    pub fn set_stale(&self, key: impl Into<String>, value: T) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.into(),
            Entry {
                value,
                expires_at: Instant::now() - Duration::from_secs(1),
            },
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fresh_value_is_returned() {
        let cache: MemoCache<i32> = MemoCache::new(Duration::from_secs(60));
        cache.set("a", 1);
        assert_eq!(cache.get("a"), Some(1));
    }

    #[test]
    fn expired_value_is_a_miss_but_still_available_stale() {
        let cache: MemoCache<i32> = MemoCache::new(Duration::from_millis(0));
        cache.set("a", 1);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get_stale("a"), Some(1));
    }
}
