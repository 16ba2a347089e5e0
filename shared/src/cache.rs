//! Time-based cache with an injected clock.
//!
//! Owned by whichever service needs it and shared through that service, so
//! tests can drive expiry with a [`ManualClock`].

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct Entry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

/// Key/value cache whose entries expire `ttl` after they were stored.
pub struct TtlCache<K, V, C> {
    entries: RwLock<HashMap<K, Entry<V>>>,
    ttl: Duration,
    clock: C,
}

impl<K, V, C> TtlCache<K, V, C>
where
    K: Eq + Hash,
    V: Clone,
    C: Clock,
{
    pub fn new(ttl: Duration, clock: C) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Cached value, unless missing or expired.
    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if self.clock.now() - entry.stored_at < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub async fn put(&self, key: K, value: V) {
        let entry = Entry {
            value,
            stored_at: self.clock.now(),
        };
        self.entries.write().await.insert(key, entry);
    }

    pub async fn invalidate(&self, key: &K) {
        self.entries.write().await.remove(key);
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-11-24T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn cache(clock: &ManualClock) -> TtlCache<&'static str, u32, ManualClock> {
        TtlCache::new(Duration::hours(1), clock.clone())
    }

    #[tokio::test]
    async fn test_get_before_expiry() {
        let clock = ManualClock::new(start());
        let cache = cache(&clock);

        cache.put("couples", 42).await;
        clock.advance(Duration::minutes(59));

        assert_eq!(cache.get(&"couples").await, Some(42));
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let clock = ManualClock::new(start());
        let cache = cache(&clock);

        cache.put("couples", 42).await;
        clock.advance(Duration::hours(1));

        assert_eq!(cache.get(&"couples").await, None);
    }

    #[tokio::test]
    async fn test_put_refreshes_timestamp() {
        let clock = ManualClock::new(start());
        let cache = cache(&clock);

        cache.put("family", 1).await;
        clock.advance(Duration::minutes(50));
        cache.put("family", 2).await;
        clock.advance(Duration::minutes(50));

        assert_eq!(cache.get(&"family").await, Some(2));
    }

    #[tokio::test]
    async fn test_invalidate_single_key() {
        let clock = ManualClock::new(start());
        let cache = cache(&clock);

        cache.put("couples", 1).await;
        cache.put("family", 2).await;
        cache.invalidate(&"couples").await;

        assert_eq!(cache.get(&"couples").await, None);
        assert_eq!(cache.get(&"family").await, Some(2));
    }

    #[tokio::test]
    async fn test_clear() {
        let clock = ManualClock::new(start());
        let cache = cache(&clock);

        cache.put("couples", 1).await;
        cache.put("family", 2).await;
        cache.clear().await;

        assert_eq!(cache.get(&"couples").await, None);
        assert_eq!(cache.get(&"family").await, None);
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::new(start());
        let later = start() + Duration::days(3);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }
}
