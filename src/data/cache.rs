//! Read-through cache of loaded measures, keyed by currency.
//!
//! Entries are replaced wholesale, never merged. Two concurrent loads for the
//! same currency may both fetch; the later insert wins.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::clock::Clock;
use crate::data::weights::normalize_currency;
use crate::domain::MeasureMap;

pub const DEFAULT_TTL_SECS: i64 = 300;

/// A cached load: the measures plus the warnings raised while loading them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedMeasures {
    pub measures: MeasureMap,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    loaded: CachedMeasures,
    stored_at: DateTime<Utc>,
}

pub struct MeasureCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MeasureCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh measures for `currency`, if any. Stale entries are evicted.
    pub fn get(&self, currency: &str) -> Option<CachedMeasures> {
        let key = normalize_currency(currency);
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let fresh = entries.get(&key).map(|e| now - e.stored_at < self.ttl)?;
        if fresh {
            debug!(currency = %key, "cache hit");
            entries.get(&key).map(|e| e.loaded.clone())
        } else {
            debug!(currency = %key, "cache entry expired");
            entries.remove(&key);
            None
        }
    }

    pub fn insert(&self, currency: &str, measures: MeasureMap, warnings: Vec<String>) {
        let entry = CacheEntry {
            loaded: CachedMeasures { measures, warnings },
            stored_at: self.clock.now(),
        };
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(normalize_currency(currency), entry);
    }

    pub fn invalidate(&self, currency: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.remove(&normalize_currency(currency));
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn entries_expire_after_ttl() {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()));
        let cache = MeasureCache::new(Duration::seconds(DEFAULT_TTL_SECS), clock.clone());

        cache.insert("usd", MeasureMap::new(), vec!["pce: missing".to_string()]);
        clock.advance(Duration::seconds(299));
        let hit = cache.get("USD").unwrap();
        assert_eq!(hit.warnings, vec!["pce: missing".to_string()]);

        clock.advance(Duration::seconds(1));
        assert!(cache.get("USD").is_none());
    }

    #[test]
    fn invalidate_and_clear() {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()));
        let cache = MeasureCache::new(Duration::seconds(60), clock);
        cache.insert("USD", MeasureMap::new(), Vec::new());
        cache.insert("GBP", MeasureMap::new(), Vec::new());

        cache.invalidate("usd");
        assert!(cache.get("USD").is_none());
        assert!(cache.get("GBP").is_some());

        cache.clear();
        assert!(cache.get("GBP").is_none());
    }
}
