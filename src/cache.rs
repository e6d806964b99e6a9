// =============================================================================
// Result Cache — short-lived read-through memoization of ranked tables
// =============================================================================
//
// Keyed by the full request shape (view, period, limit, threshold). The
// pipeline itself is cache-free; this sits in front of it so the API layer
// calls the pipeline at most once per key per TTL window.
// =============================================================================

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::debug;

use crate::ranking::RankedTable;
use crate::types::{Period, ViewKind};

/// Complete request shape of a ranking call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    view: ViewKind,
    period: Period,
    limit: usize,
    /// Threshold as raw bits so the key is hashable; two requests share an
    /// entry only when their thresholds are bit-identical.
    threshold_bits: u64,
}

impl CacheKey {
    pub fn new(view: ViewKind, period: Period, limit: usize, threshold: f64) -> Self {
        Self {
            view,
            period,
            limit,
            threshold_bits: threshold.to_bits(),
        }
    }
}

struct Entry {
    stored_at: Instant,
    table: RankedTable,
}

/// Thread-safe TTL cache of completed [`RankedTable`]s.
pub struct ResultCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, Entry>>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return a clone of the cached table for `key` when it is still fresh.
    pub fn get(&self, key: &CacheKey) -> Option<RankedTable> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() > self.ttl {
            return None;
        }
        debug!(?key, "result cache hit");
        Some(entry.table.clone())
    }

    /// Store a freshly computed table, opportunistically sweeping expired
    /// entries while the write lock is held.
    pub fn put(&self, key: CacheKey, table: RankedTable) {
        let mut entries = self.entries.write();
        entries.retain(|_, e| e.stored_at.elapsed() <= self.ttl);
        entries.insert(
            key,
            Entry {
                stored_at: Instant::now(),
                table,
            },
        );
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: usize) -> RankedTable {
        use crate::ranking::RankedRow;
        let rows = (0..rows)
            .map(|i| RankedRow {
                symbol: format!("C{i}USDT"),
                coin: format!("C{i}"),
                price: 1.0,
                change_pct: 0.0,
                volume_quote: 1.0,
                volume_base: None,
            })
            .collect();
        RankedTable::new(ViewKind::TopVolume, Period::Day, rows, None)
    }

    #[test]
    fn fresh_entries_hit() {
        let cache = ResultCache::new(Duration::from_secs(60));
        let key = CacheKey::new(ViewKind::TopVolume, Period::Day, 20, 0.0);
        assert!(cache.get(&key).is_none());

        cache.put(key.clone(), table(3));
        let hit = cache.get(&key).expect("should hit");
        assert_eq!(hit.rows.len(), 3);
    }

    #[test]
    fn expired_entries_miss() {
        let cache = ResultCache::new(Duration::from_millis(10));
        let key = CacheKey::new(ViewKind::TopVolume, Period::Day, 20, 0.0);
        cache.put(key.clone(), table(1));

        std::thread::sleep(Duration::from_millis(25));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn distinct_request_shapes_do_not_collide() {
        let cache = ResultCache::new(Duration::from_secs(60));
        let movers_a = CacheKey::new(ViewKind::HighVolumeMovers, Period::Day, 20, 1e8);
        let movers_b = CacheKey::new(ViewKind::HighVolumeMovers, Period::Day, 20, 2e8);
        let weekly = CacheKey::new(ViewKind::TopVolume, Period::Week, 20, 0.0);

        cache.put(movers_a.clone(), table(1));
        assert!(cache.get(&movers_b).is_none());
        assert!(cache.get(&weekly).is_none());
        assert!(cache.get(&movers_a).is_some());
    }
}
