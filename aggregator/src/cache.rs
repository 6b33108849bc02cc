// Accelerator over the durable aggregate store. Losing an entry only costs a
// redundant store round-trip, so capacity is a performance knob, not a
// correctness parameter.
use crate::metrics_defs::{SNAPSHOT_CACHE_HIT, SNAPSHOT_CACHE_MISS};
use crate::types::CacheSnapshot;
use moka::sync::Cache;
use shared::counter;

pub const DEFAULT_CAPACITY: u64 = 1_000_000;

#[derive(Clone)]
pub struct SnapshotCache {
    cache: Cache<String, CacheSnapshot>,
}

impl SnapshotCache {
    pub fn new(capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(capacity).build();
        SnapshotCache { cache }
    }

    pub fn get(&self, cell_id: &str) -> Option<CacheSnapshot> {
        let snapshot = self.cache.get(cell_id);
        let metric_def = if snapshot.is_some() {
            SNAPSHOT_CACHE_HIT
        } else {
            SNAPSHOT_CACHE_MISS
        };
        counter!(metric_def).increment(1);
        snapshot
    }

    pub fn insert(&self, cell_id: &str, snapshot: CacheSnapshot) {
        self.cache.insert(cell_id.to_string(), snapshot);
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        SnapshotCache::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RadioFlags;

    #[test]
    fn test_get_after_insert() {
        let cache = SnapshotCache::default();
        assert!(cache.get("8a1fb46622dffff").is_none());

        let snapshot = CacheSnapshot {
            flags: RadioFlags {
                wifi: true,
                ..Default::default()
            },
            last_update: 42,
        };
        cache.insert("8a1fb46622dffff", snapshot);
        assert_eq!(cache.get("8a1fb46622dffff"), Some(snapshot));
    }

    #[test]
    fn test_insert_overwrites() {
        let cache = SnapshotCache::default();
        let first = CacheSnapshot {
            flags: RadioFlags::default(),
            last_update: 1,
        };
        let second = CacheSnapshot {
            flags: RadioFlags {
                ble: true,
                ..Default::default()
            },
            last_update: 2,
        };

        cache.insert("8a1fb46622dffff", first);
        cache.insert("8a1fb46622dffff", second);
        assert_eq!(cache.get("8a1fb46622dffff"), Some(second));
    }
}
