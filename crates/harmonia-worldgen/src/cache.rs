//! Tile cache owned by the orchestration layer.
//!
//! Bounded by capacity with least-recently-used eviction, plus age-based
//! expiry. Tiles enter only as complete bundles.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use tracing::info;

use crate::coords::TileCoordinate;
use crate::pipeline::TileBundle;

/// Handle passed to workers that insert finished tiles.
pub type SharedTileCache = Arc<Mutex<TileCache>>;

struct CacheEntry {
    bundle: Arc<TileBundle>,
    inserted_at: Instant,
    last_used: u64,
}

/// LRU + age bounded map from [`TileCoordinate`] to [`TileBundle`].
pub struct TileCache {
    entries: HashMap<TileCoordinate, CacheEntry>,
    capacity: usize,
    max_age: Duration,
    clock: u64,
}

impl TileCache {
    /// Create a cache holding at most `capacity` tiles (minimum 1) for at
    /// most `max_age` each.
    pub fn new(capacity: usize, max_age: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            max_age,
            clock: 0,
        }
    }

    /// Wrap the cache in a shareable handle.
    pub fn shared(self) -> SharedTileCache {
        Arc::new(Mutex::new(self))
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Insert a finished tile, replacing any tile at the same coordinate.
    ///
    /// Returns the least-recently-used tile if one had to be evicted.
    pub fn insert(&mut self, bundle: TileBundle) -> Option<Arc<TileBundle>> {
        self.insert_at(Arc::new(bundle), Instant::now())
    }

    /// [`TileCache::insert`] with an explicit insertion time.
    pub fn insert_at(&mut self, bundle: Arc<TileBundle>, now: Instant) -> Option<Arc<TileBundle>> {
        let last_used = self.tick();
        let coord = bundle.coord;
        let replaced = self.entries.insert(
            coord,
            CacheEntry {
                bundle,
                inserted_at: now,
                last_used,
            },
        );
        if replaced.is_some() || self.entries.len() <= self.capacity {
            return None;
        }

        let lru = self
            .entries
            .iter()
            .filter(|(c, _)| **c != coord)
            .min_by_key(|(_, e)| e.last_used)
            .map(|(c, _)| *c)?;
        self.entries.remove(&lru).map(|e| e.bundle)
    }

    /// Look up a tile and mark it recently used.
    pub fn get(&mut self, coord: TileCoordinate) -> Option<Arc<TileBundle>> {
        let stamp = self.tick();
        let entry = self.entries.get_mut(&coord)?;
        entry.last_used = stamp;
        Some(Arc::clone(&entry.bundle))
    }

    /// Look up a tile without touching its recency.
    pub fn peek(&self, coord: TileCoordinate) -> Option<&Arc<TileBundle>> {
        self.entries.get(&coord).map(|e| &e.bundle)
    }

    pub fn contains(&self, coord: TileCoordinate) -> bool {
        self.entries.contains_key(&coord)
    }

    pub fn remove(&mut self, coord: TileCoordinate) -> Option<Arc<TileBundle>> {
        self.entries.remove(&coord).map(|e| e.bundle)
    }

    /// Drop every tile older than the maximum age at `now`. Returns how many.
    pub fn evict_expired(&mut self, now: Instant) -> usize {
        let max_age = self.max_age;
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.inserted_at) <= max_age);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            info!(evicted, remaining = self.entries.len(), "Evicted expired tiles");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldGenConfig;
    use crate::metabolism::MetabolismSnapshot;
    use crate::pipeline::{TileGenerator, TileRequest};

    fn bundle(x: i32, z: i32) -> TileBundle {
        let generator = TileGenerator::new(WorldGenConfig {
            base_resolution: 9,
            ..Default::default()
        })
        .unwrap();
        generator
            .generate(&TileRequest::new(1, TileCoordinate::new(x, z), MetabolismSnapshot::default()))
            .unwrap()
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = TileCache::new(2, Duration::from_secs(60));
        assert!(cache.insert(bundle(0, 0)).is_none());
        assert!(cache.insert(bundle(1, 0)).is_none());
        // Touch (0, 0) so (1, 0) becomes least recently used.
        assert!(cache.get(TileCoordinate::new(0, 0)).is_some());
        let evicted = cache.insert(bundle(2, 0)).unwrap();
        assert_eq!(evicted.coord, TileCoordinate::new(1, 0));
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(TileCoordinate::new(0, 0)));
        assert!(cache.contains(TileCoordinate::new(2, 0)));
    }

    #[test]
    fn test_replacing_same_coordinate_does_not_evict() {
        let mut cache = TileCache::new(1, Duration::from_secs(60));
        cache.insert(bundle(0, 0));
        assert!(cache.insert(bundle(0, 0)).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_age_eviction() {
        let mut cache = TileCache::new(8, Duration::from_secs(10));
        let t0 = Instant::now();
        cache.insert_at(Arc::new(bundle(0, 0)), t0);
        cache.insert_at(Arc::new(bundle(1, 0)), t0 + Duration::from_secs(8));
        assert_eq!(cache.evict_expired(t0 + Duration::from_secs(5)), 0);
        assert_eq!(cache.evict_expired(t0 + Duration::from_secs(12)), 1);
        assert!(!cache.contains(TileCoordinate::new(0, 0)));
        assert!(cache.contains(TileCoordinate::new(1, 0)));
    }

    #[test]
    fn test_peek_does_not_refresh() {
        let mut cache = TileCache::new(2, Duration::from_secs(60));
        cache.insert(bundle(0, 0));
        cache.insert(bundle(1, 0));
        assert!(cache.peek(TileCoordinate::new(0, 0)).is_some());
        let evicted = cache.insert(bundle(2, 0)).unwrap();
        assert_eq!(evicted.coord, TileCoordinate::new(0, 0));
    }
}
