use std::collections::BTreeMap;
use std::sync::Arc;

use foundation::MeshData;
use formats::Ring;
use tracing::{debug, trace};

use crate::config::{CacheConfig, CacheStats};
use crate::key::{ExtrusionKey, GeometryKey, ProjectionKey, SurfaceKey};

/// A built mesh set for one feature, shared read-only with consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedGeometryRecord {
    pub key: GeometryKey,
    /// One mesh per outer part, in part order.
    pub parts: Vec<MeshData>,
    pub vertex_count: usize,
    /// Cache clock tick at insertion.
    pub created_at: u64,
    pub size_estimate_bytes: usize,
}

impl CachedGeometryRecord {
    pub fn triangle_count(&self) -> usize {
        self.parts.iter().map(MeshData::triangle_count).sum()
    }
}

#[derive(Debug)]
struct Entry {
    record: Arc<CachedGeometryRecord>,
    last_access: u64,
}

/// LRU store of built meshes bounded by entry count and total vertex count.
///
/// Notes on determinism:
/// - Recency is a logical clock (`tick`), not wall-clock time.
/// - `lru` maps each entry's last access tick to its key, so the first
///   element is always the least recently used entry.
#[derive(Debug)]
pub struct GeometryCache {
    config: CacheConfig,
    tick: u64,
    entries: BTreeMap<GeometryKey, Entry>,
    lru: BTreeMap<u64, GeometryKey>,
    total_vertices: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl GeometryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            tick: 0,
            entries: BTreeMap::new(),
            lru: BTreeMap::new(),
            total_vertices: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn pipeline_version(&self) -> &str {
        &self.config.pipeline_version
    }

    /// Builds a key stamped with this cache's pipeline version.
    pub fn key_for(
        &self,
        feature_id: &str,
        rings: &[Ring],
        projection: ProjectionKey,
        extrusion: ExtrusionKey,
        surface: SurfaceKey,
    ) -> GeometryKey {
        GeometryKey::new(
            feature_id,
            rings,
            projection,
            extrusion,
            surface,
            self.config.pipeline_version.as_str(),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_vertices(&self) -> usize {
        self.total_vertices
    }

    pub fn contains(&self, key: &GeometryKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Last access tick of `key`, without touching recency or stats.
    pub fn last_access(&self, key: &GeometryKey) -> Option<u64> {
        self.entries.get(key).map(|e| e.last_access)
    }

    /// Looks up `key`; a hit becomes the most recently used entry.
    pub fn get(&mut self, key: &GeometryKey) -> Option<Arc<CachedGeometryRecord>> {
        let Some(entry) = self.entries.get_mut(key) else {
            self.misses += 1;
            return None;
        };
        self.tick += 1;
        self.lru.remove(&entry.last_access);
        entry.last_access = self.tick;
        self.lru.insert(self.tick, key.clone());
        self.hits += 1;
        Some(Arc::clone(&entry.record))
    }

    /// Stores `parts` under `key` and evicts from the LRU end until both
    /// budgets hold.
    ///
    /// A record larger than the whole vertex budget is returned but not retained.
    pub fn insert(&mut self, key: GeometryKey, parts: Vec<MeshData>) -> Arc<CachedGeometryRecord> {
        self.tick += 1;
        let vertex_count: usize = parts.iter().map(MeshData::vertex_count).sum();
        let size_estimate_bytes = parts.iter().map(MeshData::size_estimate_bytes).sum();
        let record = Arc::new(CachedGeometryRecord {
            key: key.clone(),
            parts,
            vertex_count,
            created_at: self.tick,
            size_estimate_bytes,
        });

        self.remove(&key);

        if self.config.max_entries == 0 || vertex_count > self.config.max_vertex_budget {
            debug!(
                key = %key,
                vertex_count,
                max_vertex_budget = self.config.max_vertex_budget,
                "geometry exceeds cache budget; not retained"
            );
            return record;
        }

        self.total_vertices += vertex_count;
        self.lru.insert(self.tick, key.clone());
        self.entries.insert(
            key,
            Entry {
                record: Arc::clone(&record),
                last_access: self.tick,
            },
        );
        self.evict_as_needed();
        record
    }

    /// Removes `key`; returns whether it was present. Not counted as an eviction.
    pub fn remove(&mut self, key: &GeometryKey) -> bool {
        let Some(entry) = self.entries.remove(key) else {
            return false;
        };
        self.lru.remove(&entry.last_access);
        self.total_vertices -= entry.record.vertex_count;
        true
    }

    /// Drops all entries. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.total_vertices = 0;
    }

    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
    }

    /// Ends the cache's lifetime; returns the final stats.
    pub fn dispose(mut self) -> CacheStats {
        let stats = self.stats();
        self.clear();
        debug!(
            hits = stats.hits,
            misses = stats.misses,
            evictions = stats.evictions,
            "geometry cache disposed"
        );
        stats
    }

    pub fn stats(&self) -> CacheStats {
        let lookups = self.hits + self.misses;
        CacheStats {
            entries: self.entries.len(),
            vertices: self.total_vertices,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                self.hits as f64 / lookups as f64
            },
            max_entries: self.config.max_entries,
            max_vertex_budget: self.config.max_vertex_budget,
        }
    }

    fn over_budget(&self) -> bool {
        self.entries.len() > self.config.max_entries
            || self.total_vertices > self.config.max_vertex_budget
    }

    fn evict_as_needed(&mut self) {
        while self.over_budget() {
            let Some((_tick, key)) = self.lru.pop_first() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&key) {
                self.total_vertices -= entry.record.vertex_count;
                self.evictions += 1;
                trace!(key = %key, vertices = entry.record.vertex_count, "evicted geometry");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::GeometryCache;
    use crate::config::CacheConfig;
    use crate::key::{ExtrusionKey, GeometryKey, ProjectionKey, SurfaceKey};
    use foundation::MeshData;
    use foundation::math::ProjectionMode;
    use formats::GeoPoint;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn key(cache: &GeometryCache, id: &str) -> GeometryKey {
        let rings = vec![vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0)]];
        cache.key_for(
            id,
            &rings,
            ProjectionKey::Auto { fallback: false },
            ExtrusionKey::Flat,
            SurfaceKey::new(1.0, 0.0),
        )
    }

    fn mesh(vertices: usize) -> Vec<MeshData> {
        vec![MeshData {
            positions: vec![[0.0; 3]; vertices],
            indices: vec![0, 1, 2],
            cap_triangles: 1,
            wall_triangles: 0,
            projection: ProjectionMode::Legacy,
        }]
    }

    #[test]
    fn hit_returns_shared_record() {
        let mut cache = GeometryCache::new(CacheConfig::new(4, 100));
        let a = key(&cache, "a");
        let stored = cache.insert(a.clone(), mesh(3));
        let hit = cache.get(&a).expect("hit");
        assert!(Arc::ptr_eq(&stored, &hit));
        assert_eq!(hit.vertex_count, 3);
        assert_eq!(hit.size_estimate_bytes, 3 * 12 + 3 * 4);

        let missing = key(&cache, "missing");
        assert!(cache.get(&missing).is_none());
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
        assert_eq!(stats.hit_rate, 0.5);
    }

    #[test]
    fn entry_limit_evicts_least_recently_used() {
        let mut cache = GeometryCache::new(CacheConfig::new(2, 1_000));
        let a = key(&cache, "a");
        let b = key(&cache, "b");
        let c = key(&cache, "c");

        cache.insert(a.clone(), mesh(3));
        cache.insert(b.clone(), mesh(3));
        // Touch 'a' so 'b' becomes the LRU entry.
        cache.get(&a);
        cache.insert(c.clone(), mesh(3));

        assert!(cache.contains(&a));
        assert!(!cache.contains(&b));
        assert!(cache.contains(&c));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn vertex_budget_evicts_until_satisfied() {
        let mut cache = GeometryCache::new(CacheConfig::new(10, 10));
        let keys: Vec<_> = ["a", "b", "c"].iter().map(|id| key(&cache, id)).collect();
        for k in &keys {
            cache.insert(k.clone(), mesh(4));
        }
        // 12 > 10: oldest goes.
        assert_eq!(cache.total_vertices(), 8);
        assert!(!cache.contains(&keys[0]));

        let big = key(&cache, "big");
        cache.insert(big.clone(), mesh(9));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&big));
        assert_eq!(cache.stats().evictions, 3);
    }

    #[test]
    fn budgets_hold_after_any_insert_sequence() {
        let mut cache = GeometryCache::new(CacheConfig::new(5, 40));
        for i in 0..200usize {
            let k = key(&cache, &format!("f{}", i % 17));
            if i % 3 == 0 {
                cache.get(&k);
            }
            cache.insert(k, mesh(3 + (i * 7) % 11));
            let stats = cache.stats();
            assert!(stats.entries <= 5);
            assert!(stats.vertices <= 40);
        }
    }

    #[test]
    fn oversized_record_is_returned_but_not_retained() {
        let mut cache = GeometryCache::new(CacheConfig::new(4, 5));
        let a = key(&cache, "a");
        let record = cache.insert(a.clone(), mesh(6));
        assert_eq!(record.vertex_count, 6);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn reinsert_replaces_existing_entry() {
        let mut cache = GeometryCache::new(CacheConfig::new(4, 100));
        let a = key(&cache, "a");
        cache.insert(a.clone(), mesh(3));
        cache.insert(a.clone(), mesh(5));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_vertices(), 5);
    }

    #[test]
    fn pipeline_version_separates_keys() {
        let v1 = GeometryCache::new(CacheConfig::default().with_pipeline_version("v1"));
        let v2 = GeometryCache::new(CacheConfig::default().with_pipeline_version("v2"));
        assert_ne!(key(&v1, "a"), key(&v2, "a"));
        assert_eq!(key(&v1, "a").pipeline_version, "v1");
    }

    #[test]
    fn clear_and_dispose() {
        let mut cache = GeometryCache::new(CacheConfig::new(4, 100));
        let a = key(&cache, "a");
        cache.insert(a.clone(), mesh(3));
        cache.get(&a);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.total_vertices(), 0);
        assert!(cache.get(&a).is_none());

        let stats = cache.dispose();
        assert_eq!((stats.entries, stats.hits, stats.misses), (0, 1, 1));
    }

    #[test]
    fn access_ticks_advance() {
        let mut cache = GeometryCache::new(CacheConfig::new(4, 100));
        let a = key(&cache, "a");
        let record = cache.insert(a.clone(), mesh(3));
        let first = cache.last_access(&a).expect("tick");
        assert_eq!(first, record.created_at);
        cache.get(&a);
        assert!(cache.last_access(&a).expect("tick") > first);
    }
}
