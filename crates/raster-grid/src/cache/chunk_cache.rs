//! LRU cache for decoded raster tiles.

use lru::LruCache;
use std::num::NonZeroUsize;

use crate::types::CacheStats;

/// Cache key for tiles: (tile_x, tile_y).
pub type ChunkKey = (usize, usize);

/// LRU cache for decoded tiles with memory-bounded eviction.
pub struct ChunkCache {
    cache: LruCache<ChunkKey, Vec<f32>>,
    memory_limit: usize,
    current_memory: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl ChunkCache {
    /// Create a new chunk cache with the given memory limit in bytes.
    pub fn new(memory_limit: usize) -> Self {
        // Estimate max entries assuming 256x256 float tiles
        let chunk_size_estimate = 256 * 256 * 4;
        let max_entries = (memory_limit / chunk_size_estimate).max(16);

        Self {
            cache: LruCache::new(NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN)),
            memory_limit,
            current_memory: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Try to get a tile from the cache.
    ///
    /// Returns `Some(data)` if found (cache hit), `None` if not found (cache miss).
    pub fn get(&mut self, key: &ChunkKey) -> Option<&Vec<f32>> {
        if let Some(data) = self.cache.get(key) {
            self.hits += 1;
            Some(data)
        } else {
            self.misses += 1;
            None
        }
    }

    /// Check if a key exists in the cache without updating LRU order.
    pub fn contains(&self, key: &ChunkKey) -> bool {
        self.cache.contains(key)
    }

    /// Insert a tile into the cache.
    ///
    /// If the cache is at capacity, the least recently used entries
    /// will be evicted to make room.
    pub fn insert(&mut self, key: ChunkKey, data: Vec<f32>) {
        let data_size = data.len() * std::mem::size_of::<f32>();

        while self.current_memory + data_size > self.memory_limit && !self.cache.is_empty() {
            if let Some((_, evicted)) = self.cache.pop_lru() {
                let evicted_size = evicted.len() * std::mem::size_of::<f32>();
                self.current_memory = self.current_memory.saturating_sub(evicted_size);
                self.evictions += 1;
            }
        }

        if data_size <= self.memory_limit {
            // The entry-count bound may also evict; keep the byte total honest.
            if let Some((_, evicted)) = self.cache.push(key, data) {
                let evicted_size = evicted.len() * std::mem::size_of::<f32>();
                self.current_memory = self.current_memory.saturating_sub(evicted_size);
                self.evictions += 1;
            }
            self.current_memory += data_size;
        }
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.cache.len(),
            memory_bytes: self.current_memory as u64,
            evictions: self.evictions,
        }
    }

    /// Clear all entries from the cache.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.current_memory = 0;
    }

    /// Get the current memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    /// Get the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hit_and_miss() {
        let mut cache = ChunkCache::new(1024 * 1024);
        assert!(cache.get(&(0, 0)).is_none());

        cache.insert((0, 0), vec![1.0; 16]);
        assert_eq!(cache.get(&(0, 0)).map(|v| v.len()), Some(16));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.memory_bytes, 64);
    }

    #[test]
    fn test_eviction_by_memory() {
        // Room for exactly two 16-value tiles
        let mut cache = ChunkCache::new(128);
        cache.insert((0, 0), vec![0.0; 16]);
        cache.insert((1, 0), vec![0.0; 16]);
        cache.insert((2, 0), vec![0.0; 16]);

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&(0, 0)));
        assert!(cache.contains(&(2, 0)));
        assert_eq!(cache.memory_usage(), 128);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_oversized_tile_not_cached() {
        let mut cache = ChunkCache::new(32);
        cache.insert((0, 0), vec![0.0; 16]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut cache = ChunkCache::new(1024);
        cache.insert((0, 0), vec![0.0; 4]);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.memory_usage(), 0);
    }
}
