//! Bounded raster cache keyed by spec hash.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use super::raster::Raster;

/// Holds up to `capacity` rasters, evicting the oldest insertion first.
#[derive(Debug)]
pub struct TextureCache {
    capacity: usize,
    entries: HashMap<u64, Arc<Raster>>,
    order: VecDeque<u64>,
}

impl TextureCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, key: u64) -> Option<Arc<Raster>> {
        self.entries.get(&key).cloned()
    }

    pub fn insert(&mut self, key: u64, raster: Arc<Raster>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(key, raster).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster() -> Arc<Raster> {
        Arc::new(Raster::filled(1, 1, [1, 2, 3, 4]).unwrap())
    }

    #[test]
    fn test_evicts_oldest() {
        let mut cache = TextureCache::new(2);
        cache.insert(1, raster());
        cache.insert(2, raster());
        cache.insert(3, raster());

        assert_eq!(cache.len(), 2);
        assert!(cache.get(1).is_none());
        assert!(cache.get(2).is_some());
        assert!(cache.get(3).is_some());
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let mut cache = TextureCache::new(0);
        cache.insert(1, raster());
        assert!(cache.is_empty());
    }
}
