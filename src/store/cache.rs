//! Move-to-back LRU cache keyed by `"index:iter"`, guarding the store's
//! hottest rows.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use super::entity::Entity;

/// Thread-safe LRU wrapper over a fixed-capacity cache of entity rows.
pub struct EntityCache {
    inner: Mutex<LruCache<String, Entity>>,
}

impl EntityCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &str) -> Option<Entity> {
        self.inner.lock().get(key).cloned()
    }

    pub fn put(&self, key: String, entity: Entity) {
        self.inner.lock().put(key, entity);
    }

    pub fn remove(&self, key: &str) {
        self.inner.lock().pop(key);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(iter: i64) -> Entity {
        Entity {
            index: Some(1),
            iter,
            uuid: "u".into(),
            state: 0,
            name: "n".into(),
            description: "d".into(),
            position_x: 0,
            position_y: 0,
            position_z: 0,
            aesthetics: serde_json::json!({}),
            ownership: None,
            minted: false,
            timestamp: 0,
            exists: true,
        }
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = EntityCache::new(2);
        cache.put("1:0".into(), sample(0));
        cache.put("1:1".into(), sample(1));
        cache.get("1:0");
        cache.put("1:2".into(), sample(2));

        assert!(cache.get("1:1").is_none());
        assert!(cache.get("1:0").is_some());
        assert!(cache.get("1:2").is_some());
    }

    #[test]
    fn zero_capacity_normalizes_to_one() {
        let cache = EntityCache::new(0);
        cache.put("1:0".into(), sample(0));
        assert_eq!(cache.len(), 1);
    }
}
