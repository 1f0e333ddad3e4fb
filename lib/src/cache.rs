//! Bounded frame cache.
//!
//! Keyed by STE index, holding the decompressed bytes of the frames inside that STE. Capacity is
//! a fixed count of entries, not a byte budget: when full, one insert evicts exactly one
//! least-recently-used entry. Capacity `0` disables the cache entirely; callers should check
//! [`FrameCache::is_enabled`] and skip population rather than pay for an `lru::LruCache` of
//! capacity zero.

use std::num::NonZeroUsize;

use lru::LruCache;

/// An LRU cache of decompressed STE payloads, bounded by entry count.
pub struct FrameCache {
    inner: Option<LruCache<u64, Vec<u8>>>,
    capacity: usize,
    used_bytes: usize,
}

impl FrameCache {
    /// Creates a cache that holds at most `capacity` decompressed STE payloads.
    /// `capacity == 0` disables caching.
    pub fn new(capacity: usize) -> Self {
        let inner = NonZeroUsize::new(capacity).map(LruCache::new);
        Self {
            inner,
            capacity,
            used_bytes: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total decompressed bytes held across all cached entries, for reporting purposes only;
    /// eviction is driven by entry count, not this value.
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up `ste_index`, promoting it to most-recently-used on a hit.
    pub fn get(&mut self, ste_index: u64) -> Option<&[u8]> {
        self.inner
            .as_mut()
            .and_then(|c| c.get(&ste_index))
            .map(Vec::as_slice)
    }

    /// Inserts `payload` for `ste_index`, evicting the least-recently-used entry first if the
    /// cache is already at capacity.
    pub fn insert(&mut self, ste_index: u64, payload: Vec<u8>) {
        let Some(cache) = self.inner.as_mut() else {
            return;
        };
        self.used_bytes += payload.len();
        // `push` returns the replaced value when `ste_index` was already present, or the
        // evicted least-recently-used value when capacity forced one out; either way it's bytes
        // no longer held, so it's covered by one subtraction here.
        if let Some((_, evicted)) = cache.push(ste_index, payload) {
            self.used_bytes -= evicted.len();
        }
    }

    pub fn clear(&mut self) {
        if let Some(cache) = self.inner.as_mut() {
            cache.clear();
        }
        self.used_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::FrameCache;

    #[test]
    fn zero_capacity_disables_cache() {
        let mut cache = FrameCache::new(0);
        assert!(!cache.is_enabled());
        cache.insert(0, vec![1, 2, 3]);
        assert_eq!(cache.get(0), None);
    }

    #[test]
    fn evicts_least_recently_used_when_over_capacity() {
        let mut cache = FrameCache::new(2);
        cache.insert(0, vec![0; 6]);
        cache.insert(1, vec![0; 6]);
        cache.insert(2, vec![0; 6]);
        assert!(cache.get(0).is_none());
        assert!(cache.get(1).is_some());
        assert!(cache.get(2).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn get_promotes_entry() {
        let mut cache = FrameCache::new(2);
        cache.insert(0, vec![0; 5]);
        cache.insert(1, vec![0; 4]);
        assert!(cache.get(0).is_some());
        cache.insert(2, vec![0; 4]);
        assert!(cache.get(0).is_some());
        assert!(cache.get(1).is_none());
    }

    proptest::proptest! {
        #[test]
        fn entry_count_never_exceeds_capacity(
            capacity in 1usize..20,
            sizes in proptest::collection::vec(0usize..60, 0..80),
        ) {
            let mut cache = FrameCache::new(capacity);
            for (i, size) in sizes.into_iter().enumerate() {
                cache.insert(i as u64, vec![0; size]);
                proptest::prop_assert!(cache.len() <= capacity);
            }
        }
    }
}
