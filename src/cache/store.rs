//! Least-recently-used frame store bounded by entry count and byte size

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use super::{CacheKey, FrameResource};
use crate::catalog::MaterialId;

/// One cached frame
#[derive(Debug, Clone)]
struct CacheEntry {
    resource: FrameResource,
    byte_size: u64,
    inserted_at: Instant,
    last_access: Instant,
    /// Position in the recency order
    tick: u64,
}

/// LRU store for frame resources.
///
/// Never holds more than `max_entries` entries or `max_bytes` bytes. A single
/// payload larger than `max_bytes` is not stored at all.
#[derive(Debug)]
pub struct FrameStore {
    entries: HashMap<CacheKey, CacheEntry>,
    /// tick -> key, oldest first
    recency: BTreeMap<u64, CacheKey>,
    next_tick: u64,
    total_bytes: u64,
    max_entries: usize,
    max_bytes: u64,
    ttl: Option<Duration>,
}

impl FrameStore {
    pub fn new(max_entries: usize, max_bytes: u64, ttl: Option<Duration>) -> Self {
        Self {
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            next_tick: 0,
            total_bytes: 0,
            max_entries: max_entries.max(1),
            max_bytes: max_bytes.max(1),
            ttl,
        }
    }

    /// Look up a frame, refreshing its recency. Expired entries are dropped.
    pub fn get(&mut self, key: &CacheKey, now: Instant) -> Option<FrameResource> {
        if self.is_expired(key, now) {
            self.remove(key);
            return None;
        }

        let tick = self.bump_tick();
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.tick);
        entry.tick = tick;
        entry.last_access = now;
        self.recency.insert(tick, key.clone());
        Some(entry.resource.clone())
    }

    /// Look up a frame without touching recency
    pub fn peek(&self, key: &CacheKey, now: Instant) -> Option<&FrameResource> {
        if self.is_expired(key, now) {
            return None;
        }
        self.entries.get(key).map(|e| &e.resource)
    }

    /// Insert a frame, evicting least-recently-used entries to make room.
    ///
    /// Returns the evicted keys.
    pub fn insert(&mut self, key: CacheKey, resource: FrameResource, now: Instant) -> Vec<CacheKey> {
        let byte_size = resource.byte_size();
        self.remove(&key);

        if byte_size > self.max_bytes {
            tracing::debug!(
                target: "immersive_turntable::cache",
                ?key,
                byte_size,
                max_bytes = self.max_bytes,
                "Frame larger than cache capacity, not stored"
            );
            return Vec::new();
        }

        let mut evicted = Vec::new();
        while self.entries.len() >= self.max_entries || self.total_bytes + byte_size > self.max_bytes {
            match self.evict_oldest() {
                Some(old) => evicted.push(old),
                None => break,
            }
        }

        let tick = self.bump_tick();
        self.recency.insert(tick, key.clone());
        self.total_bytes += byte_size;
        self.entries.insert(
            key,
            CacheEntry {
                resource,
                byte_size,
                inserted_at: now,
                last_access: now,
                tick,
            },
        );
        evicted
    }

    /// Remove one entry
    pub fn remove(&mut self, key: &CacheKey) -> Option<FrameResource> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.tick);
        self.total_bytes -= entry.byte_size;
        Some(entry.resource)
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, e)| now.saturating_duration_since(e.inserted_at) >= ttl)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
        self.total_bytes = 0;
    }

    /// Live resources of one material, in no particular order
    pub fn frames_of<'a>(
        &'a self,
        material: &'a MaterialId,
        now: Instant,
    ) -> impl Iterator<Item = &'a FrameResource> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| &k.material == material && !self.is_expired(k, now))
            .map(|(_, e)| &e.resource)
    }

    /// When an entry was last read or written
    pub fn last_access(&self, key: &CacheKey) -> Option<Instant> {
        self.entries.get(key).map(|e| e.last_access)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    fn is_expired(&self, key: &CacheKey, now: Instant) -> bool {
        match (self.ttl, self.entries.get(key)) {
            (Some(ttl), Some(entry)) => now.saturating_duration_since(entry.inserted_at) >= ttl,
            _ => false,
        }
    }

    fn evict_oldest(&mut self) -> Option<CacheKey> {
        let (_, key) = self.recency.pop_first()?;
        if let Some(entry) = self.entries.remove(&key) {
            self.total_bytes -= entry.byte_size;
        }
        tracing::trace!(target: "immersive_turntable::cache", ?key, "Evicted frame");
        Some(key)
    }

    fn bump_tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Encoding;
    use bytes::Bytes;

    fn key(frame: usize) -> CacheKey {
        CacheKey::new(MaterialId::from("a"), frame, Encoding::Webp)
    }

    fn resource(frame: usize, size: usize) -> FrameResource {
        FrameResource {
            key: key(frame),
            bytes: Bytes::from(vec![0u8; size]),
            fetch_serial: frame as u64,
        }
    }

    #[test]
    fn test_evicts_least_recently_used_first() {
        let now = Instant::now();
        let mut store = FrameStore::new(3, 1_000, None);
        store.insert(key(0), resource(0, 10), now);
        store.insert(key(1), resource(1, 10), now);
        store.insert(key(2), resource(2, 10), now);

        // Touch 0 so 1 becomes the oldest
        assert!(store.get(&key(0), now).is_some());

        let evicted = store.insert(key(3), resource(3, 10), now);
        assert_eq!(evicted, vec![key(1)]);
        assert_eq!(store.len(), 3);
        assert!(store.contains(&key(0)));
        assert!(!store.contains(&key(1)));
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let now = Instant::now();
        let mut store = FrameStore::new(4, 100, None);
        for frame in 0..50 {
            store.insert(key(frame), resource(frame, 30), now);
            assert!(store.len() <= 4);
            assert!(store.total_bytes() <= 100);
        }
        assert_eq!(store.len(), 3);
        assert_eq!(store.total_bytes(), 90);
    }

    #[test]
    fn test_oversized_payload_not_stored() {
        let now = Instant::now();
        let mut store = FrameStore::new(4, 100, None);
        store.insert(key(0), resource(0, 50), now);
        let evicted = store.insert(key(1), resource(1, 101), now);
        assert!(evicted.is_empty());
        assert!(!store.contains(&key(1)));
        assert!(store.contains(&key(0)));
    }

    #[test]
    fn test_reinsert_replaces_bytes() {
        let now = Instant::now();
        let mut store = FrameStore::new(4, 100, None);
        store.insert(key(0), resource(0, 50), now);
        store.insert(key(0), resource(0, 20), now);
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_bytes(), 20);
    }

    #[test]
    fn test_ttl_expiry() {
        let start = Instant::now();
        let mut store = FrameStore::new(8, 1_000, Some(Duration::from_secs(10)));
        store.insert(key(0), resource(0, 10), start);
        store.insert(key(1), resource(1, 10), start + Duration::from_secs(5));

        let later = start + Duration::from_secs(11);
        assert!(store.peek(&key(0), later).is_none());
        assert!(store.get(&key(0), later).is_none());
        assert!(!store.contains(&key(0)));

        assert_eq!(store.purge_expired(start + Duration::from_secs(20)), 1);
        assert!(store.is_empty());
        assert_eq!(store.total_bytes(), 0);
    }

    #[test]
    fn test_frames_of_filters_material() {
        let now = Instant::now();
        let mut store = FrameStore::new(8, 1_000, None);
        store.insert(key(0), resource(0, 10), now);
        let other = CacheKey::new(MaterialId::from("b"), 0, Encoding::Webp);
        store.insert(
            other.clone(),
            FrameResource {
                key: other,
                bytes: Bytes::from_static(b"x"),
                fetch_serial: 99,
            },
            now,
        );
        let a = MaterialId::from("a");
        assert_eq!(store.frames_of(&a, now).count(), 1);
    }
}
