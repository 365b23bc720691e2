//! # Chunk Cache
//!
//! Front end over a `RecordStore`. Every failure degrades: a read that
//! cannot be served is a miss, a write that cannot be stored is dropped.
//! Both are logged at `warn`.

use std::path::Path;
use std::time::Duration;

use strata_procedural::ChunkCoord;

use crate::codec;
use crate::error::{CacheError, CacheResult};
use crate::key::ChunkKey;
use crate::record::{now_millis, CachedChunkRecord};
use crate::store::{EntryMeta, FileStore, MemoryStore, RecordStore, StoredEntry};

/// Records older than this are pruned by default.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Cache of generated chunks.
pub struct ChunkCache {
    store: Box<dyn RecordStore>,
    /// Version that `prune_stale_versions` keeps.
    version: u32,
}

impl ChunkCache {
    /// Creates a cache over `store` whose current generator version is
    /// `version`.
    #[must_use]
    pub fn new(store: impl RecordStore + 'static, version: u32) -> Self {
        Self {
            store: Box::new(store),
            version,
        }
    }

    /// Creates an unbounded in-memory cache.
    #[must_use]
    pub fn in_memory(version: u32) -> Self {
        Self::new(MemoryStore::new(), version)
    }

    /// Opens a file-backed cache in `dir`.
    ///
    /// # Errors
    ///
    /// `Io` if the directory cannot be created or listed.
    pub fn open(dir: impl AsRef<Path>, version: u32, quota: Option<u64>) -> CacheResult<Self> {
        Ok(Self::new(FileStore::open_with_quota(dir, quota)?, version))
    }

    /// Current generator version.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Looks up the record for an exact key.
    ///
    /// Returns `None` on a miss and on any store or decode failure. A
    /// corrupted entry is deleted so the next load regenerates it.
    #[must_use]
    pub fn get(&self, cx: i32, cz: i32, world_type: &str, version: u32) -> Option<CachedChunkRecord> {
        let key = match ChunkKey::new(ChunkCoord::new(cx, cz), world_type, version) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(error = %e, "cache lookup with invalid key");
                return None;
            }
        };

        match self.load(&key) {
            Ok(Some(record)) => {
                tracing::debug!(%key, "cache hit");
                Some(record)
            }
            Ok(None) => {
                tracing::debug!(%key, "cache miss");
                None
            }
            Err(e @ (CacheError::Corrupted(_) | CacheError::KeyMismatch { .. })) => {
                tracing::warn!(%key, error = %e, "discarding unreadable cache entry");
                if let Err(e) = self.store.delete(&key) {
                    tracing::warn!(%key, error = %e, "failed to delete cache entry");
                }
                None
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "cache read failed");
                None
            }
        }
    }

    fn load(&self, key: &ChunkKey) -> CacheResult<Option<CachedChunkRecord>> {
        let Some(entry) = self.store.get(key)? else {
            return Ok(None);
        };
        codec::decode_for(key, &entry.bytes).map(Some)
    }

    /// Stores `record`, stamped with the current time. Records keyed with a
    /// version other than the cache's are dropped.
    pub fn put(&self, record: CachedChunkRecord) {
        self.put_with_timestamp(record, now_millis());
    }

    /// Stores `record` with an explicit timestamp (ms since the Unix epoch).
    pub fn put_with_timestamp(&self, mut record: CachedChunkRecord, timestamp: u64) {
        record.timestamp = timestamp;
        if let Err(e) = self.try_put(&record) {
            tracing::warn!(key = %record.key, error = %e, "dropping cache write");
        }
    }

    fn try_put(&self, record: &CachedChunkRecord) -> CacheResult<()> {
        if record.key.version != self.version {
            return Err(CacheError::StaleVersion {
                current: self.version,
                found: record.key.version,
            });
        }
        if record.key.coord() != record.grid.coord {
            return Err(CacheError::KeyMismatch {
                expected: record.key.to_string(),
                found: format!("grid at {:?}", record.grid.coord),
            });
        }
        let bytes = codec::encode(record)?;
        self.store.put(
            &record.key,
            StoredEntry {
                timestamp: record.timestamp,
                bytes,
            },
        )
    }

    /// Deletes records older than `max_age`. Returns how many were removed.
    pub fn prune(&self, max_age: Duration) -> usize {
        self.prune_at(now_millis(), max_age)
    }

    /// `prune` against an explicit clock reading.
    pub fn prune_at(&self, now: u64, max_age: Duration) -> usize {
        let cutoff = now.saturating_sub(max_age.as_millis() as u64);
        let removed = self.delete_matching(&|meta| meta.timestamp < cutoff);
        tracing::info!(removed, cutoff, "pruned expired cache records");
        removed
    }

    /// Deletes records written for any version other than the current one.
    pub fn prune_stale_versions(&self) -> usize {
        let version = self.version;
        let removed = self.delete_matching(&|meta| meta.key.version != version);
        tracing::info!(removed, version, "pruned stale cache versions");
        removed
    }

    fn delete_matching(&self, predicate: &dyn Fn(&EntryMeta) -> bool) -> usize {
        let matches = match self.store.query(predicate) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(error = %e, "cache query failed");
                return 0;
            }
        };

        // Entries rewritten since the query are re-checked by the store
        let mut removed = 0;
        for meta in matches {
            match self.store.delete_if(&meta.key, predicate) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!(key = %meta.key, error = %e, "failed to delete cache entry"),
            }
        }
        removed
    }

    /// Deletes everything.
    pub fn clear(&self) {
        match self.store.clear() {
            Ok(()) => tracing::info!("cleared chunk cache"),
            Err(e) => tracing::warn!(error = %e, "failed to clear chunk cache"),
        }
    }
}

impl std::fmt::Debug for ChunkCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkCache").field("version", &self.version).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_meshing::MeshBuffers;
    use strata_procedural::VoxelGrid;

    fn record(cx: i32, version: u32) -> CachedChunkRecord {
        let coord = ChunkCoord::new(cx, 0);
        let key = ChunkKey::new(coord, "default", version).unwrap();
        CachedChunkRecord::new(key, VoxelGrid::new(coord), MeshBuffers::default(), None)
    }

    #[test]
    fn test_put_then_get() {
        let cache = ChunkCache::in_memory(1);
        cache.put_with_timestamp(record(3, 1), 42);

        let hit = cache.get(3, 0, "default", 1).unwrap();
        assert_eq!(hit.timestamp, 42);
        assert_eq!(hit.grid, VoxelGrid::new(ChunkCoord::new(3, 0)));
        assert!(cache.get(3, 0, "default", 2).is_none());
        assert!(cache.get(3, 0, "islands", 1).is_none());
    }

    #[test]
    fn test_put_stamps_current_time() {
        let cache = ChunkCache::in_memory(1);
        let before = now_millis();
        cache.put(record(0, 1));
        assert!(cache.get(0, 0, "default", 1).unwrap().timestamp >= before);
    }

    #[test]
    fn test_mismatched_grid_is_not_stored() {
        let cache = ChunkCache::in_memory(1);
        let mut bad = record(0, 1);
        bad.grid = VoxelGrid::new(ChunkCoord::new(5, 5));
        cache.put(bad);
        assert!(cache.get(0, 0, "default", 1).is_none());
    }

    #[test]
    fn test_prune_at_cutoff() {
        let cache = ChunkCache::in_memory(1);
        let day = 24 * 60 * 60 * 1000;
        let now = 30 * day;
        cache.put_with_timestamp(record(0, 1), now - 10 * day);
        cache.put_with_timestamp(record(1, 1), now - day);

        assert_eq!(cache.prune_at(now, DEFAULT_MAX_AGE), 1);
        assert!(cache.get(0, 0, "default", 1).is_none());
        assert!(cache.get(1, 0, "default", 1).is_some());
    }

    #[test]
    fn test_prune_stale_versions() {
        let cache = ChunkCache::in_memory(2);
        // Left behind by an older generator
        let old = record(0, 1);
        let bytes = codec::encode(&old).unwrap();
        cache.store.put(&old.key, StoredEntry { timestamp: 1, bytes }).unwrap();
        cache.put(record(1, 2));

        assert!(cache.get(0, 0, "default", 1).is_some());
        assert_eq!(cache.prune_stale_versions(), 1);
        assert!(cache.get(0, 0, "default", 1).is_none());
        assert!(cache.get(1, 0, "default", 2).is_some());
    }

    #[test]
    fn test_record_of_other_version_is_not_stored() {
        let cache = ChunkCache::in_memory(2);
        cache.put(record(0, 1));
        assert!(cache.get(0, 0, "default", 1).is_none());
        assert!(matches!(
            cache.try_put(&record(0, 1)),
            Err(CacheError::StaleVersion { current: 2, found: 1 })
        ));
    }

    #[test]
    fn test_prune_keeps_record_rewritten_after_query() {
        let cache = ChunkCache::in_memory(1);
        let day = 24 * 60 * 60 * 1000;
        let now = 30 * day;
        cache.put_with_timestamp(record(0, 1), now - 10 * day);

        let cutoff = now - DEFAULT_MAX_AGE.as_millis() as u64;
        let expired = |meta: &EntryMeta| meta.timestamp < cutoff;
        assert_eq!(cache.store.query(&expired).unwrap().len(), 1);

        // A fresh write lands between the query and the delete
        cache.put_with_timestamp(record(0, 1), now);
        assert!(!cache.store.delete_if(&record(0, 1).key, &expired).unwrap());
        assert_eq!(cache.get(0, 0, "default", 1).unwrap().timestamp, now);
    }

    #[test]
    fn test_quota_failure_is_swallowed() {
        let cache = ChunkCache::new(MemoryStore::with_quota(16), 1);
        cache.put(record(0, 1));
        assert!(cache.get(0, 0, "default", 1).is_none());
    }

    #[test]
    fn test_clear() {
        let cache = ChunkCache::in_memory(1);
        cache.put(record(0, 1));
        cache.clear();
        assert!(cache.get(0, 0, "default", 1).is_none());
    }
}
