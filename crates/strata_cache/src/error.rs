//! # Cache Error Types
//!
//! Stores and the codec report these. `ChunkCache` never hands them to its
//! callers: it logs them and degrades to a miss or a skipped write.

use thiserror::Error;

/// Errors that can occur in the chunk cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Filesystem operation failed.
    #[error("cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Writing the entry would exceed the store's byte quota.
    #[error("cache quota exceeded: need {needed} bytes, limit {limit}")]
    QuotaExceeded {
        /// Bytes the store would hold after the write.
        needed: u64,
        /// Configured limit.
        limit: u64,
    },

    /// Stored bytes failed validation.
    #[error("corrupted cache entry: {0}")]
    Corrupted(String),

    /// An entry was found under a key other than the one it was written for.
    #[error("key mismatch: expected {expected}, found {found}")]
    KeyMismatch {
        /// Key that was requested.
        expected: String,
        /// Key embedded in the entry.
        found: String,
    },

    /// A record was written for a generator version other than the cache's.
    #[error("stale record: cache holds version {current}, record has version {found}")]
    StaleVersion {
        /// Version of the cache.
        current: u32,
        /// Version in the record key.
        found: u32,
    },

    /// A key string could not be parsed.
    #[error("invalid cache key {0:?}")]
    InvalidKey(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
