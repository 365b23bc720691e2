//! # STRATA Chunk Cache
//!
//! Persists generated chunks so revisiting an area skips generation and
//! meshing.
//!
//! ## Guarantees
//!
//! 1. **Optional**: every failure degrades to a miss or a dropped write
//! 2. **Versioned**: a record is only served for the exact key it was
//!    written under, generator version included
//! 3. **Checked**: records carry a magic, a format version and a CRC32
//!
//! ## Example
//!
//! ```rust
//! use strata_cache::{CachedChunkRecord, ChunkCache, ChunkKey};
//! use strata_procedural::{ChunkCoord, DensityGenerator, GenerationConfig};
//!
//! let generator = DensityGenerator::new(GenerationConfig::default());
//! let coord = ChunkCoord::new(0, 0);
//! let grid = generator.generate(coord);
//! let mesh = strata_meshing::mesh(&grid);
//!
//! let cache = ChunkCache::in_memory(1);
//! let key = ChunkKey::new(coord, "default", 1).unwrap();
//! cache.put(CachedChunkRecord::new(key, grid, mesh, None));
//!
//! assert!(cache.get(0, 0, "default", 1).is_some());
//! assert!(cache.get(0, 0, "default", 2).is_none());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod cache;
pub mod codec;
pub mod error;
pub mod key;
pub mod record;
pub mod store;

pub use cache::{ChunkCache, DEFAULT_MAX_AGE};
pub use error::{CacheError, CacheResult};
pub use key::ChunkKey;
pub use record::{now_millis, CachedChunkRecord};
pub use store::{EntryMeta, FileStore, MemoryStore, RecordStore, StoredEntry};
