//! The unit of caching: everything needed to show a chunk without
//! regenerating it.

use std::time::{SystemTime, UNIX_EPOCH};

use strata_meshing::MeshBuffers;
use strata_procedural::{PlacementBuffers, VoxelGrid};

use crate::key::ChunkKey;

/// A generated (and possibly edited) chunk with its meshes.
#[derive(Clone, Debug, PartialEq)]
pub struct CachedChunkRecord {
    /// Key the record is stored under. `key.coord()` matches `grid.coord`.
    pub key: ChunkKey,
    /// Density and material buffers.
    pub grid: VoxelGrid,
    /// Terrain and water meshes.
    pub mesh: MeshBuffers,
    /// Decoration points, if they were computed.
    pub placements: Option<PlacementBuffers>,
    /// Write time in milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl CachedChunkRecord {
    /// Creates a record with a zero timestamp; `ChunkCache::put` stamps it.
    #[must_use]
    pub fn new(key: ChunkKey, grid: VoxelGrid, mesh: MeshBuffers, placements: Option<PlacementBuffers>) -> Self {
        Self {
            key,
            grid,
            mesh,
            placements,
            timestamp: 0,
        }
    }
}

/// Milliseconds since the Unix epoch, 0 if the clock is before it.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}
