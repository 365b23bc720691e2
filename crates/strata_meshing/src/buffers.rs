//! # Mesh Buffers
//!
//! Output of the mesher, one set per chunk. Buffers are never patched: every
//! remesh replaces them wholesale.
//!
//! All per-vertex channels are parallel to `positions`.

/// Solid terrain surface with material blending and shading channels.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TerrainMesh {
    /// World-space positions.
    pub positions: Vec<[f32; 3]>,
    /// Triangle list (u32 for large meshes).
    pub indices: Vec<u32>,
    /// Unit normals.
    pub normals: Vec<[f32; 3]>,
    /// Up to four material ids per vertex, strongest first.
    pub material_ids: Vec<[u8; 4]>,
    /// Blend weights for `material_ids`, summing to 1.
    pub material_weights: Vec<[f32; 4]>,
    /// 1 at or below the water line, fading out above it.
    pub wetness: Vec<f32>,
    /// Moss coverage on upward-facing damp or sheltered ground.
    pub mossiness: Vec<f32>,
    /// Concavity from the local solid fraction.
    pub cavity: Vec<f32>,
    /// Ambient occlusion, 1 = fully lit.
    pub occlusion: Vec<f32>,
}

impl TerrainMesh {
    /// Check if mesh is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Get vertex count
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get triangle count
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Returns true if every channel matches `positions` and every index is
    /// in range.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let n = self.positions.len();
        self.normals.len() == n
            && self.material_ids.len() == n
            && self.material_weights.len() == n
            && self.wetness.len() == n
            && self.mossiness.len() == n
            && self.cavity.len() == n
            && self.occlusion.len() == n
            && indices_valid(&self.indices, n)
    }
}

/// Water surface with a shore mask.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WaterMesh {
    /// World-space positions.
    pub positions: Vec<[f32; 3]>,
    /// Triangle list.
    pub indices: Vec<u32>,
    /// Unit normals.
    pub normals: Vec<[f32; 3]>,
    /// 1.0 near solid ground (within one voxel of the cell), else 0.0.
    pub shore: Vec<f32>,
}

impl WaterMesh {
    /// Check if mesh is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Get vertex count
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get triangle count
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Returns true if every channel matches `positions` and every index is
    /// in range.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let n = self.positions.len();
        self.normals.len() == n && self.shore.len() == n && indices_valid(&self.indices, n)
    }
}

/// Everything the mesher produces for one chunk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBuffers {
    /// Solid terrain.
    pub terrain: TerrainMesh,
    /// Water surface.
    pub water: WaterMesh,
}

impl MeshBuffers {
    /// Returns true if neither mesh has geometry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terrain.is_empty() && self.water.is_empty()
    }

    /// Triangles over both meshes.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.terrain.triangle_count() + self.water.triangle_count()
    }

    /// Returns true if both meshes are internally consistent.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.terrain.is_consistent() && self.water.is_consistent()
    }
}

fn indices_valid(indices: &[u32], vertex_count: usize) -> bool {
    indices.len() % 3 == 0 && indices.iter().all(|&i| (i as usize) < vertex_count)
}
