//! # Surface Nets Mesher
//!
//! Turns a padded `VoxelGrid` into terrain and water meshes. The mesher only
//! reads the grid.

use strata_procedural::{Material, TerrainConfig, VoxelGrid, GRID_VOLUME, ISO_LEVEL};

use crate::buffers::{MeshBuffers, TerrainMesh, WaterMesh};
use crate::shading;
use crate::surface_nets::{extract, Surface};

/// Mesher settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshConfig {
    /// World height of the water surface, for the wetness channel.
    pub water_level: f32,
}

impl MeshConfig {
    /// Takes the water level from terrain tunables.
    #[must_use]
    pub fn from_terrain(terrain: &TerrainConfig) -> Self {
        Self {
            water_level: terrain.water_level as f32,
        }
    }
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self::from_terrain(&TerrainConfig::default())
    }
}

/// Surface Nets mesher for terrain and water.
#[derive(Clone, Debug, Default)]
pub struct SurfaceNetsMesher {
    config: MeshConfig,
}

impl SurfaceNetsMesher {
    /// Creates a mesher.
    #[must_use]
    pub fn new(config: MeshConfig) -> Self {
        Self { config }
    }

    /// Mesher settings.
    #[must_use]
    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    /// Meshes terrain and water of one chunk.
    #[must_use]
    pub fn mesh(&self, grid: &VoxelGrid) -> MeshBuffers {
        let buffers = MeshBuffers {
            terrain: self.mesh_terrain(grid),
            water: self.mesh_water(grid),
        };
        tracing::debug!(
            cx = grid.coord.x,
            cz = grid.coord.z,
            terrain_triangles = buffers.terrain.triangle_count(),
            water_triangles = buffers.water.triangle_count(),
            "meshed chunk"
        );
        buffers
    }

    /// Solid terrain surface with material and shading channels.
    #[must_use]
    pub fn mesh_terrain(&self, grid: &VoxelGrid) -> TerrainMesh {
        let Surface {
            positions,
            normals,
            cells,
            indices,
        } = extract(grid.coord, grid.density(), |_, _| true);

        let n = positions.len();
        let mut mesh = TerrainMesh {
            material_ids: Vec::with_capacity(n),
            material_weights: Vec::with_capacity(n),
            wetness: Vec::with_capacity(n),
            mossiness: Vec::with_capacity(n),
            cavity: Vec::with_capacity(n),
            occlusion: Vec::with_capacity(n),
            ..TerrainMesh::default()
        };

        for ((position, normal), &cell) in positions.iter().zip(&normals).zip(&cells) {
            let (ids, weights) = shading::material_blend(grid, cell);
            let wet = shading::wetness(position[1], self.config.water_level);
            let cavity = shading::cavity(grid, cell);

            mesh.material_ids.push(ids);
            mesh.material_weights.push(weights);
            mesh.wetness.push(wet);
            mesh.mossiness.push(shading::mossiness(*normal, wet, cavity));
            mesh.cavity.push(cavity);
            mesh.occlusion.push(shading::occlusion(grid, cell));
        }

        mesh.positions = positions;
        mesh.normals = normals;
        mesh.indices = indices;
        mesh
    }

    /// Water/air interface of the binary water field with a shore mask.
    #[must_use]
    pub fn mesh_water(&self, grid: &VoxelGrid) -> WaterMesh {
        let density = grid.density();
        let material = grid.material();

        let mut field = vec![-1.0f32; GRID_VOLUME];
        let mut any_water = false;
        for (i, value) in field.iter_mut().enumerate() {
            if density[i] <= ISO_LEVEL && material[i] == Material::Water.id() {
                *value = 1.0;
                any_water = true;
            }
        }
        if !any_water {
            return WaterMesh::default();
        }

        // Water against solid ground is hidden by the terrain mesh
        let open = |i: usize| density[i] <= ISO_LEVEL;
        let Surface {
            positions,
            normals,
            cells,
            indices,
        } = extract(grid.coord, &field, |a, b| open(a) && open(b));

        let shore = cells.iter().map(|&cell| shading::shore(grid, cell)).collect();
        WaterMesh {
            positions,
            indices,
            normals,
            shore,
        }
    }
}

/// Meshes a grid with default settings.
#[must_use]
pub fn mesh(grid: &VoxelGrid) -> MeshBuffers {
    SurfaceNetsMesher::default().mesh(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_procedural::{
        ChunkCoord, DensityGenerator, GenerationConfig, WorldSeed, CHUNK_SIZE, TOTAL_SIZE,
    };

    /// Stone below `ground`, water up to `water` where open.
    fn basin(ground: usize, water: usize) -> VoxelGrid {
        let mut grid = VoxelGrid::new(ChunkCoord::new(0, 0));
        for z in 0..TOTAL_SIZE {
            for x in 0..TOTAL_SIZE {
                for y in 0..TOTAL_SIZE {
                    if y <= ground {
                        grid.set(x, y, z, (ground - y) as f32 + 0.5, Material::Stone);
                    } else if y <= water {
                        grid.set(x, y, z, -0.5, Material::Water);
                    }
                }
            }
        }
        grid
    }

    #[test]
    fn test_generated_chunk_mesh_is_consistent() {
        let generator = DensityGenerator::new(GenerationConfig::with_seed(WorldSeed::new(42)));
        let grid = generator.generate(ChunkCoord::new(0, 0));
        let buffers = mesh(&grid);

        assert!(buffers.terrain.triangle_count() > 0);
        assert!(buffers.is_consistent());
        for normal in &buffers.terrain.normals {
            let length = (normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2]).sqrt();
            assert!((length - 1.0).abs() < 1e-3);
        }
        for weights in &buffers.terrain.material_weights {
            let sum: f32 = weights.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_mesher_does_not_write_the_grid() {
        let generator = DensityGenerator::new(GenerationConfig::with_seed(WorldSeed::new(3)));
        let grid = generator.generate(ChunkCoord::new(1, -1));
        let before = grid.clone();
        let _ = mesh(&grid);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_water_surface_over_basin() {
        // Ground at local 8 (world 6), water up to local 12 (world 10)
        let grid = basin(8, 12);
        let buffers = mesh(&grid);

        // Only the top of the water is a water/air interface
        assert_eq!(buffers.water.triangle_count(), 2 * CHUNK_SIZE * CHUNK_SIZE);
        assert!(buffers.water.is_consistent());
        for (position, normal) in buffers.water.positions.iter().zip(&buffers.water.normals) {
            assert!((position[1] - 10.5).abs() < 1e-5);
            assert!(normal[1] > 0.99);
        }
        assert!(buffers.water.shore.iter().all(|&s| s == 0.0));

        // Submerged terrain is fully wet
        assert!(buffers.terrain.wetness.iter().all(|&w| w == 1.0));
    }

    #[test]
    fn test_shallow_water_touches_shore() {
        // Water sits directly on the ground
        let grid = basin(8, 9);
        let buffers = mesh(&grid);
        assert!(!buffers.water.is_empty());
        assert!(buffers.water.shore.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_dry_chunk_has_no_water_mesh() {
        let grid = basin(8, 0);
        let buffers = mesh(&grid);
        assert!(buffers.water.is_empty());
        assert_eq!(buffers.terrain.triangle_count(), 2 * CHUNK_SIZE * CHUNK_SIZE);
    }

    #[test]
    fn test_quads_stay_in_owned_columns() {
        let grid = basin(8, 0);
        let buffers = mesh(&grid);
        // Cells reach one voxel into the low-side padding
        let lo = -1.0;
        let hi = CHUNK_SIZE as f32;
        for position in &buffers.terrain.positions {
            assert!(position[0] >= lo && position[0] <= hi);
            assert!(position[2] >= lo && position[2] <= hi);
        }
    }
}
