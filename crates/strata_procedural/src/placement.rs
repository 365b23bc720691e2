//! # Placement Scatter
//!
//! Derives world-space spawn points for decoration from a finished grid:
//! flora and trees on grass, rocks on bare ground, hotspots on cave floors.
//!
//! Only interior columns are scanned, so each point belongs to exactly one
//! chunk. Selection uses noise thresholds on the world column, so the result
//! is a pure function of the grid and the seed.

use crate::grid::{local_to_world_y, Material, VoxelGrid, CHUNK_SIZE, PAD, TOTAL_SIZE};
use crate::noise::{PerlinNoise, WorldSeed};

/// World-space spawn points for one chunk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlacementBuffers {
    /// Small plants on grass.
    pub flora: Vec<[f32; 3]>,
    /// Tree bases on grass.
    pub trees: Vec<[f32; 3]>,
    /// Boulders on stone, sand and snow.
    pub rocks: Vec<[f32; 3]>,
    /// Points of interest on cave floors.
    pub hotspots: Vec<[f32; 3]>,
}

impl PlacementBuffers {
    /// Total number of points over all categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flora.len() + self.trees.len() + self.rocks.len() + self.hotspots.len()
    }

    /// Returns true if no category holds a point.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Noise-driven scatter of decoration points.
pub struct PlacementScatter {
    flora_noise: PerlinNoise,
    tree_noise: PerlinNoise,
    rock_noise: PerlinNoise,
    hotspot_noise: PerlinNoise,
}

impl PlacementScatter {
    /// Flora sampling frequency.
    const FLORA_FREQUENCY: f64 = 0.45;
    /// Lower frequency for clumped forests.
    const TREE_FREQUENCY: f64 = 0.3;
    const ROCK_FREQUENCY: f64 = 0.5;
    const HOTSPOT_FREQUENCY: f64 = 0.2;

    /// Noise value a column must exceed to receive a point.
    const FLORA_THRESHOLD: f64 = 0.25;
    const TREE_THRESHOLD: f64 = 0.5;
    const ROCK_THRESHOLD: f64 = 0.35;
    const HOTSPOT_THRESHOLD: f64 = 0.3;

    /// Off-lattice slice so integer columns don't sample zero.
    const LAYER: f64 = 0.5;

    /// Creates a scatter for `seed`.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            flora_noise: PerlinNoise::new(seed.derive(16)),
            tree_noise: PerlinNoise::new(seed.derive(17)),
            rock_noise: PerlinNoise::new(seed.derive(18)),
            hotspot_noise: PerlinNoise::new(seed.derive(19)),
        }
    }

    /// Scatters points over the interior columns of `grid`.
    #[must_use]
    pub fn scatter(&self, grid: &VoxelGrid) -> PlacementBuffers {
        let mut buffers = PlacementBuffers::default();
        let coord = grid.coord;

        for z in PAD..PAD + CHUNK_SIZE {
            let world_z = coord.local_to_world_z(z);
            for x in PAD..PAD + CHUNK_SIZE {
                let world_x = coord.local_to_world_x(x);
                let sample = |noise: &PerlinNoise, frequency: f64| {
                    noise.sample_2d(world_x as f64 * frequency, world_z as f64 * frequency, Self::LAYER)
                };

                let mut first = true;
                for y in (0..TOTAL_SIZE - 1).rev() {
                    if !Self::is_floor(grid, x, y, z) {
                        continue;
                    }
                    let point = [world_x as f32, Self::floor_height(grid, x, y, z), world_z as f32];

                    if first {
                        match grid.material_at(x, y, z) {
                            Material::Grass => {
                                if sample(&self.tree_noise, Self::TREE_FREQUENCY) > Self::TREE_THRESHOLD {
                                    buffers.trees.push(point);
                                } else if sample(&self.flora_noise, Self::FLORA_FREQUENCY) > Self::FLORA_THRESHOLD {
                                    buffers.flora.push(point);
                                }
                            }
                            Material::Stone | Material::Sand | Material::Snow => {
                                if sample(&self.rock_noise, Self::ROCK_FREQUENCY) > Self::ROCK_THRESHOLD {
                                    buffers.rocks.push(point);
                                }
                            }
                            _ => {}
                        }
                        first = false;
                    } else if sample(&self.hotspot_noise, Self::HOTSPOT_FREQUENCY) > Self::HOTSPOT_THRESHOLD {
                        buffers.hotspots.push(point);
                    }
                }
            }
        }

        tracing::debug!(
            cx = coord.x,
            cz = coord.z,
            flora = buffers.flora.len(),
            trees = buffers.trees.len(),
            rocks = buffers.rocks.len(),
            hotspots = buffers.hotspots.len(),
            "scattered placements"
        );
        buffers
    }

    /// Solid voxel with open air (not water) directly above.
    fn is_floor(grid: &VoxelGrid, x: usize, y: usize, z: usize) -> bool {
        grid.is_solid(x, y, z) && !grid.is_solid(x, y + 1, z) && grid.material_at(x, y + 1, z) != Material::Water
    }

    /// World height of the iso crossing between `y` and `y + 1`.
    fn floor_height(grid: &VoxelGrid, x: usize, y: usize, z: usize) -> f32 {
        let below = grid.density_at(x, y, z);
        let above = grid.density_at(x, y + 1, z);
        let t = below / (below - above);
        local_to_world_y(y) as f32 + t
    }
}

impl std::fmt::Debug for PlacementScatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacementScatter").finish_non_exhaustive()
    }
}
