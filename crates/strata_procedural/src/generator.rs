//! # Density Field Generator
//!
//! Produces a padded `VoxelGrid` for a chunk coordinate.
//!
//! ## Layers
//!
//! 1. Domain warp of the horizontal sample position
//! 2. Height field: continental octave + two mountain octaves
//! 3. 3D overhang offset (cliffs, arches)
//! 4. Caves: a thin iso-band of 3D noise carved below the surface
//! 5. Floor guarantee: solid below `floor_depth`
//! 6. Material classification
//!
//! ## Locality
//!
//! A voxel's density and material depend on its world coordinate and the
//! seed, never on chunk-local indices. This is what makes the padding of two
//! neighboring chunks agree bit-for-bit. Column terms (warp, height, slope)
//! are evaluated at world `(x, z)` only, so caching them per chunk is safe.

use crate::config::GenerationConfig;
use crate::grid::{local_to_world_y, ChunkCoord, Material, VoxelGrid, ISO_LEVEL, TOTAL_SIZE};
use crate::material::{DefaultClassifier, MaterialClassifier, SurfaceSample};
use crate::noise::{PerlinNoise, WorldSeed};

/// Height-field values for one world column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColumnSample {
    /// Surface height of the warped height field.
    pub height: f64,
    /// Gradient magnitude of the height field (central differences).
    pub slope: f64,
}

/// Chunk generator using layered Perlin noise.
pub struct DensityGenerator {
    /// Seed and tunables.
    config: GenerationConfig,
    /// Horizontal domain warp.
    warp_noise: PerlinNoise,
    /// Continental and mountain octaves.
    height_noise: PerlinNoise,
    /// 3D overhang offset.
    overhang_noise: PerlinNoise,
    /// 3D cave band.
    cave_noise: PerlinNoise,
    /// Solid voxel materials.
    classifier: Box<dyn MaterialClassifier>,
}

impl DensityGenerator {
    /// Slice of the warp noise used for the X displacement.
    const WARP_LAYER_X: f64 = 0.5;
    /// Slice of the warp noise used for the Z displacement.
    const WARP_LAYER_Z: f64 = 17.5;
    /// Offset applied to the second warp sample.
    const WARP_OFFSET: f64 = 5.2;
    /// Height-noise slices for the three height octaves.
    const CONTINENT_LAYER: f64 = 0.5;
    const MOUNTAIN_LAYER: f64 = 41.5;
    const RIDGE_LAYER: f64 = 83.5;
    /// Offset that keeps cave samples off the overhang lattice.
    const CAVE_OFFSET: f64 = 0.37;

    /// Creates a generator with the default material rules.
    #[must_use]
    pub fn new(config: GenerationConfig) -> Self {
        let classifier = Box::new(DefaultClassifier::new(&config.terrain));
        Self::with_classifier(config, classifier)
    }

    /// Creates a generator with custom material rules.
    #[must_use]
    pub fn with_classifier(config: GenerationConfig, classifier: Box<dyn MaterialClassifier>) -> Self {
        let seed = config.seed;
        Self {
            warp_noise: PerlinNoise::new(seed.derive(1)),
            height_noise: PerlinNoise::new(seed.derive(2)),
            overhang_noise: PerlinNoise::new(seed.derive(3)),
            cave_noise: PerlinNoise::new(seed.derive(4)),
            classifier,
            config,
        }
    }

    /// Seed this generator was built for.
    #[must_use]
    pub fn seed(&self) -> WorldSeed {
        self.config.seed
    }

    /// Seed and tunables.
    #[must_use]
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Warped height field at a world column.
    #[must_use]
    pub fn surface_height(&self, world_x: i64, world_z: i64) -> f64 {
        let t = &self.config.terrain;
        let x = world_x as f64;
        let z = world_z as f64;

        let wf = t.warp_frequency;
        let qx = self.warp_noise.sample_2d(x * wf, z * wf, Self::WARP_LAYER_X) * t.warp_amplitude;
        let qz = self.warp_noise.sample_2d(
            x * wf + Self::WARP_OFFSET,
            z * wf + Self::WARP_OFFSET,
            Self::WARP_LAYER_Z,
        ) * t.warp_amplitude;
        let px = x + qx;
        let pz = z + qz;

        let continental = self.height_noise.sample_2d(
            px * t.continental_frequency,
            pz * t.continental_frequency,
            Self::CONTINENT_LAYER,
        );
        let mountain = self.height_noise.sample_2d(
            px * t.mountain_frequency,
            pz * t.mountain_frequency,
            Self::MOUNTAIN_LAYER,
        );
        let ridge = self.height_noise.sample_2d(
            px * t.ridge_frequency,
            pz * t.ridge_frequency,
            Self::RIDGE_LAYER,
        );

        t.base_height
            + continental * t.continental_amplitude
            + mountain.abs() * t.mountain_amplitude
            + ridge * t.ridge_amplitude
    }

    /// Height and slope at a world column.
    #[must_use]
    pub fn column(&self, world_x: i64, world_z: i64) -> ColumnSample {
        let height = self.surface_height(world_x, world_z);
        let dx = (self.surface_height(world_x + 1, world_z) - self.surface_height(world_x - 1, world_z)) * 0.5;
        let dz = (self.surface_height(world_x, world_z + 1) - self.surface_height(world_x, world_z - 1)) * 0.5;
        ColumnSample {
            height,
            slope: dx.hypot(dz),
        }
    }

    /// Density and material of a single world voxel.
    ///
    /// `generate` produces exactly these values for every voxel it covers.
    #[must_use]
    pub fn sample_voxel(&self, world_x: i64, world_y: i64, world_z: i64) -> (f32, Material) {
        let column = self.column(world_x, world_z);
        self.voxel(world_x, world_y, world_z, column)
    }

    /// Generates the padded grid of a chunk.
    #[must_use]
    pub fn generate(&self, coord: ChunkCoord) -> VoxelGrid {
        let mut grid = VoxelGrid::new(coord);

        // Heights for every column plus a one-column border for slopes
        let span = TOTAL_SIZE + 2;
        let mut heights = Vec::with_capacity(span * span);
        for hz in 0..span {
            let world_z = coord.local_to_world_z(hz) - 1;
            for hx in 0..span {
                let world_x = coord.local_to_world_x(hx) - 1;
                heights.push(self.surface_height(world_x, world_z));
            }
        }

        for z in 0..TOTAL_SIZE {
            let world_z = coord.local_to_world_z(z);
            for x in 0..TOTAL_SIZE {
                let world_x = coord.local_to_world_x(x);
                let h = |dx: usize, dz: usize| heights[(x + dx) + (z + dz) * span];
                let dx = (h(2, 1) - h(0, 1)) * 0.5;
                let dz = (h(1, 2) - h(1, 0)) * 0.5;
                let column = ColumnSample {
                    height: h(1, 1),
                    slope: dx.hypot(dz),
                };

                for y in 0..TOTAL_SIZE {
                    let (density, material) = self.voxel(world_x, local_to_world_y(y), world_z, column);
                    grid.set(x, y, z, density, material);
                }
            }
        }

        tracing::debug!(cx = coord.x, cz = coord.z, solid = grid.solid_count(), "generated chunk grid");
        grid
    }

    /// Evaluates one voxel given its column terms.
    fn voxel(&self, world_x: i64, world_y: i64, world_z: i64, column: ColumnSample) -> (f32, Material) {
        let t = &self.config.terrain;
        let x = world_x as f64;
        let y = world_y as f64;
        let z = world_z as f64;

        let of = t.overhang_frequency;
        let overhang = self.overhang_noise.sample(x * of, y * of, z * of) * t.overhang_amplitude;

        let mut density = column.height - y + overhang;

        let mut carved = false;
        if y > t.cave_floor && y < column.height - t.cave_surface_margin {
            let cf = t.cave_frequency;
            let cave = self.cave_noise.sample(
                x * cf + Self::CAVE_OFFSET,
                y * cf + Self::CAVE_OFFSET,
                z * cf + Self::CAVE_OFFSET,
            );
            if cave.abs() < t.cave_threshold {
                density -= t.cave_carve;
                carved = true;
            }
        }

        if y < t.floor_depth {
            density += t.floor_push;
        }

        let density = density as f32;
        let material = if density > ISO_LEVEL {
            self.classifier.classify(SurfaceSample {
                depth: column.height - y,
                height: y,
                slope: column.slope,
            })
        } else if !carved && y <= t.water_level {
            Material::Water
        } else {
            Material::Air
        };

        (density, material)
    }
}

impl std::fmt::Debug for DensityGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DensityGenerator")
            .field("seed", &self.config.seed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CHUNK_SIZE, PAD};

    fn generator(seed: u64) -> DensityGenerator {
        DensityGenerator::new(GenerationConfig::with_seed(WorldSeed::new(seed)))
    }

    #[test]
    fn test_chunk_generation_determinism() {
        let coord = ChunkCoord::new(5, -10);
        let grid1 = generator(42).generate(coord);
        let grid2 = generator(42).generate(coord);

        let bits1: Vec<u32> = grid1.density().iter().map(|d| d.to_bits()).collect();
        let bits2: Vec<u32> = grid2.density().iter().map(|d| d.to_bits()).collect();
        assert_eq!(bits1, bits2);
        assert_eq!(grid1.material(), grid2.material());
    }

    #[test]
    fn test_different_seeds_differ() {
        let coord = ChunkCoord::new(0, 0);
        let a = generator(1).generate(coord);
        let b = generator(2).generate(coord);
        assert_ne!(a.density(), b.density());
    }

    #[test]
    fn test_chunk_has_floor_and_sky() {
        let grid = generator(42).generate(ChunkCoord::new(0, 0));

        for z in 0..TOTAL_SIZE {
            for x in 0..TOTAL_SIZE {
                assert!(grid.is_solid(x, 0, z), "floor missing at ({x}, {z})");
                assert_eq!(grid.material_at(x, 0, z), Material::Bedrock);
                assert!(!grid.is_solid(x, TOTAL_SIZE - 1, z), "sky blocked at ({x}, {z})");
            }
        }
        assert!(grid.solid_count() > 0, "Chunk should have solid voxels");
    }

    #[test]
    fn test_grid_matches_pointwise_sampling() {
        let gen = generator(7);
        let coord = ChunkCoord::new(-3, 2);
        let grid = gen.generate(coord);

        for &(x, y, z) in &[(0, 0, 0), (2, 10, 2), (17, 14, 30), (35, 20, 35), (PAD, 12, PAD + CHUNK_SIZE)] {
            let (density, material) = gen.sample_voxel(
                coord.local_to_world_x(x),
                local_to_world_y(y),
                coord.local_to_world_z(z),
            );
            assert_eq!(grid.density_at(x, y, z).to_bits(), density.to_bits());
            assert_eq!(grid.material_at(x, y, z), material);
        }
    }

    #[test]
    fn test_solid_voxels_are_never_air_or_water() {
        let grid = generator(11).generate(ChunkCoord::new(1, 1));
        for z in 0..TOTAL_SIZE {
            for y in 0..TOTAL_SIZE {
                for x in 0..TOTAL_SIZE {
                    let material = grid.material_at(x, y, z);
                    if grid.is_solid(x, y, z) {
                        assert!(!material.is_fluid_or_air(), "solid {material:?} at ({x},{y},{z})");
                    } else {
                        assert!(material.is_fluid_or_air(), "open {material:?} at ({x},{y},{z})");
                    }
                }
            }
        }
    }

    #[test]
    fn test_water_only_at_or_below_water_level() {
        let gen = generator(3);
        let level = gen.config().terrain.water_level;
        for cx in -2..2 {
            let grid = gen.generate(ChunkCoord::new(cx, 0));
            for z in 0..TOTAL_SIZE {
                for y in 0..TOTAL_SIZE {
                    for x in 0..TOTAL_SIZE {
                        if grid.material_at(x, y, z) == Material::Water {
                            assert!(local_to_world_y(y) as f64 <= level);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_custom_classifier() {
        struct AllSnow;
        impl MaterialClassifier for AllSnow {
            fn classify(&self, _: SurfaceSample) -> Material {
                Material::Snow
            }
        }

        let gen = DensityGenerator::with_classifier(
            GenerationConfig::with_seed(WorldSeed::new(9)),
            Box::new(AllSnow),
        );
        let grid = gen.generate(ChunkCoord::new(0, 0));
        assert_eq!(grid.material_at(10, 0, 10), Material::Snow);
    }

    #[test]
    fn test_far_away_chunks_are_finite() {
        let gen = generator(42);
        let grid = gen.generate(ChunkCoord::new(i32::MAX - 1, i32::MIN + 1));
        assert!(grid.density().iter().all(|d| d.is_finite()));
    }
}
