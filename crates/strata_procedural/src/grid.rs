//! # Voxel Grid
//!
//! World data is organized into fixed-size chunks. Each chunk's grid is padded
//! by `PAD` voxels on every side with values sampled at the same world
//! coordinates its neighbors use, so chunks mesh seamlessly.
//!
//! ## Grid Format
//!
//! A grid is a `TOTAL_SIZE`³ cube holding:
//! - `density` (f32): positive = solid, surface at `ISO_LEVEL`
//! - `material` (u8): `Material` id, meaningful where solid (or water)
//!
//! Indexing is `x + y * TOTAL_SIZE + z * TOTAL_SIZE²`.

/// Chunk width/depth/height in voxels (the logical, unpadded extent).
pub const CHUNK_SIZE: usize = 32;

/// Padding layers on each face of a chunk grid.
pub const PAD: usize = 2;

/// Side length of a padded grid.
pub const TOTAL_SIZE: usize = CHUNK_SIZE + 2 * PAD;

/// Number of voxels in a padded grid.
pub const GRID_VOLUME: usize = TOTAL_SIZE * TOTAL_SIZE * TOTAL_SIZE;

/// Density threshold separating solid (above) from air (at or below).
pub const ISO_LEVEL: f32 = 0.0;

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// X coordinate (in chunks, not voxels).
    pub x: i32,
    /// Z coordinate (in chunks, not voxels).
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Converts world voxel coordinates to the owning chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn from_world_pos(world_x: i64, world_z: i64) -> Self {
        Self {
            x: world_x.div_euclid(CHUNK_SIZE as i64) as i32,
            z: world_z.div_euclid(CHUNK_SIZE as i64) as i32,
        }
    }

    /// Returns the world X coordinate of the chunk's origin (corner).
    #[inline]
    #[must_use]
    pub const fn world_x(self) -> i64 {
        self.x as i64 * CHUNK_SIZE as i64
    }

    /// Returns the world Z coordinate of the chunk's origin.
    #[inline]
    #[must_use]
    pub const fn world_z(self) -> i64 {
        self.z as i64 * CHUNK_SIZE as i64
    }

    /// World X coordinate of local grid column `x` (padding included).
    #[inline]
    #[must_use]
    pub const fn local_to_world_x(self, x: usize) -> i64 {
        x as i64 - PAD as i64 + self.world_x()
    }

    /// World Z coordinate of local grid column `z` (padding included).
    #[inline]
    #[must_use]
    pub const fn local_to_world_z(self, z: usize) -> i64 {
        z as i64 - PAD as i64 + self.world_z()
    }
}

/// World Y coordinate of local grid layer `y`.
#[inline]
#[must_use]
pub const fn local_to_world_y(y: usize) -> i64 {
    y as i64 - PAD as i64
}

/// Terrain material ids stored in the material grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Material {
    /// Empty space.
    #[default]
    Air = 0,
    /// Deep rock and cliffs.
    Stone = 1,
    /// Subsurface soil.
    Dirt = 2,
    /// Vegetated top layer.
    Grass = 3,
    /// Shorelines.
    Sand = 4,
    /// High peaks.
    Snow = 5,
    /// Indestructible world floor.
    Bedrock = 6,
    /// Standing water below the water level.
    Water = 7,
}

impl Material {
    /// Number of material ids.
    pub const COUNT: usize = 8;

    /// Converts from u8. Unknown ids map to `Stone`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Air,
            1 => Self::Stone,
            2 => Self::Dirt,
            3 => Self::Grass,
            4 => Self::Sand,
            5 => Self::Snow,
            6 => Self::Bedrock,
            7 => Self::Water,
            _ => Self::Stone,
        }
    }

    /// Raw id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Returns true for materials that are never part of the solid mesh.
    #[inline]
    #[must_use]
    pub const fn is_fluid_or_air(self) -> bool {
        matches!(self, Self::Air | Self::Water)
    }
}

/// A padded chunk of density and material data.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelGrid {
    /// Chunk position in the world.
    pub coord: ChunkCoord,
    /// Density per voxel (`GRID_VOLUME` entries).
    density: Vec<f32>,
    /// Material id per voxel (`GRID_VOLUME` entries).
    material: Vec<u8>,
}

impl VoxelGrid {
    /// Creates a grid filled with air.
    #[must_use]
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            density: vec![ISO_LEVEL - 1.0; GRID_VOLUME],
            material: vec![Material::Air.id(); GRID_VOLUME],
        }
    }

    /// Rebuilds a grid from raw buffers (e.g. read back from the cache).
    ///
    /// Returns `None` if either buffer has the wrong length.
    #[must_use]
    pub fn from_raw(coord: ChunkCoord, density: Vec<f32>, material: Vec<u8>) -> Option<Self> {
        if density.len() != GRID_VOLUME || material.len() != GRID_VOLUME {
            return None;
        }
        Some(Self {
            coord,
            density,
            material,
        })
    }

    /// Flat buffer index of a local voxel.
    #[inline]
    #[must_use]
    pub const fn index(x: usize, y: usize, z: usize) -> usize {
        x + y * TOTAL_SIZE + z * TOTAL_SIZE * TOTAL_SIZE
    }

    /// Density at local coordinates.
    #[inline]
    #[must_use]
    pub fn density_at(&self, x: usize, y: usize, z: usize) -> f32 {
        self.density[Self::index(x, y, z)]
    }

    /// Material at local coordinates.
    #[inline]
    #[must_use]
    pub fn material_at(&self, x: usize, y: usize, z: usize) -> Material {
        Material::from_u8(self.material[Self::index(x, y, z)])
    }

    /// Returns true if the voxel is above the iso level.
    #[inline]
    #[must_use]
    pub fn is_solid(&self, x: usize, y: usize, z: usize) -> bool {
        self.density_at(x, y, z) > ISO_LEVEL
    }

    /// Sets density and material at local coordinates.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, density: f32, material: Material) {
        let i = Self::index(x, y, z);
        self.density[i] = density;
        self.material[i] = material.id();
    }

    /// Raw density buffer.
    #[must_use]
    pub fn density(&self) -> &[f32] {
        &self.density
    }

    /// Raw material buffer.
    #[must_use]
    pub fn material(&self) -> &[u8] {
        &self.material
    }

    /// Mutable access to both buffers at once.
    pub fn buffers_mut(&mut self) -> (&mut [f32], &mut [u8]) {
        (&mut self.density, &mut self.material)
    }

    /// Number of solid voxels in the whole padded grid.
    #[must_use]
    pub fn solid_count(&self) -> usize {
        self.density.iter().filter(|&&d| d > ISO_LEVEL).count()
    }
}
