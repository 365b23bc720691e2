//! # STRATA Procedural Generation
//!
//! Deterministic terrain density fields for infinite, reproducible worlds.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed always produces the same world
//! 2. **Chunked**: World is generated in fixed-size padded chunks
//! 3. **Seamless**: A voxel depends only on its world coordinate and the seed,
//!    so neighboring chunks agree on their shared padding
//! 4. **Editable**: Sphere edits keep every padded copy of a voxel in sync
//!
//! ## Core Components
//!
//! - `PerlinNoise`: Seedable 3D gradient noise
//! - `DensityGenerator`: Produces padded density + material grids
//! - `MaterialClassifier`: Pluggable material rules
//! - `SphereEdit`: Dig/build with smooth falloff
//! - `PlacementScatter`: Flora/tree/rock/hotspot spawn points
//! - `SeedAuthority`: Current seed with change notification
//!
//! ## Example
//!
//! ```rust
//! use strata_procedural::{ChunkCoord, DensityGenerator, GenerationConfig, WorldSeed};
//!
//! let generator = DensityGenerator::new(GenerationConfig::with_seed(WorldSeed::new(12345)));
//! let grid = generator.generate(ChunkCoord::new(0, 0));
//!
//! // The bottom layer is always solid
//! assert!(grid.is_solid(0, 0, 0));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod editor;
pub mod error;
pub mod generator;
pub mod grid;
pub mod material;
pub mod noise;
pub mod placement;
pub mod seed;

pub use config::{parse_seed, GenerationConfig, TerrainConfig};
pub use editor::{modify, SphereEdit, EDIT_EPSILON};
pub use error::{ProceduralError, ProceduralResult};
pub use generator::{ColumnSample, DensityGenerator};
pub use grid::{
    local_to_world_y, ChunkCoord, Material, VoxelGrid, CHUNK_SIZE, GRID_VOLUME, ISO_LEVEL, PAD, TOTAL_SIZE,
};
pub use material::{DefaultClassifier, MaterialClassifier, SurfaceSample};
pub use noise::{PerlinNoise, WorldSeed};
pub use placement::{PlacementBuffers, PlacementScatter};
pub use seed::{ListenerId, SeedAuthority, SeedListener, SeedState};
