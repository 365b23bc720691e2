//! # STRATA Meshing
//!
//! Surface Nets meshing of padded voxel grids.
//!
//! ## Output
//!
//! - `TerrainMesh`: positions, normals, indices, four-way material blend,
//!   wetness / mossiness / cavity / occlusion channels
//! - `WaterMesh`: water/air interface with a shore mask
//!
//! Positions are in world space. Two neighboring chunks meshed independently
//! produce bit-identical vertices on their shared face and never emit the
//! same quad twice.
//!
//! ## Example
//!
//! ```rust
//! use strata_meshing::mesh;
//! use strata_procedural::{ChunkCoord, DensityGenerator, GenerationConfig};
//!
//! let generator = DensityGenerator::new(GenerationConfig::default());
//! let buffers = mesh(&generator.generate(ChunkCoord::new(0, 0)));
//! assert!(buffers.terrain.triangle_count() > 0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod buffers;
pub mod mesher;
pub mod shading;
pub mod surface_nets;
pub mod tables;

pub use buffers::{MeshBuffers, TerrainMesh, WaterMesh};
pub use mesher::{mesh, MeshConfig, SurfaceNetsMesher};
