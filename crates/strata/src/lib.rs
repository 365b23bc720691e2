//! # STRATA
//!
//! Seeded, editable voxel terrain: density generation, Surface Nets
//! meshing, decoration scatter and a persistent chunk cache behind one
//! pipeline.
//!
//! ## Architecture
//!
//! - `strata_procedural`: noise, density fields, edits, placements, seed
//! - `strata_meshing`: terrain and water meshes
//! - `strata_cache`: versioned chunk records
//! - `TerrainPipeline`: loading, editing and seed changes across chunks
//!
//! ## Example
//!
//! ```rust
//! use strata::{EditRequest, PipelineConfig, TerrainPipeline};
//! use strata_procedural::ChunkCoord;
//!
//! let pipeline = TerrainPipeline::new(PipelineConfig::default()).unwrap();
//! pipeline.load_chunk(ChunkCoord::new(0, 0)).unwrap();
//!
//! // Dig a hole at the origin
//! let changed = pipeline.apply_edit(EditRequest::dig([4.0, 10.0, 4.0], 3.0, 8.0));
//! assert_eq!(changed, vec![ChunkCoord::new(0, 0)]);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod pipeline;

pub use config::{BakeConfig, PipelineConfig};
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{ChunkSource, ChunkView, EditRequest, LoadedChunk, PipelineStats, TerrainPipeline};

/// Re-export sub-crates for convenience.
pub use strata_cache as cache;
pub use strata_meshing as meshing;
pub use strata_procedural as procedural;
