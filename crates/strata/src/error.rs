//! # Pipeline Error Types

use std::path::PathBuf;

use strata_cache::CacheError;
use strata_procedural::{ChunkCoord, ProceduralError};
use thiserror::Error;

/// Errors surfaced by the terrain pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The seed changed while the chunk was being produced; the result was
    /// discarded.
    #[error("seed changed during load (started in epoch {started}, now {current})")]
    SeedChanged {
        /// Epoch the load started in.
        started: u64,
        /// Epoch at completion.
        current: u64,
    },

    /// The chunk is not resident.
    #[error("chunk {0:?} is not loaded")]
    NotLoaded(ChunkCoord),

    /// Generation settings were rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ProceduralError),

    /// World type cannot be used in a cache key.
    #[error("invalid world type {0:?}: must be non-empty and contain no commas")]
    InvalidWorldType(String),

    /// A tool configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    ConfigRead {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A tool configuration document was malformed.
    #[error("invalid bake configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The cache could not be opened.
    #[error("cache unavailable: {0}")]
    Cache(#[from] CacheError),
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
