//! # Procedural Error Types
//!
//! Generation itself is total; only configuration can fail.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while configuring terrain generation.
#[derive(Error, Debug)]
pub enum ProceduralError {
    /// A configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration document was not valid TOML for the expected schema.
    #[error("invalid configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A seed value was present but not a positive integer.
    #[error("invalid seed {0:?}: expected a positive integer")]
    InvalidSeed(String),
}

/// Result type for procedural configuration.
pub type ProceduralResult<T> = Result<T, ProceduralError>;
