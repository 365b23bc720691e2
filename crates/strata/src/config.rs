//! # Pipeline and Bake Configuration
//!
//! `PipelineConfig` is what a `TerrainPipeline` needs. `BakeConfig` is the
//! TOML document read by `strata_bake`:
//!
//! ```toml
//! seed = 42
//! world_type = "default"
//! version = 3
//! cache_dir = "cache/chunks"
//! radius = 4
//!
//! [terrain]
//! water_level = 8.0
//! ```
//!
//! Missing keys keep their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strata_meshing::MeshConfig;
use strata_procedural::{parse_seed, ChunkCoord, GenerationConfig, TerrainConfig, WorldSeed};

use crate::error::{PipelineError, PipelineResult};

/// Settings of one pipeline instance.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Initial seed and terrain tunables.
    pub generation: GenerationConfig,
    /// World flavor; part of every cache key.
    pub world_type: String,
    /// Generator version; part of every cache key.
    pub version: u32,
}

impl PipelineConfig {
    /// Mesher settings matching the terrain tunables.
    #[must_use]
    pub fn mesh_config(&self) -> MeshConfig {
        MeshConfig::from_terrain(&self.generation.terrain)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            world_type: "default".to_string(),
            version: 1,
        }
    }
}

/// Settings of the bake tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeConfig {
    /// World seed, positive.
    pub seed: u64,
    /// World flavor.
    pub world_type: String,
    /// Generator version.
    pub version: u32,
    /// Cache directory; without one nothing is persisted.
    pub cache_dir: Option<PathBuf>,
    /// Byte quota of the cache directory.
    pub cache_quota: Option<u64>,
    /// Chunk at the center of the baked square.
    pub center: [i32; 2],
    /// Chunks baked on each side of the center.
    pub radius: u32,
    /// Cached records older than this many days are pruned before baking.
    pub prune_age_days: u64,
    /// Density field tunables.
    pub terrain: TerrainConfig,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            seed: WorldSeed::DEFAULT.value(),
            world_type: "default".to_string(),
            version: 1,
            cache_dir: None,
            cache_quota: None,
            center: [0, 0],
            radius: 2,
            prune_age_days: 7,
            terrain: TerrainConfig::default(),
        }
    }
}

impl BakeConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigParse` if the document is malformed.
    pub fn from_toml_str(source: &str) -> PipelineResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Loads a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigRead` if the file cannot be read, `ConfigParse` if it
    /// is malformed.
    pub fn from_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| PipelineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Pipeline settings for this bake.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the seed is zero.
    pub fn pipeline_config(&self) -> PipelineResult<PipelineConfig> {
        let seed = parse_seed(&self.seed.to_string())?;
        Ok(PipelineConfig {
            generation: GenerationConfig {
                seed,
                terrain: self.terrain.clone(),
            },
            world_type: self.world_type.clone(),
            version: self.version,
        })
    }

    /// Every chunk in the square, row by row.
    #[must_use]
    pub fn coords(&self) -> Vec<ChunkCoord> {
        let r = self.radius as i32;
        let [cx, cz] = self.center;
        (-r..=r)
            .flat_map(|dz| (-r..=r).map(move |dx| ChunkCoord::new(cx + dx, cz + dz)))
            .collect()
    }

    /// Maximum age of cached records.
    #[must_use]
    pub fn prune_age(&self) -> Duration {
        Duration::from_secs(self.prune_age_days * 24 * 60 * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_keep_defaults() {
        let config = BakeConfig::from_toml_str("seed = 42\nradius = 1\n").unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.radius, 1);
        assert_eq!(config.world_type, "default");
        assert_eq!(config.terrain, TerrainConfig::default());
        assert_eq!(config.coords().len(), 9);
    }

    #[test]
    fn test_terrain_table_overrides() {
        let config = BakeConfig::from_toml_str("[terrain]\nwater_level = 4.0\n").unwrap();
        assert_eq!(config.terrain.water_level, 4.0);
        assert_eq!(config.pipeline_config().unwrap().mesh_config().water_level, 4.0);
    }

    #[test]
    fn test_zero_seed_is_rejected() {
        let config = BakeConfig {
            seed: 0,
            ..BakeConfig::default()
        };
        assert!(matches!(config.pipeline_config(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_square_is_centered() {
        let config = BakeConfig {
            center: [10, -4],
            radius: 1,
            ..BakeConfig::default()
        };
        let coords = config.coords();
        assert_eq!(coords.first(), Some(&ChunkCoord::new(9, -5)));
        assert_eq!(coords.last(), Some(&ChunkCoord::new(11, -3)));
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(
            BakeConfig::from_toml_str("seed = \"many\""),
            Err(PipelineError::ConfigParse(_))
        ));
    }
}
