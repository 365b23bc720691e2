//! # Generation Configuration
//!
//! `GenerationConfig` carries the seed explicitly into every generator; there
//! is no process-wide "current seed".
//!
//! `TerrainConfig` holds every tuned constant of the density field. The
//! defaults are empirically tuned; override them from a TOML file:
//!
//! ```toml
//! base_height = 14.0
//! water_level = 8.0
//! cave_threshold = 0.05
//! ```
//!
//! Missing keys keep their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ProceduralError, ProceduralResult};
use crate::noise::WorldSeed;

/// Seed and world shape for one generator instance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenerationConfig {
    /// World seed.
    pub seed: WorldSeed,
    /// Density field tunables.
    pub terrain: TerrainConfig,
}

impl GenerationConfig {
    /// Creates a config with default terrain tunables.
    #[must_use]
    pub fn with_seed(seed: WorldSeed) -> Self {
        Self {
            seed,
            terrain: TerrainConfig::default(),
        }
    }

    /// Reads the seed from a URL-style query string (`?seed=42&debug=1`).
    ///
    /// Falls back to `WorldSeed::DEFAULT` when no `seed` parameter is present.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSeed` if the parameter is present but not a positive integer.
    pub fn from_query(query: &str) -> ProceduralResult<Self> {
        let query = query.trim_start_matches('?');
        let raw = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "seed")
            .map(|(_, value)| value);

        let seed = match raw {
            None | Some("") => WorldSeed::DEFAULT,
            Some(value) => parse_seed(value)?,
        };
        Ok(Self::with_seed(seed))
    }
}

/// Parses a positive integer seed.
///
/// # Errors
///
/// Returns `InvalidSeed` for zero, negative or non-numeric input.
pub fn parse_seed(value: &str) -> ProceduralResult<WorldSeed> {
    match value.trim().parse::<u64>() {
        Ok(seed) if seed > 0 => Ok(WorldSeed::new(seed)),
        _ => Err(ProceduralError::InvalidSeed(value.to_string())),
    }
}

/// Density field tunables. All distances are in world voxels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Mean surface height.
    pub base_height: f64,
    /// Frequency of the horizontal domain warp.
    pub warp_frequency: f64,
    /// Maximum horizontal warp displacement.
    pub warp_amplitude: f64,
    /// Frequency of the continental height octave.
    pub continental_frequency: f64,
    /// Amplitude of the continental height octave.
    pub continental_amplitude: f64,
    /// Frequency of the primary mountain octave.
    pub mountain_frequency: f64,
    /// Amplitude of the primary mountain octave.
    pub mountain_amplitude: f64,
    /// Frequency of the secondary mountain octave.
    pub ridge_frequency: f64,
    /// Amplitude of the secondary mountain octave.
    pub ridge_amplitude: f64,
    /// Frequency of the 3D overhang noise.
    pub overhang_frequency: f64,
    /// Amplitude of the 3D overhang noise.
    pub overhang_amplitude: f64,
    /// Frequency of the cave noise.
    pub cave_frequency: f64,
    /// Half-width of the cave iso-band (|noise| below this carves).
    pub cave_threshold: f64,
    /// Density removed inside a cave.
    pub cave_carve: f64,
    /// Caves never reach at or below this height.
    pub cave_floor: f64,
    /// Caves stay at least this far below the surface.
    pub cave_surface_margin: f64,
    /// Below this height the floor guarantee applies.
    pub floor_depth: f64,
    /// Density added below `floor_depth`.
    pub floor_push: f64,
    /// Open voxels at or below this height hold water.
    pub water_level: f64,
    /// Soil thickness before stone starts.
    pub dirt_depth: f64,
    /// Height above which surface voxels turn to snow.
    pub snow_line: f64,
    /// Height band above the water level that turns to sand.
    pub beach_band: f64,
    /// Surface slope (rise over run) above which soil gives way to stone.
    pub steep_slope: f64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            base_height: 13.0,
            warp_frequency: 0.012,
            warp_amplitude: 8.0,
            continental_frequency: 0.004,
            continental_amplitude: 8.0,
            mountain_frequency: 0.021,
            mountain_amplitude: 6.0,
            ridge_frequency: 0.057,
            ridge_amplitude: 2.0,
            overhang_frequency: 0.071,
            overhang_amplitude: 2.5,
            cave_frequency: 0.089,
            cave_threshold: 0.06,
            cave_carve: 40.0,
            cave_floor: 2.0,
            cave_surface_margin: 4.0,
            floor_depth: 1.0,
            floor_push: 100.0,
            water_level: 9.0,
            dirt_depth: 3.0,
            snow_line: 25.0,
            beach_band: 1.5,
            steep_slope: 1.2,
        }
    }
}

impl TerrainConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigParse` if the document is malformed.
    pub fn from_toml_str(source: &str) -> ProceduralResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Loads a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigRead` if the file cannot be read, `ConfigParse` if it
    /// is malformed.
    pub fn from_file(path: impl AsRef<Path>) -> ProceduralResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ProceduralError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}
