//! # Material Classification
//!
//! Decides which material a solid voxel is made of.
//!
//! Inputs are limited to what can be computed from the voxel's world
//! coordinate alone (depth below the height field, absolute height, local
//! slope of the height field), so classification preserves boundary
//! consistency like the density does.

use std::sync::Arc;

use crate::config::TerrainConfig;
use crate::grid::Material;

/// Everything a classifier may look at for one solid voxel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSample {
    /// `surface_height - wy`; negative under overhangs.
    pub depth: f64,
    /// Absolute world height `wy`.
    pub height: f64,
    /// Height-field gradient magnitude (rise over run).
    pub slope: f64,
}

/// Maps a solid voxel's surroundings to a material.
pub trait MaterialClassifier: Send + Sync {
    /// Material for a solid voxel. Must not return `Air` or `Water`.
    fn classify(&self, sample: SurfaceSample) -> Material;
}

/// Lets one set of rules serve every generator rebuilt after a seed change.
impl<T: MaterialClassifier + ?Sized> MaterialClassifier for Arc<T> {
    fn classify(&self, sample: SurfaceSample) -> Material {
        (**self).classify(sample)
    }
}

/// Height/depth/slope rules tuned from a `TerrainConfig`.
///
/// In priority order:
/// 1. below `floor_depth`: bedrock
/// 2. deeper than `dirt_depth`: stone
/// 3. slope above `steep_slope`: stone (cliff faces)
/// 4. within `beach_band` of the water level: sand
/// 5. above `snow_line`: snow
/// 6. within one voxel of the surface: grass
/// 7. otherwise: dirt
#[derive(Clone, Debug)]
pub struct DefaultClassifier {
    floor_depth: f64,
    dirt_depth: f64,
    steep_slope: f64,
    water_level: f64,
    beach_band: f64,
    snow_line: f64,
}

impl DefaultClassifier {
    /// Builds the rule set from terrain tunables.
    #[must_use]
    pub fn new(config: &TerrainConfig) -> Self {
        Self {
            floor_depth: config.floor_depth,
            dirt_depth: config.dirt_depth,
            steep_slope: config.steep_slope,
            water_level: config.water_level,
            beach_band: config.beach_band,
            snow_line: config.snow_line,
        }
    }
}

impl Default for DefaultClassifier {
    fn default() -> Self {
        Self::new(&TerrainConfig::default())
    }
}

impl MaterialClassifier for DefaultClassifier {
    fn classify(&self, sample: SurfaceSample) -> Material {
        if sample.height < self.floor_depth {
            Material::Bedrock
        } else if sample.depth > self.dirt_depth || sample.slope > self.steep_slope {
            Material::Stone
        } else if sample.height <= self.water_level + self.beach_band {
            Material::Sand
        } else if sample.height > self.snow_line {
            Material::Snow
        } else if sample.depth < 1.0 {
            Material::Grass
        } else {
            Material::Dirt
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(depth: f64, height: f64, slope: f64) -> SurfaceSample {
        SurfaceSample { depth, height, slope }
    }

    #[test]
    fn test_default_rules() {
        let c = DefaultClassifier::default();

        assert_eq!(c.classify(sample(20.0, 0.0, 0.0)), Material::Bedrock);
        assert_eq!(c.classify(sample(8.0, 5.0, 0.0)), Material::Stone);
        assert_eq!(c.classify(sample(0.5, 15.0, 2.0)), Material::Stone);
        assert_eq!(c.classify(sample(0.5, 10.0, 0.1)), Material::Sand);
        assert_eq!(c.classify(sample(0.5, 28.0, 0.1)), Material::Snow);
        assert_eq!(c.classify(sample(0.5, 15.0, 0.1)), Material::Grass);
        assert_eq!(c.classify(sample(2.0, 15.0, 0.1)), Material::Dirt);
    }

    #[test]
    fn test_never_returns_air_or_water() {
        let c = DefaultClassifier::default();
        for depth in [-3.0, 0.0, 0.5, 2.0, 10.0] {
            for height in [-2.0, 0.0, 9.0, 15.0, 30.0] {
                for slope in [0.0, 0.5, 3.0] {
                    assert!(!c.classify(sample(depth, height, slope)).is_fluid_or_air());
                }
            }
        }
    }
}
