//! # Perlin Noise Implementation
//!
//! Deterministic, seedable 3D gradient noise. This is the only source of
//! randomness in terrain generation.
//!
//! ## Determinism Guarantee
//!
//! Given the same `WorldSeed`, this implementation produces **exactly** the
//! same values on any platform, any time. There is no hidden RNG state: the
//! permutation table is derived from the seed and never mutated afterwards,
//! so a `PerlinNoise` can be shared across generation threads freely.
//!
//! ## Period
//!
//! Lattice coordinates are masked to 8 bits, so the field repeats every 256
//! units along each axis.

/// World seed for deterministic generation.
///
/// All procedural generation derives from this seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Seed used when nothing else is configured.
    pub const DEFAULT: Self = Self(1337);

    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives a sub-seed for a specific purpose (e.g., cave noise).
    ///
    /// Uses a hash function to create independent streams from one seed.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        let mut hash = self.0;
        hash ^= purpose;
        hash = hash.wrapping_mul(0x517c_c1b7_2722_0a95);
        hash ^= hash >> 32;
        Self(hash)
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Gradient directions: the 12 cube edge midpoints, padded to 16 so a hash
/// can be masked instead of reduced modulo 12.
const GRADIENTS: [[i8; 3]; 16] = [
    [1, 1, 0], [-1, 1, 0], [1, -1, 0], [-1, -1, 0],
    [1, 0, 1], [-1, 0, 1], [1, 0, -1], [-1, 0, -1],
    [0, 1, 1], [0, -1, 1], [0, 1, -1], [0, -1, -1],
    [1, 1, 0], [0, -1, 1], [-1, 1, 0], [0, -1, -1],
];

/// Pre-computed permutation table for noise.
///
/// This is computed once from the seed and reused.
#[derive(Clone)]
struct PermutationTable {
    /// 512-entry permutation table (256 entries, doubled for overflow handling).
    perm: [u8; 512],
}

impl PermutationTable {
    /// LCG multiplier (Knuth MMIX).
    const LCG_MUL: u64 = 6_364_136_223_846_793_005;
    /// LCG increment (Knuth MMIX).
    const LCG_INC: u64 = 1_442_695_040_888_963_407;

    /// Creates a new permutation table from a seed.
    fn new(seed: WorldSeed) -> Self {
        let mut table = [0u8; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = i as u8;
        }

        // Fisher-Yates driven by a linear congruential scrambler
        let mut state = seed.value();
        for i in (1..256usize).rev() {
            state = state.wrapping_mul(Self::LCG_MUL).wrapping_add(Self::LCG_INC);
            let j = ((state >> 33) % (i as u64 + 1)) as usize;
            table.swap(i, j);
        }

        // Double the table to avoid index wrapping
        let mut perm = [0u8; 512];
        perm[..256].copy_from_slice(&table);
        perm[256..].copy_from_slice(&table);

        Self { perm }
    }

    /// Gets a permutation value.
    #[inline]
    fn get(&self, index: usize) -> usize {
        usize::from(self.perm[index & 511])
    }
}

/// 3D Perlin noise generator.
///
/// Produces smooth, continuous values in roughly [-1, 1].
///
/// # Example
///
/// ```rust
/// use strata_procedural::noise::{PerlinNoise, WorldSeed};
///
/// let noise = PerlinNoise::new(WorldSeed::new(42));
/// let value = noise.sample(10.5, 3.25, -7.75);
/// assert!(value.abs() <= 1.1);
/// ```
#[derive(Clone)]
pub struct PerlinNoise {
    /// The permutation table.
    perm_table: PermutationTable,
}

impl PerlinNoise {
    /// Creates a new noise generator from a seed.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            perm_table: PermutationTable::new(seed),
        }
    }

    /// Rebuilds the permutation table for a new seed.
    pub fn reseed(&mut self, seed: WorldSeed) {
        self.perm_table = PermutationTable::new(seed);
    }

    /// Samples 3D noise at the given coordinates.
    #[must_use]
    pub fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        let (xi, xf) = split_lattice(x);
        let (yi, yf) = split_lattice(y);
        let (zi, zf) = split_lattice(z);

        let u = fade(xf);
        let v = fade(yf);
        let w = fade(zf);

        let p = &self.perm_table;
        let a = p.get(xi) + yi;
        let aa = p.get(a) + zi;
        let ab = p.get(a + 1) + zi;
        let b = p.get(xi + 1) + yi;
        let ba = p.get(b) + zi;
        let bb = p.get(b + 1) + zi;

        let x1 = lerp(
            u,
            gradient(p.get(aa), xf, yf, zf),
            gradient(p.get(ba), xf - 1.0, yf, zf),
        );
        let x2 = lerp(
            u,
            gradient(p.get(ab), xf, yf - 1.0, zf),
            gradient(p.get(bb), xf - 1.0, yf - 1.0, zf),
        );
        let y1 = lerp(v, x1, x2);

        let x3 = lerp(
            u,
            gradient(p.get(aa + 1), xf, yf, zf - 1.0),
            gradient(p.get(ba + 1), xf - 1.0, yf, zf - 1.0),
        );
        let x4 = lerp(
            u,
            gradient(p.get(ab + 1), xf, yf - 1.0, zf - 1.0),
            gradient(p.get(bb + 1), xf - 1.0, yf - 1.0, zf - 1.0),
        );
        let y2 = lerp(v, x3, x4);

        lerp(w, y1, y2)
    }

    /// Samples a horizontal slice of the field.
    ///
    /// `layer` selects an independent slice so several 2D layers can share
    /// one permutation table without lining up.
    #[inline]
    #[must_use]
    pub fn sample_2d(&self, x: f64, z: f64, layer: f64) -> f64 {
        self.sample(x, layer, z)
    }

    /// Generates fractal (fBm) noise.
    ///
    /// # Arguments
    ///
    /// * `octaves` - Number of noise layers (typically 3-6)
    /// * `persistence` - Amplitude decay per octave (typically 0.5)
    /// * `lacunarity` - Frequency increase per octave (typically 2.0)
    ///
    /// # Returns
    ///
    /// A value roughly in the range [-1, 1].
    #[must_use]
    pub fn fbm(
        &self,
        x: f64,
        y: f64,
        z: f64,
        octaves: u32,
        persistence: f64,
        lacunarity: f64,
    ) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut max_amplitude = 0.0;

        for _ in 0..octaves {
            total += self.sample(x * frequency, y * frequency, z * frequency) * amplitude;
            max_amplitude += amplitude;
            amplitude *= persistence;
            frequency *= lacunarity;
        }

        if max_amplitude == 0.0 {
            0.0
        } else {
            total / max_amplitude
        }
    }
}

/// Splits a coordinate into its masked lattice cell and fractional offset.
#[inline]
fn split_lattice(x: f64) -> (usize, f64) {
    let floor = fast_floor(x);
    ((floor & 255) as usize, x - floor as f64)
}

/// Quintic fade curve `6t^5 - 15t^4 + 10t^3`.
#[inline]
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + t * (b - a)
}

/// Dot product of the hashed gradient with the offset vector.
#[inline]
fn gradient(hash: usize, x: f64, y: f64, z: f64) -> f64 {
    let g = GRADIENTS[hash & 15];
    f64::from(g[0]) * x + f64::from(g[1]) * y + f64::from(g[2]) * z
}

/// Floor to `i64`.
///
/// Works for any finite input, including coordinates far beyond `i32`.
#[inline]
fn fast_floor(x: f64) -> i64 {
    let xi = x as i64;
    if x < xi as f64 { xi - 1 } else { xi }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let seed = WorldSeed::new(12345);
        let noise1 = PerlinNoise::new(seed);
        let noise2 = PerlinNoise::new(seed);

        for i in 0..100 {
            let x = f64::from(i) * 0.1;
            let y = f64::from(i) * 0.17;
            let z = f64::from(i) * -0.23;
            assert_eq!(
                noise1.sample(x, y, z).to_bits(),
                noise2.sample(x, y, z).to_bits(),
                "Noise should be deterministic"
            );
        }
    }

    #[test]
    fn test_different_seeds_different_results() {
        let noise1 = PerlinNoise::new(WorldSeed::new(1));
        let noise2 = PerlinNoise::new(WorldSeed::new(2));

        let differing = (0..64)
            .filter(|&i| {
                let x = f64::from(i) * 0.37 + 0.5;
                noise1.sample(x, 0.3, x * 0.5) != noise2.sample(x, 0.3, x * 0.5)
            })
            .count();

        assert!(differing > 32, "Different seeds should produce different fields");
    }

    #[test]
    fn test_range() {
        let noise = PerlinNoise::new(WorldSeed::new(42));

        for i in 0..10_000 {
            let x = (f64::from(i) * 0.1) - 500.0;
            let y = (f64::from(i) * 0.07) - 350.0;
            let z = (f64::from(i) * 0.13) - 650.0;
            let value = noise.sample(x, y, z);

            assert!(
                (-1.1..=1.1).contains(&value),
                "Value {value} out of range at ({x}, {y}, {z})"
            );
        }
    }

    #[test]
    fn test_zero_at_lattice_points() {
        let noise = PerlinNoise::new(WorldSeed::new(7));
        for i in -5..5 {
            let v = f64::from(i);
            assert_eq!(noise.sample(v, v * 2.0, v * 3.0), 0.0);
        }
    }

    #[test]
    fn test_period_256() {
        let noise = PerlinNoise::new(WorldSeed::new(99));

        for i in 0..50 {
            let x = f64::from(i) * 0.25 + 0.125;
            let y = f64::from(i) * 0.5 + 0.375;
            let z = f64::from(i) * 0.75 + 0.0625;
            assert_eq!(noise.sample(x, y, z), noise.sample(x + 256.0, y, z));
            assert_eq!(noise.sample(x, y, z), noise.sample(x, y - 256.0, z));
            assert_eq!(noise.sample(x, y, z), noise.sample(x, y, z + 512.0));
        }
    }

    #[test]
    fn test_continuity() {
        let noise = PerlinNoise::new(WorldSeed::new(42));

        let (x, y, z) = (100.3, 12.7, -44.1);
        let delta = 0.001;

        let v = noise.sample(x, y, z);
        for (dx, dy, dz) in [(delta, 0.0, 0.0), (0.0, delta, 0.0), (0.0, 0.0, delta)] {
            let diff = (v - noise.sample(x + dx, y + dy, z + dz)).abs();
            assert!(diff < 0.01, "Noise should be continuous: diff = {diff}");
        }
    }

    #[test]
    fn test_reseed_matches_fresh_generator() {
        let mut noise = PerlinNoise::new(WorldSeed::new(1));
        noise.reseed(WorldSeed::new(2));
        let fresh = PerlinNoise::new(WorldSeed::new(2));

        assert_eq!(noise.sample(3.3, 4.4, 5.5), fresh.sample(3.3, 4.4, 5.5));
    }

    #[test]
    fn test_fbm_noise() {
        let noise = PerlinNoise::new(WorldSeed::new(42));

        let value = noise.fbm(100.5, 0.5, 100.5, 5, 0.5, 2.0);
        assert!(
            (-1.1..=1.1).contains(&value),
            "fBm value {value} out of expected range"
        );
        assert_eq!(noise.fbm(1.5, 2.5, 3.5, 0, 0.5, 2.0), 0.0);
    }

    #[test]
    fn test_seed_derivation() {
        let base = WorldSeed::new(42);
        let derived1 = base.derive(1);
        let derived2 = base.derive(2);
        let derived1_again = base.derive(1);

        assert_ne!(derived1, derived2, "Different purposes should give different seeds");
        assert_eq!(derived1, derived1_again, "Same purpose should give same seed");
        assert_ne!(derived1, base, "Derived seed should differ from base");
    }

    #[test]
    fn test_huge_coordinates_do_not_panic() {
        let noise = PerlinNoise::new(WorldSeed::new(5));
        let v = noise.sample(3.0e12 + 0.5, -1.0e11 + 0.25, 7.0e13 + 0.75);
        assert!(v.is_finite());
    }
}
