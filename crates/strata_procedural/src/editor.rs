//! # Voxel Editor
//!
//! Sphere-shaped density edits: digging (negative delta) and building
//! (positive delta) with a smooth radial falloff.
//!
//! An edit only touches one grid. Near a chunk border the same world voxel
//! exists in several padded grids, so callers apply the edit to every grid in
//! `SphereEdit::chunks_touched`. Offsets are computed from integer world
//! coordinates, so every copy of a voxel receives a bit-identical change and
//! the padding stays consistent.

use crate::grid::{local_to_world_y, ChunkCoord, Material, VoxelGrid, CHUNK_SIZE, ISO_LEVEL, PAD, TOTAL_SIZE};

/// Density changes at or below this magnitude are ignored.
pub const EDIT_EPSILON: f32 = 1e-4;

/// A dig or build request in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphereEdit {
    /// World-space center.
    pub center: [f64; 3],
    /// Sphere radius in voxels.
    pub radius: f32,
    /// Density added at the center; negative digs.
    pub delta: f32,
    /// Material given to voxels that become solid.
    pub fill: Material,
}

impl SphereEdit {
    /// Creates a dig (material removal) edit.
    #[must_use]
    pub fn dig(center: [f64; 3], radius: f32, strength: f32) -> Self {
        Self {
            center,
            radius,
            delta: -strength.abs(),
            fill: Material::Air,
        }
    }

    /// Creates a build edit that fills with `fill`.
    #[must_use]
    pub fn build(center: [f64; 3], radius: f32, strength: f32, fill: Material) -> Self {
        Self {
            center,
            radius,
            delta: strength.abs(),
            fill,
        }
    }

    /// Applies the edit to one grid. See [`modify`].
    pub fn apply(&self, grid: &mut VoxelGrid) -> bool {
        modify(grid, self.center, self.radius, self.delta, self.fill)
    }

    /// Every chunk whose padded grid intersects the sphere.
    #[must_use]
    pub fn chunks_touched(&self) -> Vec<ChunkCoord> {
        let r = f64::from(self.radius);
        if r <= 0.0 || !r.is_finite() {
            return Vec::new();
        }
        let [cx, _, cz] = self.center;
        let chunk = CHUNK_SIZE as i64;
        let pad = PAD as i64;

        // Chunk k's grid spans world [k*CHUNK - PAD, k*CHUNK + CHUNK + PAD - 1]
        let span = |c: f64| {
            let lo = (c - r).ceil() as i64;
            let hi = (c + r).floor() as i64;
            let first = -(chunk + pad - 1 - lo).div_euclid(chunk);
            let last = (hi + pad).div_euclid(chunk);
            (first, last)
        };
        let (x0, x1) = span(cx);
        let (z0, z1) = span(cz);

        let mut touched = Vec::new();
        for kz in z0..=z1 {
            for kx in x0..=x1 {
                let coord = ChunkCoord::new(kx as i32, kz as i32);
                let min_x = (coord.world_x() - pad) as f64;
                let max_x = (coord.world_x() + chunk + pad - 1) as f64;
                let min_z = (coord.world_z() - pad) as f64;
                let max_z = (coord.world_z() + chunk + pad - 1) as f64;
                let dx = cx - cx.clamp(min_x, max_x);
                let dz = cz - cz.clamp(min_z, max_z);
                if dx * dx + dz * dz <= r * r {
                    touched.push(coord);
                }
            }
        }
        touched
    }
}

/// Adds `delta * smoothstep(1 - d / radius)` to every voxel within `radius`
/// of `center` (world space).
///
/// Voxels that cross from air to solid take `fill`; voxels that cross from
/// solid to air keep their material.
///
/// Returns `true` iff at least one voxel changed by more than
/// `EDIT_EPSILON`. A sphere that misses the grid (padding included) returns
/// `false` and leaves the grid untouched.
pub fn modify(grid: &mut VoxelGrid, center: [f64; 3], radius: f32, delta: f32, fill: Material) -> bool {
    let r = f64::from(radius);
    if r <= 0.0 || !r.is_finite() || delta == 0.0 || !delta.is_finite() {
        return false;
    }

    let coord = grid.coord;
    let origin = [
        coord.local_to_world_x(0),
        local_to_world_y(0),
        coord.local_to_world_z(0),
    ];

    // Local index range of the sphere's bounding box, clamped to the grid
    let mut lo = [0usize; 3];
    let mut hi = [0usize; 3];
    for axis in 0..3 {
        let min = (center[axis] - r).ceil() as i64 - origin[axis];
        let max = (center[axis] + r).floor() as i64 - origin[axis];
        if max < 0 || min > TOTAL_SIZE as i64 - 1 || min > max {
            return false;
        }
        lo[axis] = min.max(0) as usize;
        hi[axis] = max.min(TOTAL_SIZE as i64 - 1) as usize;
    }

    let (density, material) = grid.buffers_mut();
    let mut changed = false;

    for z in lo[2]..=hi[2] {
        let dz = (origin[2] + z as i64) as f64 - center[2];
        for y in lo[1]..=hi[1] {
            let dy = (origin[1] + y as i64) as f64 - center[1];
            for x in lo[0]..=hi[0] {
                let dx = (origin[0] + x as i64) as f64 - center[0];
                let distance = (dx * dx + dy * dy + dz * dz).sqrt();
                if distance > r {
                    continue;
                }

                let change = delta * falloff(distance / r);
                if change.abs() <= EDIT_EPSILON {
                    continue;
                }

                let i = VoxelGrid::index(x, y, z);
                let before = density[i];
                let after = before + change;
                density[i] = after;
                if before <= ISO_LEVEL && after > ISO_LEVEL {
                    material[i] = fill.id();
                }
                changed = true;
            }
        }
    }

    changed
}

/// Smoothstep of `1 - t`: 1 at the center, 0 at the boundary.
#[inline]
fn falloff(t: f64) -> f32 {
    let s = (1.0 - t).clamp(0.0, 1.0);
    (s * s * (3.0 - 2.0 * s)) as f32
}
