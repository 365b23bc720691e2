//! # Vertex Shading Heuristics
//!
//! Per-vertex channels derived from the grid around a vertex's cell. Every
//! lookup stays within the cell's corners +-1 voxel, which is inside the
//! padded grid for all cells a chunk meshes, so neighbors shade shared
//! vertices identically. Y is clamped at the top and bottom of the grid.

use strata_procedural::{Material, VoxelGrid, TOTAL_SIZE};

use crate::tables::CORNER_OFFSETS;

/// Height band above the water level over which wetness fades to zero.
pub const WET_BAND: f32 = 2.0;

/// How dark a fully covered vertex gets.
pub const AO_STRENGTH: f32 = 0.75;

/// Top four materials over the solid corners of `cell`, strongest first,
/// with weights normalized to sum to 1. Unused slots are `(Air, 0.0)`.
#[must_use]
pub fn material_blend(grid: &VoxelGrid, cell: [usize; 3]) -> ([u8; 4], [f32; 4]) {
    let mut counts = [0u32; Material::COUNT];
    for offset in &CORNER_OFFSETS {
        let (x, y, z) = (cell[0] + offset[0], cell[1] + offset[1], cell[2] + offset[2]);
        if grid.is_solid(x, y, z) {
            counts[grid.material_at(x, y, z).id() as usize] += 1;
        }
    }

    // Highest count first, lower id breaks ties
    let mut ranked: Vec<(u8, u32)> = counts
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count > 0)
        .map(|(id, &count)| (id as u8, count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(4);

    let total: u32 = ranked.iter().map(|&(_, count)| count).sum();
    let mut ids = [Material::Air.id(); 4];
    let mut weights = [0.0f32; 4];
    if total == 0 {
        return (ids, weights);
    }
    for (slot, &(id, count)) in ranked.iter().enumerate() {
        ids[slot] = id;
        weights[slot] = count as f32 / total as f32;
    }
    (ids, weights)
}

/// 1 at or below `water_level`, 0 from `WET_BAND` above it.
#[inline]
#[must_use]
pub fn wetness(height: f32, water_level: f32) -> f32 {
    ((water_level + WET_BAND - height) / WET_BAND).clamp(0.0, 1.0)
}

/// Moss grows on upward faces that are damp or sheltered.
#[inline]
#[must_use]
pub fn mossiness(normal: [f32; 3], wetness: f32, cavity: f32) -> f32 {
    let up = normal[1].max(0.0);
    (up * (0.6 * wetness + 0.4 * cavity)).clamp(0.0, 1.0)
}

/// Solid fraction of the 4x4x4 block around the cell remapped so a flat
/// surface (half solid) scores 0 and a fully enclosed pocket scores 1.
#[must_use]
pub fn cavity(grid: &VoxelGrid, cell: [usize; 3]) -> f32 {
    let fraction = solid_fraction(grid, cell, 0..4);
    ((fraction - 0.5) * 2.0).clamp(0.0, 1.0)
}

/// Occlusion from solid voxels in the upper half of the 4x4x4 block.
#[must_use]
pub fn occlusion(grid: &VoxelGrid, cell: [usize; 3]) -> f32 {
    1.0 - AO_STRENGTH * solid_fraction(grid, cell, 2..4)
}

/// Solid fraction over `cell - 1 ..= cell + 2` on X/Z and the given
/// sub-range of those four layers on Y.
fn solid_fraction(grid: &VoxelGrid, cell: [usize; 3], layers: std::ops::Range<usize>) -> f32 {
    let last = TOTAL_SIZE - 1;
    let span = |c: usize, i: usize| (c + i).saturating_sub(1).min(last);

    let mut solid = 0u32;
    let mut total = 0u32;
    for dz in 0..4 {
        let z = span(cell[2], dz);
        for dy in layers.clone() {
            let y = span(cell[1], dy);
            for dx in 0..4 {
                let x = span(cell[0], dx);
                total += 1;
                if grid.is_solid(x, y, z) {
                    solid += 1;
                }
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        solid as f32 / total as f32
    }
}

/// 1.0 if solid ground lies within one voxel of the cell.
#[must_use]
pub fn shore(grid: &VoxelGrid, cell: [usize; 3]) -> f32 {
    if solid_fraction(grid, cell, 0..4) > 0.0 {
        1.0
    } else {
        0.0
    }
}
