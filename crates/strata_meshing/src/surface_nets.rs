//! # Surface Nets Extraction
//!
//! Naive Surface Nets over a padded scalar field: one vertex per mixed cell
//! at the centroid of its edge crossings, one quad per sign-changing edge.
//!
//! ## Ownership
//!
//! A chunk emits quads only for edges whose base voxel lies in its interior
//! `[PAD, PAD + CHUNK_SIZE)` along X and Z. The cells those quads reference
//! span local `1..=PAD + CHUNK_SIZE - 1`, which is inside the padded grid, and
//! the neighbor computing the same world cell sees the same densities. So
//! shared vertices land on bit-identical positions and no quad is emitted
//! twice.
//!
//! Vertices are created lazily, the first time a quad references their cell.

use ndshape::{ConstShape, ConstShape3u32};
use strata_procedural::{local_to_world_y, ChunkCoord, CHUNK_SIZE, ISO_LEVEL, PAD, TOTAL_SIZE};

use crate::tables::{CORNER_OFFSETS, EDGE_CORNERS, EDGE_TABLE};

/// Cells per axis of a padded grid.
pub const CELLS_PER_AXIS: usize = TOTAL_SIZE - 1;

/// Number of cells in a padded grid.
pub const CELL_VOLUME: usize = CELLS_PER_AXIS * CELLS_PER_AXIS * CELLS_PER_AXIS;

const GRID_SIDE: u32 = TOTAL_SIZE as u32;
const CELL_SIDE: u32 = CELLS_PER_AXIS as u32;

/// Shape of the padded voxel grid (same layout as `VoxelGrid::index`).
pub type GridShape = ConstShape3u32<GRID_SIDE, GRID_SIDE, GRID_SIDE>;

/// Shape of the cell lattice between voxels.
pub type CellShape = ConstShape3u32<CELL_SIDE, CELL_SIDE, CELL_SIDE>;

const NO_VERTEX: u32 = u32::MAX;

/// Flat index of a voxel.
#[inline]
pub fn grid_index(p: [usize; 3]) -> usize {
    GridShape::linearize([p[0] as u32, p[1] as u32, p[2] as u32]) as usize
}

#[inline]
fn cell_index(c: [usize; 3]) -> usize {
    CellShape::linearize([c[0] as u32, c[1] as u32, c[2] as u32]) as usize
}

/// Geometry produced by one extraction pass.
#[derive(Debug, Default)]
pub struct Surface {
    /// World-space vertex positions.
    pub positions: Vec<[f32; 3]>,
    /// Unit normals pointing out of the inside region.
    pub normals: Vec<[f32; 3]>,
    /// Local cell (min corner) each vertex was placed in.
    pub cells: Vec<[usize; 3]>,
    /// Triangle list, counter-clockwise seen from outside.
    pub indices: Vec<u32>,
}

/// Extracts the iso-surface of `values` (inside where `> ISO_LEVEL`).
///
/// `emit(a, b)` is asked once per sign-changing owned edge with the flat
/// indices of its two voxels; returning `false` skips that quad.
pub fn extract(coord: ChunkCoord, values: &[f32], mut emit: impl FnMut(usize, usize) -> bool) -> Surface {
    debug_assert_eq!(values.len(), TOTAL_SIZE * TOTAL_SIZE * TOTAL_SIZE);

    let mut surface = Surface::default();
    let mut cell_vertex = vec![NO_VERTEX; CELL_VOLUME];

    for z in PAD..PAD + CHUNK_SIZE {
        for y in 0..CELLS_PER_AXIS {
            for x in PAD..PAD + CHUNK_SIZE {
                let p = [x, y, z];
                let i0 = grid_index(p);
                let inside0 = values[i0] > ISO_LEVEL;

                for axis in 0..3 {
                    // X and Z edges need the cell layer below
                    if axis != 1 && y == 0 {
                        continue;
                    }
                    let mut q = p;
                    q[axis] += 1;
                    let i1 = grid_index(q);
                    let inside1 = values[i1] > ISO_LEVEL;
                    if inside0 == inside1 || !emit(i0, i1) {
                        continue;
                    }

                    // (u, v, axis) is a right-handed frame
                    let u = (axis + 1) % 3;
                    let v = (axis + 2) % 3;
                    let cell = |du: usize, dv: usize| {
                        let mut c = p;
                        c[u] -= 1 - du;
                        c[v] -= 1 - dv;
                        c
                    };

                    let mut quad = [0u32; 4];
                    for (slot, (du, dv)) in [(0, 0), (1, 0), (1, 1), (0, 1)].into_iter().enumerate() {
                        quad[slot] = vertex_for(cell(du, dv), coord, values, &mut cell_vertex, &mut surface);
                    }

                    let [a, b, c, d] = quad;
                    if inside0 {
                        surface.indices.extend_from_slice(&[a, b, c, a, c, d]);
                    } else {
                        surface.indices.extend_from_slice(&[a, c, b, a, d, c]);
                    }
                }
            }
        }
    }

    surface
}

/// Returns the vertex of `cell`, creating it on first use.
fn vertex_for(
    cell: [usize; 3],
    coord: ChunkCoord,
    values: &[f32],
    cell_vertex: &mut [u32],
    surface: &mut Surface,
) -> u32 {
    let slot = cell_index(cell);
    if cell_vertex[slot] != NO_VERTEX {
        return cell_vertex[slot];
    }

    let mut corner = [0.0f32; 8];
    let mut mask = 0usize;
    for (i, offset) in CORNER_OFFSETS.iter().enumerate() {
        let value = values[grid_index([cell[0] + offset[0], cell[1] + offset[1], cell[2] + offset[2]])];
        corner[i] = value;
        if value > ISO_LEVEL {
            mask |= 1 << i;
        }
    }

    let edges = EDGE_TABLE[mask];
    if edges == 0 {
        tracing::error!(?cell, mask, "MeshingDegenerate: mixed cell without crossed edges");
    }
    debug_assert_ne!(edges, 0, "MeshingDegenerate at cell {cell:?} mask {mask:#010b}");

    let mut sum = [0.0f32; 3];
    let mut count = 0u32;
    for (edge, [a, b]) in EDGE_CORNERS.iter().enumerate() {
        if edges & (1 << edge) == 0 {
            continue;
        }
        let t = (ISO_LEVEL - corner[*a]) / (corner[*b] - corner[*a]);
        let pa = CORNER_OFFSETS[*a];
        let pb = CORNER_OFFSETS[*b];
        for k in 0..3 {
            sum[k] += pa[k] as f32 + t * (pb[k] as f32 - pa[k] as f32);
        }
        count += 1;
    }
    let frac = if count == 0 {
        [0.5; 3]
    } else {
        let n = count as f32;
        [sum[0] / n, sum[1] / n, sum[2] / n]
    };

    let position = [
        coord.local_to_world_x(cell[0]) as f32 + frac[0],
        local_to_world_y(cell[1]) as f32 + frac[1],
        coord.local_to_world_z(cell[2]) as f32 + frac[2],
    ];

    let index = surface.positions.len() as u32;
    surface.positions.push(position);
    surface.normals.push(normal_at(cell, frac, values));
    surface.cells.push(cell);
    cell_vertex[slot] = index;
    index
}

/// Negated, normalized density gradient, trilinearly interpolated from the
/// cell corners to `frac`.
fn normal_at(cell: [usize; 3], frac: [f32; 3], values: &[f32]) -> [f32; 3] {
    let mut gradient = [0.0f32; 3];
    for offset in &CORNER_OFFSETS {
        let p = [cell[0] + offset[0], cell[1] + offset[1], cell[2] + offset[2]];
        let mut weight = 1.0;
        for k in 0..3 {
            weight *= if offset[k] == 1 { frac[k] } else { 1.0 - frac[k] };
        }
        let g = corner_gradient(p, values);
        for k in 0..3 {
            gradient[k] += weight * g[k];
        }
    }

    let length = (gradient[0] * gradient[0] + gradient[1] * gradient[1] + gradient[2] * gradient[2]).sqrt();
    if length <= f32::EPSILON || !length.is_finite() {
        return [0.0, 1.0, 0.0];
    }
    [-gradient[0] / length, -gradient[1] / length, -gradient[2] / length]
}

/// Central differences, one-sided at the grid faces.
fn corner_gradient(p: [usize; 3], values: &[f32]) -> [f32; 3] {
    let mut g = [0.0f32; 3];
    for k in 0..3 {
        let lo = p[k].saturating_sub(1);
        let hi = (p[k] + 1).min(TOTAL_SIZE - 1);
        let mut a = p;
        let mut b = p;
        a[k] = lo;
        b[k] = hi;
        g[k] = (values[grid_index(b)] - values[grid_index(a)]) / (hi - lo) as f32;
    }
    g
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_procedural::GRID_VOLUME;

    /// Solid below world height `level`.
    fn plane(level: f32) -> Vec<f32> {
        let mut values = vec![0.0; GRID_VOLUME];
        for z in 0..TOTAL_SIZE {
            for y in 0..TOTAL_SIZE {
                for x in 0..TOTAL_SIZE {
                    values[grid_index([x, y, z])] = level - local_to_world_y(y) as f32;
                }
            }
        }
        values
    }

    #[test]
    fn test_grid_shape_matches_voxel_grid_layout() {
        assert_eq!(grid_index([1, 0, 0]), 1);
        assert_eq!(grid_index([0, 1, 0]), TOTAL_SIZE);
        assert_eq!(grid_index([0, 0, 1]), TOTAL_SIZE * TOTAL_SIZE);
        assert_eq!(
            grid_index([3, 5, 7]),
            strata_procedural::VoxelGrid::index(3, 5, 7)
        );
    }

    #[test]
    fn test_flat_plane_is_one_sheet() {
        let surface = extract(ChunkCoord::new(0, 0), &plane(10.3), |_, _| true);

        // One vertical crossing per interior column
        assert_eq!(surface.indices.len() / 6, CHUNK_SIZE * CHUNK_SIZE);
        for (position, normal) in surface.positions.iter().zip(&surface.normals) {
            assert!((position[1] - 10.3).abs() < 1e-4, "y = {}", position[1]);
            assert!(normal[1] > 0.99, "normal {normal:?}");
        }
    }

    #[test]
    fn test_winding_faces_out_of_the_solid() {
        let surface = extract(ChunkCoord::new(0, 0), &plane(10.3), |_, _| true);
        for tri in surface.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|i| surface.positions[tri[i] as usize]);
            let ab = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
            let ac = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
            let ny = ab[2] * ac[0] - ab[0] * ac[2];
            assert!(ny > 0.0, "triangle faces down");
        }
    }

    #[test]
    fn test_empty_field_has_no_geometry() {
        let surface = extract(ChunkCoord::new(4, -4), &vec![-1.0; GRID_VOLUME], |_, _| true);
        assert!(surface.positions.is_empty());
        assert!(surface.indices.is_empty());
    }

    #[test]
    fn test_emit_filter_skips_quads() {
        let surface = extract(ChunkCoord::new(0, 0), &plane(10.3), |_, _| false);
        assert!(surface.indices.is_empty());
        assert!(surface.positions.is_empty());
    }

    #[test]
    fn test_positions_are_world_space() {
        let coord = ChunkCoord::new(-3, 5);
        let surface = extract(coord, &plane(10.3), |_, _| true);
        let min_x = coord.world_x() as f32 - 1.0;
        let max_x = (coord.world_x() + CHUNK_SIZE as i64) as f32;
        for position in &surface.positions {
            assert!(position[0] >= min_x && position[0] <= max_x);
        }
    }
}
