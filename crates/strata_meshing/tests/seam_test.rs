//! # Seam Integration Test
//!
//! Two neighboring chunks meshed independently must meet without cracks:
//! every vertex both place in the same world cell is bit-identical.

use std::collections::HashMap;

use strata_meshing::mesh;
use strata_procedural::{ChunkCoord, DensityGenerator, GenerationConfig, SphereEdit, WorldSeed};

fn bits(p: [f32; 3]) -> [u32; 3] {
    p.map(f32::to_bits)
}

/// Vertices of `positions` inside world cell column `cell_x`, keyed by their
/// (y, z) cell.
fn cell_column(positions: &[[f32; 3]], cell_x: f32) -> HashMap<(i64, i64), [u32; 3]> {
    positions
        .iter()
        .filter(|p| p[0] > cell_x && p[0] < cell_x + 1.0)
        .map(|p| ((p[1].floor() as i64, p[2].floor() as i64), bits(*p)))
        .collect()
}

fn assert_seam_matches(seed: u64, a: ChunkCoord, b: ChunkCoord, edits: &[SphereEdit]) {
    let generator = DensityGenerator::new(GenerationConfig::with_seed(WorldSeed::new(seed)));
    let mut grid_a = generator.generate(a);
    let mut grid_b = generator.generate(b);
    for edit in edits {
        edit.apply(&mut grid_a);
        edit.apply(&mut grid_b);
    }

    let mesh_a = mesh(&grid_a);
    let mesh_b = mesh(&grid_b);

    // The last cell column of A is the first cell column of B
    let seam = (b.world_x() - 1) as f32;
    let from_a = cell_column(&mesh_a.terrain.positions, seam);
    let from_b = cell_column(&mesh_b.terrain.positions, seam);

    let mut matched = 0;
    for (key, vb) in &from_b {
        if let Some(va) = from_a.get(key) {
            assert_eq!(va, vb, "seam vertex mismatch in cell {key:?}");
            matched += 1;
        }
    }

    println!("Seam vertices matched: {matched} (A: {}, B: {})", from_a.len(), from_b.len());
    assert!(matched > 0, "no shared seam vertices found");
}

/// Test: Freshly generated neighbors meet exactly.
#[test]
fn test_generated_neighbors_share_seam_vertices() {
    assert_seam_matches(42, ChunkCoord::new(0, 0), ChunkCoord::new(1, 0), &[]);
}

/// Test: Far from the origin the seam still matches.
#[test]
fn test_far_neighbors_share_seam_vertices() {
    assert_seam_matches(1337, ChunkCoord::new(-201, 57), ChunkCoord::new(-200, 57), &[]);
}

/// Test: A dig straddling the seam keeps both meshes stitched.
#[test]
fn test_seam_survives_edit() {
    let generator = DensityGenerator::new(GenerationConfig::with_seed(WorldSeed::new(42)));
    let height = generator.surface_height(32, 16);
    let edits = [SphereEdit::dig([32.0, height, 16.0], 4.0, 8.0)];
    assert_seam_matches(42, ChunkCoord::new(0, 0), ChunkCoord::new(1, 0), &edits);
}
