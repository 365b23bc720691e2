//! # Boundary Consistency Integration Test
//!
//! Proves independently generated neighbors agree on their shared padding,
//! before and after edits, so the mesher never cracks the surface.

use strata_procedural::{
    ChunkCoord, DensityGenerator, GenerationConfig, Material, SphereEdit, VoxelGrid, WorldSeed, TOTAL_SIZE,
};

fn generator(seed: u64) -> DensityGenerator {
    DensityGenerator::new(GenerationConfig::with_seed(WorldSeed::new(seed)))
}

/// Asserts that `a`'s columns `xa` equal `b`'s columns `xb` along X.
fn assert_x_faces_match(a: &VoxelGrid, b: &VoxelGrid, pairs: &[(usize, usize)]) {
    for &(xa, xb) in pairs {
        for z in 0..TOTAL_SIZE {
            for y in 0..TOTAL_SIZE {
                let da = a.density_at(xa, y, z);
                let db = b.density_at(xb, y, z);
                assert!(
                    (da - db).abs() < 1e-3,
                    "density mismatch at a({xa},{y},{z})={da} b({xb},{y},{z})={db}"
                );
                assert_eq!(da.to_bits(), db.to_bits());
                assert_eq!(a.material_at(xa, y, z), b.material_at(xb, y, z));
            }
        }
    }
}

/// Test: Chunk (0,0) local x=34/35 equals chunk (1,0) local x=2/3.
#[test]
fn test_x_neighbors_share_padding() {
    let gen = generator(1337);
    let a = gen.generate(ChunkCoord::new(0, 0));
    let b = gen.generate(ChunkCoord::new(1, 0));

    assert_x_faces_match(&a, &b, &[(34, 2), (35, 3), (32, 0), (33, 1)]);
}

/// Test: Same guarantee along Z and at negative coordinates.
#[test]
fn test_z_neighbors_share_padding_at_negative_coords() {
    let gen = generator(42);
    let a = gen.generate(ChunkCoord::new(-7, -3));
    let b = gen.generate(ChunkCoord::new(-7, -2));

    for (za, zb) in [(34, 2), (35, 3)] {
        for x in 0..TOTAL_SIZE {
            for y in 0..TOTAL_SIZE {
                assert_eq!(a.density_at(x, y, za).to_bits(), b.density_at(x, y, zb).to_bits());
                assert_eq!(a.material_at(x, y, za), b.material_at(x, y, zb));
            }
        }
    }
}

/// Test: Generation order does not matter.
#[test]
fn test_generation_order_independent() {
    let coords = [ChunkCoord::new(3, 3), ChunkCoord::new(-1, 4), ChunkCoord::new(0, 0)];

    let forward: Vec<VoxelGrid> = {
        let gen = generator(9);
        coords.iter().map(|&c| gen.generate(c)).collect()
    };
    let backward: Vec<VoxelGrid> = {
        let gen = generator(9);
        let mut grids: Vec<VoxelGrid> = coords.iter().rev().map(|&c| gen.generate(c)).collect();
        grids.reverse();
        grids
    };

    assert_eq!(forward, backward);
}

/// Test: An edit applied to every touched chunk keeps padding consistent.
#[test]
fn test_edit_across_boundary_keeps_padding_consistent() {
    let gen = generator(1337);
    let a_coord = ChunkCoord::new(0, 0);
    let b_coord = ChunkCoord::new(1, 0);
    let mut a = gen.generate(a_coord);
    let mut b = gen.generate(b_coord);

    // Straddles world x = 32, the first column owned by chunk (1, 0)
    let height = gen.surface_height(32, 12);
    let edits = [
        SphereEdit::dig([32.4, height, 12.0], 3.0, 5.0),
        SphereEdit::build([31.2, height + 2.0, 14.5], 2.5, 4.0, Material::Sand),
    ];

    for edit in &edits {
        let touched = edit.chunks_touched();
        assert!(touched.contains(&a_coord));
        assert!(touched.contains(&b_coord));

        let changed_a = edit.apply(&mut a);
        let changed_b = edit.apply(&mut b);
        assert!(changed_a && changed_b, "edit should reach both grids");
    }

    assert_x_faces_match(&a, &b, &[(32, 0), (33, 1), (34, 2), (35, 3)]);
}

/// Test: The floor never opens, even far from the origin.
#[test]
fn test_floor_is_solid_everywhere() {
    let gen = generator(777);

    for coord in [
        ChunkCoord::new(0, 0),
        ChunkCoord::new(1_000, -1_000),
        ChunkCoord::new(-50_000, 20_000),
    ] {
        let grid = gen.generate(coord);
        for z in 0..TOTAL_SIZE {
            for x in 0..TOTAL_SIZE {
                assert!(grid.is_solid(x, 0, z), "VOID DETECTED in {coord:?} at ({x}, {z})");
            }
        }
    }
}
