//! Benchmark for chunk generation performance.
//!
//! TARGET: a padded 36³ grid in under 10 ms
//!
//! Run with: cargo bench --package strata_procedural --bench chunk_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use strata_procedural::{
    ChunkCoord, DensityGenerator, GenerationConfig, PlacementScatter, SphereEdit, WorldSeed, GRID_VOLUME,
};

fn generator() -> DensityGenerator {
    DensityGenerator::new(GenerationConfig::with_seed(WorldSeed::new(42)))
}

fn benchmark_single_chunk(c: &mut Criterion) {
    let gen = generator();

    let mut group = c.benchmark_group("single_chunk");
    group.throughput(Throughput::Elements(GRID_VOLUME as u64));
    group.bench_function("single_chunk_generation", |b| {
        let mut coord = 0i32;
        b.iter(|| {
            coord = coord.wrapping_add(1);
            black_box(gen.generate(ChunkCoord::new(coord, coord / 2)))
        });
    });
    group.finish();
}

fn benchmark_chunk_grid(c: &mut Criterion) {
    let gen = generator();

    let mut group = c.benchmark_group("chunk_grid");
    group.sample_size(10);

    // 8x8 chunks = 256x256 voxels
    group.throughput(Throughput::Elements(8 * 8));
    group.bench_function("8x8_chunks", |b| {
        b.iter(|| {
            for z in 0..8 {
                for x in 0..8 {
                    black_box(gen.generate(ChunkCoord::new(x, z)));
                }
            }
        });
    });

    group.finish();
}

fn benchmark_surface_height(c: &mut Criterion) {
    let gen = generator();

    c.bench_function("surface_height_per_column", |b| {
        let mut x = 0i64;
        b.iter(|| {
            x += 1;
            black_box(gen.surface_height(black_box(x), black_box(x / 3)))
        });
    });
}

fn benchmark_dig(c: &mut Criterion) {
    let gen = generator();
    let grid = gen.generate(ChunkCoord::new(0, 0));
    let edit = SphereEdit::dig([16.0, 10.0, 16.0], 4.0, 2.0);

    c.bench_function("dig_radius_4", |b| {
        b.iter(|| {
            let mut grid = grid.clone();
            black_box(edit.apply(&mut grid))
        });
    });
}

fn benchmark_scatter(c: &mut Criterion) {
    let gen = generator();
    let grid = gen.generate(ChunkCoord::new(0, 0));
    let scatter = PlacementScatter::new(WorldSeed::new(42));

    c.bench_function("placement_scatter", |b| {
        b.iter(|| black_box(scatter.scatter(black_box(&grid))));
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = benchmark_single_chunk,
              benchmark_chunk_grid,
              benchmark_surface_height,
              benchmark_dig,
              benchmark_scatter
}

criterion_main!(benches);
