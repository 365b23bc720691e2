//! # STRATA Bake
//!
//! Pre-generates a square of chunks into the file cache so later sessions
//! start from cache hits.
//!
//! ```bash
//! # Defaults: seed 1337, 5x5 chunks around the origin, no cache
//! strata_bake
//!
//! # Settings from a TOML file
//! strata_bake bake.toml
//!
//! # Seed from a query string, other settings default
//! strata_bake "?seed=42"
//!
//! # More logging
//! RUST_LOG=strata=debug strata_bake bake.toml
//! ```

use std::process::ExitCode;
use std::time::Instant;

use strata::{BakeConfig, PipelineResult, TerrainPipeline};
use strata_cache::ChunkCache;
use strata_procedural::GenerationConfig;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(std::env::args().nth(1).as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "bake failed");
            ExitCode::FAILURE
        }
    }
}

/// Reads settings from a file path or a `seed=` query string.
fn load_config(arg: Option<&str>) -> PipelineResult<BakeConfig> {
    match arg {
        None => Ok(BakeConfig::default()),
        Some(query) if query.starts_with('?') || query.contains("seed=") => {
            let generation = GenerationConfig::from_query(query)?;
            Ok(BakeConfig {
                seed: generation.seed.value(),
                ..BakeConfig::default()
            })
        }
        Some(path) => BakeConfig::from_file(path),
    }
}

fn run(arg: Option<&str>) -> PipelineResult<()> {
    let config = load_config(arg)?;
    let mut pipeline = TerrainPipeline::new(config.pipeline_config()?)?;

    if let Some(dir) = &config.cache_dir {
        let cache = ChunkCache::open(dir, config.version, config.cache_quota)?;
        let stale = cache.prune_stale_versions();
        let expired = cache.prune(config.prune_age());
        tracing::info!(dir = %dir.display(), stale, expired, "opened chunk cache");
        pipeline = pipeline.with_cache(cache);
    } else {
        tracing::warn!("no cache_dir configured, baked chunks will not be persisted");
    }

    let coords = config.coords();
    tracing::info!(
        seed = config.seed,
        world_type = %config.world_type,
        version = config.version,
        chunks = coords.len(),
        "baking"
    );

    let started = Instant::now();
    let mut triangles = 0usize;
    let mut placements = 0usize;
    let mut failed = 0usize;
    for (coord, result) in pipeline.load_many(&coords) {
        match result {
            Ok(view) => {
                let chunk = view.lock();
                triangles += chunk.mesh.triangle_count();
                placements += chunk.placements.len();
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(?coord, error = %e, "chunk failed");
            }
        }
    }

    let stats = pipeline.stats();
    tracing::info!(
        generated = stats.generated,
        cache_hits = stats.cache_hits,
        failed,
        triangles,
        placements,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "bake complete"
    );
    Ok(())
}
