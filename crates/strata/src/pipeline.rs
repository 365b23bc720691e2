//! # Terrain Pipeline
//!
//! Loads chunks (cache first, then generate + mesh + scatter), applies
//! edits across chunk borders and reacts to seed changes.
//!
//! ## Seed epochs
//!
//! Every resident chunk remembers the seed epoch it was produced in. A load
//! that finishes after the epoch moved on is discarded with `SeedChanged`;
//! resident chunks of older epochs are invisible and dropped by `set_seed`.
//!
//! ## Locking
//!
//! The chunk map lock is never held while generating or meshing. Each
//! chunk has its own mutex; an edit, the remesh it causes and the cache
//! write-back happen under that one lock, so a reader sees either the old
//! grid and mesh or the new pair and the cache ends with the newest grid.
//! The map lock is always taken before a chunk lock, never after.
//!
//! ## Edits across borders
//!
//! Neighboring grids hold copies of each other's border voxels in their
//! padding. An edit loads every chunk whose padded grid it reaches before
//! applying itself, so no copy is left unedited.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock};
use rayon::prelude::*;
use strata_cache::{CachedChunkRecord, ChunkCache, ChunkKey};
use strata_meshing::{MeshBuffers, SurfaceNetsMesher};
use strata_procedural::{
    ChunkCoord, DensityGenerator, GenerationConfig, ListenerId, Material, MaterialClassifier, PlacementBuffers,
    PlacementScatter, ProceduralError, SeedAuthority, SeedListener, SeedState, SphereEdit, TerrainConfig, VoxelGrid,
    WorldSeed,
};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};

/// A dig or build request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EditRequest {
    /// World-space center.
    pub point: [f64; 3],
    /// Sphere radius in voxels.
    pub radius: f32,
    /// Signed density change at the center; negative digs.
    pub delta: f32,
    /// Material for voxels that become solid.
    pub material: Material,
}

impl EditRequest {
    /// Removes material around `point`.
    #[must_use]
    pub fn dig(point: [f64; 3], radius: f32, strength: f32) -> Self {
        Self::from(SphereEdit::dig(point, radius, strength))
    }

    /// Adds `material` around `point`.
    #[must_use]
    pub fn build(point: [f64; 3], radius: f32, strength: f32, material: Material) -> Self {
        Self::from(SphereEdit::build(point, radius, strength, material))
    }

    fn sphere(&self) -> SphereEdit {
        SphereEdit {
            center: self.point,
            radius: self.radius,
            delta: self.delta,
            fill: self.material,
        }
    }
}

impl From<SphereEdit> for EditRequest {
    fn from(edit: SphereEdit) -> Self {
        Self {
            point: edit.center,
            radius: edit.radius,
            delta: edit.delta,
            material: edit.fill,
        }
    }
}

/// A resident chunk.
#[derive(Clone, Debug)]
pub struct LoadedChunk {
    /// Current (possibly edited) voxels.
    pub grid: VoxelGrid,
    /// Meshes of `grid`.
    pub mesh: MeshBuffers,
    /// Decoration points of `grid`.
    pub placements: PlacementBuffers,
    /// Bumped on every edit that changed the grid.
    pub revision: u64,
}

/// Where a loaded chunk came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkSource {
    /// Already resident.
    Resident,
    /// Read back from the cache.
    Cache,
    /// Generated and meshed.
    Generated,
}

/// Handle to a resident chunk.
#[derive(Clone, Debug)]
pub struct ChunkView {
    /// Chunk position.
    pub coord: ChunkCoord,
    /// How this load was served.
    pub source: ChunkSource,
    chunk: Arc<Mutex<LoadedChunk>>,
}

impl ChunkView {
    /// Locks the chunk. Edits to it wait until the guard is dropped.
    pub fn lock(&self) -> MutexGuard<'_, LoadedChunk> {
        self.chunk.lock()
    }

    /// Copy of the current meshes.
    #[must_use]
    pub fn mesh(&self) -> MeshBuffers {
        self.chunk.lock().mesh.clone()
    }

    /// Current revision.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.chunk.lock().revision
    }
}

/// Load counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Chunks generated from scratch.
    pub generated: u64,
    /// Chunks served from the cache.
    pub cache_hits: u64,
    /// Loads discarded because the seed changed.
    pub discarded: u64,
}

/// Everything derived from one seed.
struct Generation {
    epoch: u64,
    generator: DensityGenerator,
    scatter: PlacementScatter,
}

impl Generation {
    fn new(terrain: &TerrainConfig, state: SeedState, classifier: Option<&Arc<dyn MaterialClassifier>>) -> Self {
        let config = GenerationConfig {
            seed: state.seed,
            terrain: terrain.clone(),
        };
        let generator = match classifier {
            Some(classifier) => DensityGenerator::with_classifier(config, Box::new(Arc::clone(classifier))),
            None => DensityGenerator::new(config),
        };
        Self {
            epoch: state.epoch,
            generator,
            scatter: PlacementScatter::new(state.seed),
        }
    }
}

struct Resident {
    epoch: u64,
    chunk: Arc<Mutex<LoadedChunk>>,
}

/// Chunk loading, editing and caching for one world.
pub struct TerrainPipeline {
    config: PipelineConfig,
    seed: Arc<SeedAuthority>,
    generation: RwLock<Arc<Generation>>,
    mesher: SurfaceNetsMesher,
    classifier: Option<Arc<dyn MaterialClassifier>>,
    chunks: RwLock<HashMap<ChunkCoord, Resident>>,
    cache: Option<ChunkCache>,
    generated: AtomicU64,
    cache_hits: AtomicU64,
    discarded: AtomicU64,
}

impl TerrainPipeline {
    /// Creates a pipeline without a cache.
    ///
    /// # Errors
    ///
    /// `InvalidWorldType` if the world type cannot be part of a cache key,
    /// `Config` if the seed is zero.
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        if config.world_type.is_empty() || config.world_type.contains(',') {
            return Err(PipelineError::InvalidWorldType(config.world_type));
        }
        let initial = config.generation.seed;
        if initial.value() == 0 {
            return Err(ProceduralError::InvalidSeed(initial.value().to_string()).into());
        }

        let seed = Arc::new(SeedAuthority::new(initial));
        let generation = Generation::new(&config.generation.terrain, seed.snapshot(), None);
        Ok(Self {
            mesher: SurfaceNetsMesher::new(config.mesh_config()),
            classifier: None,
            generation: RwLock::new(Arc::new(generation)),
            seed,
            config,
            chunks: RwLock::new(HashMap::new()),
            cache: None,
            generated: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        })
    }

    /// Attaches a cache.
    #[must_use]
    pub fn with_cache(mut self, cache: ChunkCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replaces the default material rules. Generators rebuilt after a seed
    /// change keep using `classifier`.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn MaterialClassifier>) -> Self {
        let state = self.seed.snapshot();
        self.generation = RwLock::new(Arc::new(Generation::new(
            &self.config.generation.terrain,
            state,
            Some(&classifier),
        )));
        self.classifier = Some(classifier);
        self
    }

    /// Pipeline settings.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Attached cache, if any.
    #[must_use]
    pub fn cache(&self) -> Option<&ChunkCache> {
        self.cache.as_ref()
    }

    /// Seed authority shared with other subsystems.
    #[must_use]
    pub fn seed_authority(&self) -> &Arc<SeedAuthority> {
        &self.seed
    }

    /// Current seed.
    #[must_use]
    pub fn seed(&self) -> WorldSeed {
        self.seed.seed()
    }

    /// Registers a seed-change callback.
    pub fn subscribe(&self, listener: SeedListener) -> ListenerId {
        self.seed.subscribe(listener)
    }

    /// Load counters so far.
    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            generated: self.generated.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }

    /// Generator state for the current epoch, rebuilt on first use after a
    /// seed change.
    fn current_generation(&self) -> Arc<Generation> {
        let state = self.seed.snapshot();
        {
            let generation = self.generation.read();
            if generation.epoch >= state.epoch {
                return Arc::clone(&generation);
            }
        }

        let mut generation = self.generation.write();
        if generation.epoch < state.epoch {
            tracing::debug!(seed = state.seed.value(), epoch = state.epoch, "rebuilding generator");
            *generation = Arc::new(Generation::new(
                &self.config.generation.terrain,
                state,
                self.classifier.as_ref(),
            ));
        }
        Arc::clone(&generation)
    }

    /// Cache key for `coord` under `seed`. The seed is folded into the world
    /// type so records of another seed are never served.
    fn cache_key(&self, coord: ChunkCoord, seed: WorldSeed) -> Option<ChunkKey> {
        let world_type = format!("{}-s{}", self.config.world_type, seed.value());
        match ChunkKey::new(coord, world_type, self.config.version) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!(error = %e, "cannot build cache key");
                None
            }
        }
    }

    /// Resident chunk of the current epoch.
    fn resident(&self, coord: ChunkCoord) -> Option<Arc<Mutex<LoadedChunk>>> {
        let epoch = self.seed.epoch();
        self.chunks
            .read()
            .get(&coord)
            .filter(|resident| resident.epoch == epoch)
            .map(|resident| Arc::clone(&resident.chunk))
    }

    /// Makes `coord` resident and returns a handle to it.
    ///
    /// # Errors
    ///
    /// `SeedChanged` if the seed changed while the chunk was produced.
    pub fn load_chunk(&self, coord: ChunkCoord) -> PipelineResult<ChunkView> {
        if let Some(chunk) = self.resident(coord) {
            return Ok(ChunkView {
                coord,
                source: ChunkSource::Resident,
                chunk,
            });
        }

        let generation = self.current_generation();
        let seed = generation.generator.seed();
        let key = self.cache.as_ref().and_then(|_| self.cache_key(coord, seed));

        let cached = match (&self.cache, &key) {
            (Some(cache), Some(key)) => cache.get(key.cx, key.cz, &key.world_type, key.version),
            _ => None,
        };

        let (loaded, source) = if let Some(record) = cached {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            let placements = record
                .placements
                .unwrap_or_else(|| generation.scatter.scatter(&record.grid));
            let loaded = LoadedChunk {
                grid: record.grid,
                mesh: record.mesh,
                placements,
                revision: 0,
            };
            (loaded, ChunkSource::Cache)
        } else {
            let grid = generation.generator.generate(coord);
            let mesh = self.mesher.mesh(&grid);
            let placements = generation.scatter.scatter(&grid);
            self.generated.fetch_add(1, Ordering::Relaxed);
            let loaded = LoadedChunk {
                grid,
                mesh,
                placements,
                revision: 0,
            };
            (loaded, ChunkSource::Generated)
        };

        // Checked under the map lock so set_seed cannot slip in between
        let mut chunks = self.chunks.write();
        let current = self.seed.epoch();
        if current != generation.epoch {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(?coord, started = generation.epoch, current, "discarding stale chunk");
            return Err(PipelineError::SeedChanged {
                started: generation.epoch,
                current,
            });
        }

        // Another load may have finished first; keep its (possibly edited) chunk
        if let Some(existing) = chunks.get(&coord).filter(|resident| resident.epoch == current) {
            return Ok(ChunkView {
                coord,
                source: ChunkSource::Resident,
                chunk: Arc::clone(&existing.chunk),
            });
        }

        let chunk = Arc::new(Mutex::new(loaded));
        {
            // Locked before it becomes visible, so an edit waits for this write
            let fresh = chunk.lock();
            chunks.insert(
                coord,
                Resident {
                    epoch: current,
                    chunk: Arc::clone(&chunk),
                },
            );
            drop(chunks);

            if source == ChunkSource::Generated {
                if let (Some(cache), Some(key)) = (&self.cache, key) {
                    cache.put(record_of(key, &fresh));
                }
            }
        }
        tracing::debug!(?coord, ?source, "loaded chunk");
        Ok(ChunkView { coord, source, chunk })
    }

    /// Loads `coords` in parallel. Results come back in input order.
    #[must_use]
    pub fn load_many(&self, coords: &[ChunkCoord]) -> Vec<(ChunkCoord, PipelineResult<ChunkView>)> {
        coords
            .par_iter()
            .map(|&coord| (coord, self.load_chunk(coord)))
            .collect()
    }

    /// Handle to a resident chunk.
    ///
    /// # Errors
    ///
    /// `NotLoaded` if the chunk is not resident.
    pub fn view(&self, coord: ChunkCoord) -> PipelineResult<ChunkView> {
        self.resident(coord)
            .map(|chunk| ChunkView {
                coord,
                source: ChunkSource::Resident,
                chunk,
            })
            .ok_or(PipelineError::NotLoaded(coord))
    }

    /// Drops a resident chunk. Returns false if it was not loaded.
    pub fn unload_chunk(&self, coord: ChunkCoord) -> bool {
        self.chunks.write().remove(&coord).is_some()
    }

    /// Coordinates of every resident chunk of the current epoch.
    #[must_use]
    pub fn loaded_coords(&self) -> Vec<ChunkCoord> {
        let epoch = self.seed.epoch();
        let mut coords: Vec<ChunkCoord> = self
            .chunks
            .read()
            .iter()
            .filter(|(_, resident)| resident.epoch == epoch)
            .map(|(&coord, _)| coord)
            .collect();
        coords.sort_unstable();
        coords
    }

    /// Applies an edit to every chunk whose padded grid the sphere reaches,
    /// remeshing and re-caching the ones that changed.
    ///
    /// Chunks that are not resident are loaded first. Returns the changed
    /// chunks; the edit stops early if the seed changes under it.
    pub fn apply_edit(&self, request: EditRequest) -> Vec<ChunkCoord> {
        let edit = request.sphere();
        let generation = self.current_generation();

        let mut changed = Vec::new();
        for coord in edit.chunks_touched() {
            let view = match self.load_chunk(coord) {
                Ok(view) => view,
                Err(e) => {
                    tracing::warn!(?coord, error = %e, "edit stopped, chunk unavailable");
                    break;
                }
            };

            let mut chunk = view.lock();
            if self.seed.epoch() != generation.epoch {
                tracing::warn!(?coord, "edit stopped, seed changed");
                break;
            }
            if !edit.apply(&mut chunk.grid) {
                continue;
            }
            chunk.mesh = self.mesher.mesh(&chunk.grid);
            chunk.placements = generation.scatter.scatter(&chunk.grid);
            chunk.revision += 1;

            if let Some(cache) = &self.cache {
                if let Some(key) = self.cache_key(coord, generation.generator.seed()) {
                    cache.put(record_of(key, &chunk));
                }
            }
            changed.push(coord);
        }

        tracing::debug!(
            center = ?request.point,
            radius = request.radius,
            changed = changed.len(),
            "applied edit"
        );
        changed
    }

    /// Installs a new seed.
    ///
    /// Bumps the epoch, notifies listeners, rebuilds the generator and drops
    /// every chunk produced under the old seed. Returns the new epoch, or
    /// `None` if `seed` was already current.
    ///
    /// # Errors
    ///
    /// `Config` if the seed is zero; nothing changes in that case.
    pub fn set_seed(&self, seed: WorldSeed) -> PipelineResult<Option<u64>> {
        let Some(epoch) = self.seed.set(seed)? else {
            return Ok(None);
        };
        let _ = self.current_generation();

        let dropped = {
            let mut chunks = self.chunks.write();
            let before = chunks.len();
            chunks.retain(|_, resident| resident.epoch == epoch);
            before - chunks.len()
        };
        tracing::info!(seed = seed.value(), epoch, dropped, "reset terrain for new seed");
        Ok(Some(epoch))
    }
}

fn record_of(key: ChunkKey, chunk: &LoadedChunk) -> CachedChunkRecord {
    CachedChunkRecord::new(
        key,
        chunk.grid.clone(),
        chunk.mesh.clone(),
        Some(chunk.placements.clone()),
    )
}

impl std::fmt::Debug for TerrainPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerrainPipeline")
            .field("seed", &self.seed.snapshot())
            .field("world_type", &self.config.world_type)
            .field("version", &self.config.version)
            .field("loaded", &self.chunks.read().len())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
