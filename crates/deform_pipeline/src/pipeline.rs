//! Frame orchestration: collision intake, tile residency, voxelization,
//! and kernel dispatch.
//!
//! Per frame the pipeline runs in two phases. `detect_collision_pairs`
//! filters the physics broad phase into the per-frame collision map.
//! `check_and_apply_deformation` then drains that map: for every touched
//! deformable it groups penetrators into batches, ensures displacement
//! tile residency for the patches the batch can reach, voxelizes each
//! penetrator into its grid, and hands the filled grid to the deformation
//! kernel.
//!
//! ```text
//! broad phase -> collision map -> [per deformable]
//!                                   batch penetrators (<= 6)
//!                                   cull patches -> tile requests
//!                                   manage_displacement_tiles
//!                                   [per penetrator] voxelize -> deform
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use smallvec::SmallVec;
use web_time::Instant;

use tile_memory::{MemoryManager, TileLayoutTable};

use crate::collision::{self, CollisionConfig, CollisionMap};
use crate::obb::Obb;
use crate::types::{
  BroadPhasePair, DeformableId, DeformableSurface, DeformationKernel, PenetratorId, PipelineError,
  RasterBackend,
};
use crate::voxel_grid::{VoxelGridConfig, VoxelGridDefinition};
use crate::voxelizer::VoxelizationRenderer;

/// Penetrators deformed against one deformable per batch. Tile residency
/// is resolved once per batch, so the batch bounds how much allocation a
/// single pass can demand.
pub const DEFORMATION_BATCH_SIZE: usize = 6;

/// Pipeline construction options.
#[derive(Clone, Copy, Debug)]
pub struct PipelineConfig {
  pub collision: CollisionConfig,
  pub grid: VoxelGridConfig,

  /// Request tiles only for patches whose bounds reach a batch
  /// penetrator. When off, every tile of a touched deformable is
  /// requested.
  pub cull_patches: bool,

  /// Seed for the jitter stream.
  pub rng_seed: u64,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      collision: CollisionConfig::default(),
      grid: VoxelGridConfig::default(),
      cull_patches: true,
      rng_seed: 0,
    }
  }
}

/// Counters for one `check_and_apply_deformation` call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeformationStats {
  /// Deformables that had at least one colliding penetrator.
  pub deformables_touched: usize,

  /// Penetrators voxelized and dispatched to the kernel.
  pub penetrators_deformed: usize,

  /// Batches run (and tile-residency passes with them).
  pub batches: usize,

  /// Displacement tiles newly allocated this call.
  pub tiles_allocated: usize,

  /// Tile requests denied because the displacement pool was empty.
  pub tiles_out_of_memory: u32,

  /// Wall time of the whole call.
  pub elapsed: Duration,
}

/// The deformation pipeline.
///
/// Owns per-penetrator voxel grids (created once at registration) and the
/// transient per-frame collision map. Surfaces, layout tables, the memory
/// manager, and the raster backend are all passed in by the caller.
pub struct DeformationPipeline {
  config: PipelineConfig,
  rng: StdRng,
  grids: BTreeMap<PenetratorId, VoxelGridDefinition>,
  collision_map: CollisionMap,
}

impl DeformationPipeline {
  pub fn new(config: PipelineConfig) -> Self {
    Self {
      rng: StdRng::seed_from_u64(config.rng_seed),
      config,
      grids: BTreeMap::new(),
      collision_map: CollisionMap::new(),
    }
  }

  /// Register a penetrator and size its voxel grid from `obb`.
  ///
  /// Grids are created here, once, and reused every frame; registering
  /// the same penetrator again keeps the existing grid.
  pub fn register_penetrator(&mut self, penetrator: PenetratorId, obb: &Obb) {
    self
      .grids
      .entry(penetrator)
      .or_insert_with(|| VoxelGridDefinition::from_config(&self.config.grid, obb));

    #[cfg(feature = "tracing")]
    tracing::debug!(
      penetrator = penetrator.0,
      grid_size = ?self.grids[&penetrator].size(),
      "registered penetrator"
    );
  }

  /// Drop a penetrator's grid.
  pub fn unregister_penetrator(&mut self, penetrator: PenetratorId) {
    self.grids.remove(&penetrator);
  }

  #[inline]
  pub fn grid(&self, penetrator: PenetratorId) -> Option<&VoxelGridDefinition> {
    self.grids.get(&penetrator)
  }

  /// Build this frame's collision map from the broad-phase pairs.
  ///
  /// Replaces any map left from a previous frame. Returns the number of
  /// deformables touched.
  pub fn detect_collision_pairs(
    &mut self,
    pairs: &[BroadPhasePair],
  ) -> Result<usize, PipelineError> {
    self.collision_map =
      collision::detect_deformable_collision_pairs(pairs, &self.config.collision, &mut self.rng)?;
    Ok(self.collision_map.len())
  }

  /// Drain the collision map: allocate tiles, voxelize, deform.
  ///
  /// For each touched deformable, penetrators run in batches of at most
  /// [`DEFORMATION_BATCH_SIZE`]. Each batch requests displacement tiles
  /// for the patches it can reach (all patches when culling is off),
  /// then voxelizes and deforms one penetrator at a time. Tile requests
  /// the pool cannot satisfy are counted, not fatal; the kernel skips
  /// unallocated tiles on its own.
  pub fn check_and_apply_deformation<S, B, K>(
    &mut self,
    surfaces: &BTreeMap<DeformableId, S>,
    layouts: &mut BTreeMap<DeformableId, TileLayoutTable>,
    memory: &MemoryManager,
    renderer: &mut VoxelizationRenderer<B>,
    kernel: &mut K,
  ) -> Result<DeformationStats, PipelineError>
  where
    S: DeformableSurface + Sync,
    B: RasterBackend,
    K: DeformationKernel,
  {
    let start = Instant::now();
    let mut stats = DeformationStats::default();

    // The map is per-frame state; drain it even if a later entry errors.
    let collision_map = std::mem::take(&mut self.collision_map);
    stats.deformables_touched = collision_map.len();

    for (deformable, penetrators) in &collision_map {
      let surface = surfaces
        .get(deformable)
        .ok_or(PipelineError::UnknownDeformable(*deformable))?;
      let layout = layouts
        .get_mut(deformable)
        .ok_or(PipelineError::UnknownDeformable(*deformable))?;
      let deformable_obb = surface.obb();

      let entries: Vec<(&PenetratorId, &Obb)> = penetrators.iter().collect();
      for batch in entries.chunks(DEFORMATION_BATCH_SIZE) {
        let batch: SmallVec<[(&PenetratorId, &Obb); DEFORMATION_BATCH_SIZE]> =
          batch.iter().copied().collect();

        let requests =
          self.tile_requests(surface, batch.iter().map(|(_, obb)| *obb));
        let outcome = memory.manage_displacement_tiles(layout, &requests);
        stats.batches += 1;
        stats.tiles_allocated += outcome.allocated.len();
        stats.tiles_out_of_memory += outcome.out_of_memory;

        for &(penetrator, voxel_obb) in &batch {
          let grid = self
            .grids
            .get_mut(penetrator)
            .ok_or(PipelineError::UnregisteredPenetrator(*penetrator))?;

          let pass = renderer.start_voxelize_solid(grid, voxel_obb, &deformable_obb);
          renderer.backend_mut().draw_solid(*penetrator, &pass);
          renderer.end_voxelize_solid();

          kernel.deform(*deformable, layout, grid, &pass);
          stats.penetrators_deformed += 1;
        }
      }
    }

    stats.elapsed = start.elapsed();
    #[cfg(feature = "tracing")]
    tracing::debug!(
      deformables = stats.deformables_touched,
      penetrators = stats.penetrators_deformed,
      batches = stats.batches,
      tiles_allocated = stats.tiles_allocated,
      out_of_memory = stats.tiles_out_of_memory,
      elapsed_us = stats.elapsed.as_micros() as u64,
      "deformation pass"
    );
    Ok(stats)
  }

  /// One request flag per ptex face: does the batch reach this patch?
  fn tile_requests<'a, S: DeformableSurface + Sync>(
    &self,
    surface: &S,
    batch_obbs: impl Iterator<Item = &'a Obb>,
  ) -> Vec<bool> {
    let num_faces = surface.num_ptex_faces();
    if !self.config.cull_patches {
      return vec![true; num_faces];
    }

    let obbs: SmallVec<[Obb; DEFORMATION_BATCH_SIZE]> = batch_obbs.copied().collect();
    (0..num_faces)
      .into_par_iter()
      .map(|face| {
        let bounds = surface.face_bounds(face);
        obbs.iter().any(|obb| obb.overlaps_aabb(&bounds))
      })
      .collect()
  }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
