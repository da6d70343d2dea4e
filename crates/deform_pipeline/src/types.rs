//! Core types and trait seams for the deformation pipeline.
//!
//! The pipeline coordinates three external collaborators, each behind a
//! trait: the subdivision surface (tile counts and patch bounds), the
//! raster backend (the device pass that actually draws penetrator
//! geometry into a voxel grid), and the deformation kernel (the compute
//! pass that displaces tiles from a filled grid).

use thiserror::Error;

use crate::obb::{Aabb3, Obb};
use crate::voxelizer::VoxelPass;
use crate::voxel_grid::VoxelGridDefinition;
use tile_memory::TileLayoutTable;

/// Identifier of a deformable mesh instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeformableId(pub u32);

/// Identifier of a penetrator mesh instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PenetratorId(pub u32);

/// One body as reported by the physics broad phase.
///
/// The broad phase hands back user pointers; this is their resolved,
/// value-typed form: which instance it is, whether it carries deformable
/// sub-meshes, and its world-space OBB this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyRef {
  pub id: u32,
  pub deformable: bool,
  pub obb: Obb,
}

/// An overlapping pair from the physics broad phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BroadPhasePair {
  pub a: BodyRef,
  pub b: BodyRef,
}

/// Deformable surface contract: what the subdivision library exposes.
///
/// Tile count equals the ptex face count; per-face bounds feed the
/// patch-visibility culling that gates tile allocation.
pub trait DeformableSurface {
  /// Number of ptex faces (= tiles) of the surface.
  fn num_ptex_faces(&self) -> usize;

  /// World-space bounds of one ptex face's patch.
  fn face_bounds(&self, face: usize) -> Aabb3;

  /// World-space OBB of the whole instance.
  fn obb(&self) -> Obb;
}

/// Raster backend contract: the device-side bracket of a voxelization
/// pass plus the penetrator draw between start and end.
pub trait RasterBackend {
  /// Bind the voxel buffer as the pass target, set the grid viewport,
  /// disable culling. Previous state must be restorable.
  fn begin_voxel_pass(&mut self, grid: &VoxelGridDefinition, pass: &VoxelPass);

  /// Draw the penetrator's solid geometry under the active pass
  /// transforms.
  fn draw_solid(&mut self, penetrator: PenetratorId, pass: &VoxelPass);

  /// Restore render targets, depth-stencil, viewport, and bindings.
  fn end_voxel_pass(&mut self);
}

/// Deformation kernel contract: consumes a filled voxel grid and writes
/// displacement into the deformable's resident tiles.
pub trait DeformationKernel {
  fn deform(
    &mut self,
    deformable: DeformableId,
    layout: &TileLayoutTable,
    grid: &VoxelGridDefinition,
    pass: &VoxelPass,
  );
}

/// Pipeline failures. All of these are configuration or wiring errors
/// surfaced to the caller; none abort the process.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
  /// Both broad-phase bodies carry deformable sub-meshes.
  /// Deformable-on-deformable collision is not implemented.
  #[error("deformable-vs-deformable collision is not supported (bodies {a} and {b})")]
  DeformablePair { a: u32, b: u32 },

  /// A collision referenced a penetrator with no registered voxel grid.
  #[error("penetrator {0:?} has no registered voxel grid")]
  UnregisteredPenetrator(PenetratorId),

  /// A collision referenced a deformable with no surface entry.
  #[error("deformable {0:?} has no registered surface")]
  UnknownDeformable(DeformableId),
}
