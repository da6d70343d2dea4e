//! deform_pipeline - voxelization-driven mesh deformation
//!
//! When a rigid body (a penetrator) presses into a subdivision-surface
//! mesh (a deformable), the contact region is voxelized and the solid
//! voxels push displacement into the deformable's texture tiles. This
//! crate owns everything between the physics broad phase and the
//! deformation kernel:
//!
//! ```text
//! broad-phase pairs
//!      |  detect_collision_pairs        (collision)
//!      v
//! deformable -> {penetrator -> OBB}
//!      |  check_and_apply_deformation   (pipeline)
//!      v
//! tile residency  ->  voxelize solid  ->  kernel.deform
//! (tile_memory)       (voxelizer)
//! ```
//!
//! The device-facing seams are traits: [`DeformableSurface`] for patch
//! bounds, [`RasterBackend`] for the voxelization draw, and
//! [`DeformationKernel`] for the displacement pass. Everything on this
//! side of those seams runs and tests on the CPU.
//!
//! Tile backing storage comes from the [`tile_memory`] crate; the
//! pipeline drives its atomic allocation path once per penetrator batch.

pub mod obb;
pub use obb::{Aabb3, JitterParams, Obb};

pub mod voxel_grid;
pub use voxel_grid::{
  compute_adaptive_voxel_size, GridSizing, VoxelGridConfig, VoxelGridDefinition,
  ADAPTIVE_VOXEL_SCALE,
};

pub mod types;
pub use types::{
  BodyRef, BroadPhasePair, DeformableId, DeformableSurface, DeformationKernel, PenetratorId,
  PipelineError, RasterBackend,
};

pub mod collision;
pub use collision::{CollisionConfig, CollisionMap, COLLISION_OBB_GROW};

pub mod voxelizer;
pub use voxelizer::{VoxelPass, VoxelizationRenderer};

pub mod pipeline;
pub use pipeline::{
  DeformationPipeline, DeformationStats, PipelineConfig, DEFORMATION_BATCH_SIZE,
};
