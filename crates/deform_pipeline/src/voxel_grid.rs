//! Per-instance voxel grid: bit buffer, sizing, and transforms.
//!
//! Every voxelizable instance owns one grid, created at scene load. The
//! solid-voxel buffer packs one bit per voxel into 32-bit words along Z,
//! so the Z dimension is always word-aligned. Grid transforms are
//! recomputed each frame the instance is voxelized against a new
//! intersecting OBB; the buffer itself is only ever sized at creation.

use glam::{Mat4, UVec3, Vec3};

use crate::obb::Obb;

/// Bits per buffer word; the Z dimension aligns to this.
pub const VOXEL_WORD_BITS: u32 = 32;

/// Voxels per world unit of OBB extent in adaptive sizing.
pub const ADAPTIVE_VOXEL_SCALE: f32 = 5.0;

/// How a grid's dimensions are chosen at creation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GridSizing {
  /// Fixed dimensions (aligned to the grid invariants on creation).
  Static(UVec3),

  /// Derived from the instance OBB extent times `scale`.
  Adaptive { scale: f32 },
}

/// Grid creation parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelGridConfig {
  pub sizing: GridSizing,

  /// Upper bound on each grid dimension.
  pub max_grid_size: u32,
}

impl Default for VoxelGridConfig {
  fn default() -> Self {
    Self {
      sizing: GridSizing::Adaptive {
        scale: ADAPTIVE_VOXEL_SCALE,
      },
      max_grid_size: 256,
    }
  }
}

/// Round `n` up to an even number and clamp to `[2, max_even]`.
fn align_xy(n: u32, max_grid_size: u32) -> u32 {
  let max_even = max_grid_size & !1;
  (n.div_ceil(2) * 2).clamp(2, max_even)
}

/// Round `n` up to a multiple of 32 and clamp to `[32, max_mult]`.
fn align_z(n: u32, max_grid_size: u32) -> u32 {
  debug_assert!(max_grid_size >= VOXEL_WORD_BITS);
  let max_mult = max_grid_size - max_grid_size % VOXEL_WORD_BITS;
  (n.div_ceil(VOXEL_WORD_BITS) * VOXEL_WORD_BITS).clamp(VOXEL_WORD_BITS, max_mult)
}

/// Grid dimensions for an OBB of the given full extent.
///
/// X and Y round up to even numbers, Z to a multiple of 32 (the bit
/// buffer packs words along Z), all clamped to the configured maximum.
pub fn compute_adaptive_voxel_size(extent: Vec3, scale: f32, max_grid_size: u32) -> UVec3 {
  UVec3::new(
    align_xy((extent.x * scale).ceil() as u32, max_grid_size),
    align_xy((extent.y * scale).ceil() as u32, max_grid_size),
    align_z((extent.z * scale).ceil() as u32, max_grid_size),
  )
}

/// A voxelization target: packed solid bits plus the transforms needed to
/// rasterize into and read back out of voxel space.
#[derive(Clone, Debug)]
pub struct VoxelGridDefinition {
  size: UVec3,
  /// Words per Z run.
  stride_x: u32,
  /// Words per X row of Z runs.
  stride_y: u32,
  data: Vec<u32>,

  world_to_voxel: Mat4,
  voxel_to_world: Mat4,
  voxel_proj: Mat4,
  world_to_voxel_proj: Mat4,
}

impl VoxelGridDefinition {
  /// Create a grid with the given (aligned) dimensions.
  pub fn new(size: UVec3) -> Self {
    debug_assert!(size.x >= 2 && size.x % 2 == 0, "grid x must be even");
    debug_assert!(size.y >= 2 && size.y % 2 == 0, "grid y must be even");
    debug_assert!(
      size.z >= VOXEL_WORD_BITS && size.z % VOXEL_WORD_BITS == 0,
      "grid z must be a multiple of 32"
    );

    let stride_x = size.z / VOXEL_WORD_BITS;
    let stride_y = stride_x * size.x;
    let words = (stride_y * size.y) as usize;

    Self {
      size,
      stride_x,
      stride_y,
      data: vec![0; words],
      world_to_voxel: Mat4::IDENTITY,
      voxel_to_world: Mat4::IDENTITY,
      voxel_proj: Mat4::IDENTITY,
      world_to_voxel_proj: Mat4::IDENTITY,
    }
  }

  /// Create a grid for `obb` per the config's sizing mode.
  ///
  /// # Panics
  /// Asserts `config.max_grid_size >= 32`: the Z dimension packs whole
  /// 32-bit words, so no valid grid fits under a smaller cap.
  pub fn from_config(config: &VoxelGridConfig, obb: &Obb) -> Self {
    assert!(
      config.max_grid_size >= VOXEL_WORD_BITS,
      "max_grid_size must be at least {VOXEL_WORD_BITS}"
    );
    let size = match config.sizing {
      GridSizing::Static(requested) => UVec3::new(
        align_xy(requested.x, config.max_grid_size),
        align_xy(requested.y, config.max_grid_size),
        align_z(requested.z, config.max_grid_size),
      ),
      GridSizing::Adaptive { scale } => {
        compute_adaptive_voxel_size(obb.extent(), scale, config.max_grid_size)
      }
    };
    Self::new(size)
  }

  #[inline]
  pub fn size(&self) -> UVec3 {
    self.size
  }

  /// Buffer length in 32-bit words.
  #[inline]
  pub fn data_words(&self) -> usize {
    self.data.len()
  }

  /// Buffer length in bytes; always a multiple of 4.
  #[inline]
  pub fn data_bytes(&self) -> usize {
    self.data.len() * 4
  }

  #[inline]
  pub fn data(&self) -> &[u32] {
    &self.data
  }

  /// Zero the solid bits. Runs before every voxelization pass.
  pub fn clear(&mut self) {
    self.data.fill(0);
  }

  #[inline]
  fn word_index(&self, x: u32, y: u32, z: u32) -> usize {
    debug_assert!(x < self.size.x && y < self.size.y && z < self.size.z);
    (y * self.stride_y + x * self.stride_x + z / VOXEL_WORD_BITS) as usize
  }

  /// Mark voxel (x, y, z) solid.
  #[inline]
  pub fn set_voxel(&mut self, x: u32, y: u32, z: u32) {
    let idx = self.word_index(x, y, z);
    self.data[idx] |= 1 << (z % VOXEL_WORD_BITS);
  }

  /// Whether voxel (x, y, z) is solid.
  #[inline]
  pub fn is_solid(&self, x: u32, y: u32, z: u32) -> bool {
    let idx = self.word_index(x, y, z);
    self.data[idx] & (1 << (z % VOXEL_WORD_BITS)) != 0
  }

  /// Number of solid voxels.
  pub fn solid_count(&self) -> usize {
    self.data.iter().map(|w| w.count_ones() as usize).sum()
  }

  /// Recompute all four transforms so `obb` maps onto `[0, size]` voxel
  /// space. Called once per voxelization pass.
  pub fn update_transforms(&mut self, obb: &Obb) {
    let extent = obb.extent().max(Vec3::splat(f32::EPSILON));
    let size = self.size.as_vec3();

    // world -> OBB local -> shifted to [0, extent] -> scaled to voxels.
    self.world_to_voxel = Mat4::from_scale(size / extent)
      * Mat4::from_translation(obb.half_extents)
      * Mat4::from_mat3(obb.axes.transpose())
      * Mat4::from_translation(-obb.center);
    self.voxel_to_world = self.world_to_voxel.inverse();

    // Orthographic mapping of voxel space onto the raster target:
    // x,y in [0, size] -> [-1, 1] NDC, z -> [0, 1] depth.
    self.voxel_proj = Mat4::from_translation(Vec3::new(-1.0, -1.0, 0.0))
      * Mat4::from_scale(Vec3::new(2.0 / size.x, 2.0 / size.y, 1.0 / size.z));
    self.world_to_voxel_proj = self.voxel_proj * self.world_to_voxel;
  }

  #[inline]
  pub fn world_to_voxel(&self) -> Mat4 {
    self.world_to_voxel
  }

  #[inline]
  pub fn voxel_to_world(&self) -> Mat4 {
    self.voxel_to_world
  }

  #[inline]
  pub fn voxel_proj(&self) -> Mat4 {
    self.voxel_proj
  }

  #[inline]
  pub fn world_to_voxel_proj(&self) -> Mat4 {
    self.world_to_voxel_proj
  }
}

#[cfg(test)]
#[path = "voxel_grid_test.rs"]
mod voxel_grid_test;
