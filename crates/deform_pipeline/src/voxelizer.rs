//! Start/end bracket around a solid voxelization render pass.
//!
//! `VoxelizationRenderer` owns no geometry: it prepares the grid
//! (transforms + clear), picks the solid-fill direction, and brackets the
//! backend's render state. The caller issues the penetrator draw calls
//! between start and end.
//!
//! Solid voxelization fills spans by parity counting along Z, so the
//! rasterization has to start from a face of the intersecting OBB that
//! lies outside the deformable mesh. `start_voxelize_solid` tests the
//! OBB's two Z faces against the deformable's own box to pick the
//! direction; if neither face is outside, the parity fill has no valid
//! entry side and the precondition assertion fires.

use glam::{Mat4, UVec3};

use crate::obb::Obb;
use crate::types::RasterBackend;
use crate::voxel_grid::VoxelGridDefinition;

/// State of one active voxelization pass, consumed by the draw and the
/// deformation kernel that follows.
#[derive(Clone, Copy, Debug)]
pub struct VoxelPass {
  /// Combined world -> voxel-NDC transform for the vertex stage.
  pub world_to_voxel_proj: Mat4,

  /// Grid dimensions; the viewport covers `x * y`.
  pub grid_size: UVec3,

  /// Fill spans back-to-front instead of front-to-back.
  pub fill_solid_backward: bool,
}

impl VoxelPass {
  /// Viewport extent of the pass (grid XY).
  #[inline]
  pub fn viewport(&self) -> (u32, u32) {
    (self.grid_size.x, self.grid_size.y)
  }
}

/// Decide the parity-fill direction for voxelizing `voxel_obb` against a
/// deformable bounded by `deformable_obb`.
///
/// Returns `true` (backward) when the OBB's back (-Z) face lies outside
/// the deformable, `false` when the front (+Z) face does.
///
/// # Panics
/// Asserts that at least one Z face is outside the deformable's box -
/// solid voxelization is undefined otherwise.
pub fn fill_direction(voxel_obb: &Obb, deformable_obb: &Obb) -> bool {
  let back_outside = !deformable_obb.contains_point(voxel_obb.face_center(2, false));
  let front_outside = !deformable_obb.contains_point(voxel_obb.face_center(2, true));
  assert!(
    back_outside || front_outside,
    "no face of the voxelization OBB lies outside the deformable"
  );
  back_outside
}

/// Brackets voxelization passes over a raster backend.
pub struct VoxelizationRenderer<B: RasterBackend> {
  backend: B,
  pass_active: bool,
}

impl<B: RasterBackend> VoxelizationRenderer<B> {
  pub fn new(backend: B) -> Self {
    Self {
      backend,
      pass_active: false,
    }
  }

  /// Prepare `grid` for rasterizing a penetrator bounded by `voxel_obb`
  /// and open the backend pass.
  ///
  /// The caller must draw the penetrator geometry (through
  /// [`backend_mut`](Self::backend_mut) or the pipeline) and then call
  /// [`end_voxelize_solid`](Self::end_voxelize_solid).
  pub fn start_voxelize_solid(
    &mut self,
    grid: &mut VoxelGridDefinition,
    voxel_obb: &Obb,
    deformable_obb: &Obb,
  ) -> VoxelPass {
    debug_assert!(!self.pass_active, "voxelization pass already active");

    let fill_solid_backward = fill_direction(voxel_obb, deformable_obb);
    grid.update_transforms(voxel_obb);
    grid.clear();

    let pass = VoxelPass {
      world_to_voxel_proj: grid.world_to_voxel_proj(),
      grid_size: grid.size(),
      fill_solid_backward,
    };

    self.backend.begin_voxel_pass(grid, &pass);
    self.pass_active = true;
    pass
  }

  /// Close the pass and restore the backend's previous render state.
  pub fn end_voxelize_solid(&mut self) {
    debug_assert!(self.pass_active, "no voxelization pass active");
    self.backend.end_voxel_pass();
    self.pass_active = false;
  }

  #[inline]
  pub fn backend_mut(&mut self) -> &mut B {
    &mut self.backend
  }

  #[inline]
  pub fn backend(&self) -> &B {
    &self.backend
  }
}

#[cfg(test)]
mod tests {
  use glam::Vec3;

  use super::*;
  use crate::obb::Aabb3;
  use crate::types::PenetratorId;

  /// Records the bracket calls it receives.
  #[derive(Default)]
  struct RecordingBackend {
    events: Vec<String>,
  }

  impl RasterBackend for RecordingBackend {
    fn begin_voxel_pass(&mut self, _grid: &VoxelGridDefinition, pass: &VoxelPass) {
      let (w, h) = pass.viewport();
      self.events.push(format!("begin {w}x{h}"));
    }

    fn draw_solid(&mut self, penetrator: PenetratorId, _pass: &VoxelPass) {
      self.events.push(format!("draw {}", penetrator.0));
    }

    fn end_voxel_pass(&mut self) {
      self.events.push("end".to_string());
    }
  }

  fn deformable_box() -> Obb {
    Aabb3::new(Vec3::splat(-2.0), Vec3::splat(2.0)).to_obb()
  }

  #[test]
  fn test_backward_fill_when_back_face_outside() {
    // Penetrator OBB hangs off the deformable's -Z side.
    let voxel_obb = Aabb3::new(Vec3::new(-1.0, -1.0, -3.0), Vec3::new(1.0, 1.0, 1.0)).to_obb();
    assert!(fill_direction(&voxel_obb, &deformable_box()));
  }

  #[test]
  fn test_forward_fill_when_front_face_outside() {
    // Swapping which face pokes out flips the flag.
    let voxel_obb = Aabb3::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 3.0)).to_obb();
    assert!(!fill_direction(&voxel_obb, &deformable_box()));
  }

  #[test]
  #[should_panic(expected = "no face of the voxelization OBB")]
  fn test_fully_interior_obb_asserts() {
    let voxel_obb = Aabb3::new(Vec3::splat(-1.0), Vec3::splat(1.0)).to_obb();
    fill_direction(&voxel_obb, &deformable_box());
  }

  #[test]
  fn test_bracket_clears_grid_and_restores_state() {
    let mut renderer = VoxelizationRenderer::new(RecordingBackend::default());
    let mut grid = VoxelGridDefinition::new(glam::UVec3::new(8, 8, 32));
    grid.set_voxel(1, 1, 1);

    let voxel_obb = Aabb3::new(Vec3::new(-1.0, -1.0, -3.0), Vec3::new(1.0, 1.0, 1.0)).to_obb();
    let pass = renderer.start_voxelize_solid(&mut grid, &voxel_obb, &deformable_box());

    // The grid was cleared and retargeted before the pass opened.
    assert_eq!(grid.solid_count(), 0);
    assert!(pass.fill_solid_backward);

    renderer.backend_mut().draw_solid(PenetratorId(3), &pass);
    renderer.end_voxelize_solid();

    assert_eq!(
      renderer.backend().events,
      vec!["begin 8x8", "draw 3", "end"]
    );
  }
}
