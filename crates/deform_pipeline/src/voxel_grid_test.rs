use glam::{Quat, UVec3, Vec3};

use super::*;
use crate::obb::Aabb3;

#[test]
fn test_adaptive_size_alignment_properties() {
  // For any extent: x,y even and >= 2, z a multiple of 32 and >= 32,
  // all <= max.
  let extents = [
    Vec3::ZERO,
    Vec3::splat(0.01),
    Vec3::new(1.0, 2.0, 3.0),
    Vec3::new(10.0, 0.5, 7.3),
    Vec3::splat(100.0),
    Vec3::new(1000.0, 1.0, 1000.0),
  ];
  for extent in extents {
    let size = compute_adaptive_voxel_size(extent, ADAPTIVE_VOXEL_SCALE, 256);
    assert!(size.x >= 2 && size.x % 2 == 0, "x {size:?}");
    assert!(size.y >= 2 && size.y % 2 == 0, "y {size:?}");
    assert!(size.z >= 32 && size.z % 32 == 0, "z {size:?}");
    assert!(size.x <= 256 && size.y <= 256 && size.z <= 256);
  }
}

#[test]
fn test_adaptive_size_scales_with_extent() {
  // 4.0 world units at 5 voxels/unit = 20 -> x stays 20 (even),
  // z rounds up to 32.
  let size = compute_adaptive_voxel_size(Vec3::new(4.0, 4.6, 4.0), 5.0, 256);
  assert_eq!(size, UVec3::new(20, 24, 32));

  // 9.0 units -> 45 -> x rounds to 46, z to 64.
  let size = compute_adaptive_voxel_size(Vec3::splat(9.0), 5.0, 256);
  assert_eq!(size, UVec3::new(46, 46, 64));
}

#[test]
fn test_adaptive_size_clamps_to_max() {
  let size = compute_adaptive_voxel_size(Vec3::splat(1000.0), 5.0, 100);
  // Max 100: x,y clamp to 100 (even); z clamps to 96, the largest
  // multiple of 32 below the cap.
  assert_eq!(size, UVec3::new(100, 100, 96));
}

#[test]
fn test_static_sizing_is_aligned() {
  let config = VoxelGridConfig {
    sizing: GridSizing::Static(UVec3::new(15, 8, 40)),
    max_grid_size: 256,
  };
  let obb = Aabb3::new(Vec3::ZERO, Vec3::ONE).to_obb();
  let grid = VoxelGridDefinition::from_config(&config, &obb);
  assert_eq!(grid.size(), UVec3::new(16, 8, 64));
}

#[test]
#[should_panic(expected = "max_grid_size must be at least 32")]
fn test_undersized_grid_cap_is_rejected() {
  // A cap below one Z word can never hold a valid grid.
  let config = VoxelGridConfig {
    sizing: GridSizing::Adaptive { scale: 5.0 },
    max_grid_size: 16,
  };
  let obb = Aabb3::new(Vec3::ZERO, Vec3::ONE).to_obb();
  VoxelGridDefinition::from_config(&config, &obb);
}

#[test]
fn test_buffer_stride_invariant() {
  // data = stride_y * size.y words, stride_y = stride_x * size.x,
  // stride_x = size.z / 32; byte size is always a multiple of 4.
  let grid = VoxelGridDefinition::new(UVec3::new(10, 6, 96));
  assert_eq!(grid.data_words(), 3 * 10 * 6);
  assert_eq!(grid.data_bytes(), 3 * 10 * 6 * 4);
  assert_eq!(grid.data_bytes() % 4, 0);
}

#[test]
fn test_set_and_test_voxels() {
  let mut grid = VoxelGridDefinition::new(UVec3::new(4, 4, 64));
  assert_eq!(grid.solid_count(), 0);

  grid.set_voxel(0, 0, 0);
  grid.set_voxel(3, 3, 63);
  grid.set_voxel(1, 2, 33); // second word of its z-run

  assert!(grid.is_solid(0, 0, 0));
  assert!(grid.is_solid(3, 3, 63));
  assert!(grid.is_solid(1, 2, 33));
  assert!(!grid.is_solid(1, 2, 32));
  assert!(!grid.is_solid(0, 0, 1));
  assert_eq!(grid.solid_count(), 3);

  grid.clear();
  assert_eq!(grid.solid_count(), 0);
  assert!(!grid.is_solid(3, 3, 63));
}

#[test]
fn test_world_to_voxel_maps_obb_to_grid() {
  let obb = Obb::from_center_rotation(
    Vec3::new(5.0, -2.0, 1.0),
    Quat::from_rotation_y(0.7),
    Vec3::new(2.0, 1.0, 3.0),
  );
  let mut grid = VoxelGridDefinition::new(UVec3::new(20, 10, 32));
  grid.update_transforms(&obb);

  // The OBB center lands in the middle of the grid.
  let center_voxel = grid.world_to_voxel().transform_point3(obb.center);
  assert!(center_voxel.abs_diff_eq(Vec3::new(10.0, 5.0, 16.0), 1e-3));

  // The all-negative corner lands at the voxel origin.
  let min_corner = obb.corners()[0];
  let v = grid.world_to_voxel().transform_point3(min_corner);
  assert!(v.abs_diff_eq(Vec3::ZERO, 1e-3));

  // Round trip through the inverse.
  let p = Vec3::new(4.0, -1.5, 0.5);
  let back = grid
    .voxel_to_world()
    .transform_point3(grid.world_to_voxel().transform_point3(p));
  assert!(back.abs_diff_eq(p, 1e-3));
}

#[test]
fn test_projection_maps_grid_to_ndc() {
  let obb = Aabb3::new(Vec3::ZERO, Vec3::new(2.0, 2.0, 2.0)).to_obb();
  let mut grid = VoxelGridDefinition::new(UVec3::new(16, 16, 32));
  grid.update_transforms(&obb);

  // Voxel-space origin -> NDC (-1, -1, 0); far corner -> (1, 1, 1).
  let origin = grid.voxel_proj().transform_point3(Vec3::ZERO);
  assert!(origin.abs_diff_eq(Vec3::new(-1.0, -1.0, 0.0), 1e-5));
  let far = grid.voxel_proj().transform_point3(Vec3::new(16.0, 16.0, 32.0));
  assert!(far.abs_diff_eq(Vec3::new(1.0, 1.0, 1.0), 1e-5));

  // Combined world transform agrees with the two-step mapping.
  let p = Vec3::new(1.0, 0.5, 1.7);
  let direct = grid.world_to_voxel_proj().transform_point3(p);
  let two_step = grid
    .voxel_proj()
    .transform_point3(grid.world_to_voxel().transform_point3(p));
  assert!(direct.abs_diff_eq(two_step, 1e-4));
}
