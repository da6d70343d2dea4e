//! Oriented and axis-aligned bounding boxes for collision pairing.
//!
//! The deformation pipeline pairs penetrators with deformables through
//! their oriented bounding boxes: the intersecting OBB between the two
//! drives voxel grid sizing and transforms, and a per-face exterior test
//! picks the solid-fill direction.

use glam::{Mat3, Quat, Vec3};
use rand::Rng;

/// Single-precision axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb3 {
  /// Minimum corner (inclusive).
  pub min: Vec3,
  /// Maximum corner (inclusive).
  pub max: Vec3,
}

impl Aabb3 {
  /// Create a new AABB from min and max corners.
  ///
  /// # Panics
  /// Debug-asserts that min <= max on all axes.
  pub fn new(min: Vec3, max: Vec3) -> Self {
    debug_assert!(
      min.x <= max.x && min.y <= max.y && min.z <= max.z,
      "AABB min must be <= max on all axes"
    );
    Self { min, max }
  }

  /// Smallest AABB containing all `points`.
  pub fn from_points(points: &[Vec3]) -> Self {
    let mut min = Vec3::INFINITY;
    let mut max = Vec3::NEG_INFINITY;
    for p in points {
      min = min.min(*p);
      max = max.max(*p);
    }
    Self { min, max }
  }

  #[inline]
  pub fn center(&self) -> Vec3 {
    (self.min + self.max) * 0.5
  }

  #[inline]
  pub fn size(&self) -> Vec3 {
    self.max - self.min
  }

  /// Check if this AABB overlaps with another (boundary contact counts).
  #[inline]
  pub fn overlaps(&self, other: &Aabb3) -> bool {
    self.min.x <= other.max.x
      && self.max.x >= other.min.x
      && self.min.y <= other.max.y
      && self.max.y >= other.min.y
      && self.min.z <= other.max.z
      && self.max.z >= other.min.z
  }

  #[inline]
  pub fn contains_point(&self, point: Vec3) -> bool {
    point.cmpge(self.min).all() && point.cmple(self.max).all()
  }

  /// View this AABB as an axis-aligned OBB.
  pub fn to_obb(&self) -> Obb {
    Obb {
      center: self.center(),
      axes: Mat3::IDENTITY,
      half_extents: self.size() * 0.5,
    }
  }
}

/// Oriented bounding box: center, orthonormal axes (matrix columns), and
/// half extents along those axes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obb {
  pub center: Vec3,
  pub axes: Mat3,
  pub half_extents: Vec3,
}

impl Obb {
  /// Create an OBB.
  ///
  /// # Panics
  /// Debug-asserts that `axes` is orthonormal.
  pub fn new(center: Vec3, axes: Mat3, half_extents: Vec3) -> Self {
    debug_assert!(
      (axes * axes.transpose()).abs_diff_eq(Mat3::IDENTITY, 1e-4),
      "OBB axes must be orthonormal"
    );
    Self {
      center,
      axes,
      half_extents,
    }
  }

  /// Axis-aligned OBB from an AABB.
  pub fn from_aabb(aabb: &Aabb3) -> Self {
    aabb.to_obb()
  }

  /// OBB from center, rotation, and half extents.
  pub fn from_center_rotation(center: Vec3, rotation: Quat, half_extents: Vec3) -> Self {
    Self::new(center, Mat3::from_quat(rotation), half_extents)
  }

  /// The i-th local axis in world space.
  #[inline]
  pub fn axis(&self, i: usize) -> Vec3 {
    self.axes.col(i)
  }

  /// Full extent (edge lengths) of the box.
  #[inline]
  pub fn extent(&self) -> Vec3 {
    self.half_extents * 2.0
  }

  /// The eight corners in world space.
  pub fn corners(&self) -> [Vec3; 8] {
    let mut out = [Vec3::ZERO; 8];
    for (i, corner) in out.iter_mut().enumerate() {
      let sx = if i & 1 != 0 { 1.0 } else { -1.0 };
      let sy = if i & 2 != 0 { 1.0 } else { -1.0 };
      let sz = if i & 4 != 0 { 1.0 } else { -1.0 };
      *corner = self.center
        + self.axis(0) * (sx * self.half_extents.x)
        + self.axis(1) * (sy * self.half_extents.y)
        + self.axis(2) * (sz * self.half_extents.z);
    }
    out
  }

  /// Center of the face on local axis `axis`, on the positive or negative
  /// side.
  pub fn face_center(&self, axis: usize, positive: bool) -> Vec3 {
    let sign = if positive { 1.0 } else { -1.0 };
    self.center + self.axis(axis) * (sign * self.half_extents[axis])
  }

  /// Point containment (boundary counts as inside).
  pub fn contains_point(&self, point: Vec3) -> bool {
    let d = point - self.center;
    (0..3).all(|i| self.axis(i).dot(d).abs() <= self.half_extents[i])
  }

  /// Projection interval of the box onto a (not necessarily unit) axis.
  pub fn projected_interval(&self, axis: Vec3) -> (f32, f32) {
    let c = self.center.dot(axis);
    let r = (0..3)
      .map(|i| (self.axis(i).dot(axis) * self.half_extents[i]).abs())
      .sum::<f32>();
    (c - r, c + r)
  }

  /// Separating-axis overlap test against another OBB.
  ///
  /// Tests the 6 face normals and the 9 edge cross products; degenerate
  /// (near-parallel) cross products are skipped.
  pub fn overlaps(&self, other: &Obb) -> bool {
    let test = |axis: Vec3| -> bool {
      if axis.length_squared() < 1e-8 {
        return true; // parallel edges, axis redundant
      }
      let (a0, a1) = self.projected_interval(axis);
      let (b0, b1) = other.projected_interval(axis);
      a0 <= b1 && b0 <= a1
    };

    for i in 0..3 {
      if !test(self.axis(i)) || !test(other.axis(i)) {
        return false;
      }
    }
    for i in 0..3 {
      for j in 0..3 {
        if !test(self.axis(i).cross(other.axis(j))) {
          return false;
        }
      }
    }
    true
  }

  /// Overlap test against an AABB.
  #[inline]
  pub fn overlaps_aabb(&self, aabb: &Aabb3) -> bool {
    self.overlaps(&aabb.to_obb())
  }

  /// The box scaled uniformly about its center.
  ///
  /// Collision OBBs get a small scale-up (1.01) so voxelization covers
  /// the boundary without artifacts.
  pub fn grown(&self, scale: f32) -> Self {
    Self {
      half_extents: self.half_extents * scale,
      ..*self
    }
  }

  /// This box clipped, along its own axes, to the region overlapping
  /// `other`. Returns `None` when the projections do not overlap.
  ///
  /// The result keeps this box's orientation; it bounds the true
  /// intersection volume conservatively.
  pub fn intersection_with(&self, other: &Obb) -> Option<Obb> {
    let mut lo = Vec3::ZERO;
    let mut hi = Vec3::ZERO;
    for i in 0..3 {
      let axis = self.axis(i);
      let c = self.center.dot(axis);
      let (self_lo, self_hi) = (c - self.half_extents[i], c + self.half_extents[i]);
      let (other_lo, other_hi) = other.projected_interval(axis);
      let clipped_lo = self_lo.max(other_lo);
      let clipped_hi = self_hi.min(other_hi);
      if clipped_lo > clipped_hi {
        return None;
      }
      lo[i] = clipped_lo;
      hi[i] = clipped_hi;
    }

    let mid = (lo + hi) * 0.5;
    let center = self.axis(0) * mid.x + self.axis(1) * mid.y + self.axis(2) * mid.z;
    Some(Obb {
      center,
      axes: self.axes,
      half_extents: (hi - lo) * 0.5,
    })
  }
}

/// Random per-frame OBB perturbation, used to decorrelate voxelization
/// aliasing across frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JitterParams {
  /// Maximum translation along each axis, in world units.
  pub max_translation: f32,

  /// Maximum rotation about a random axis, in radians.
  pub max_rotation: f32,
}

impl Default for JitterParams {
  fn default() -> Self {
    Self {
      max_translation: 0.02,
      max_rotation: 0.02,
    }
  }
}

impl JitterParams {
  /// Apply the jitter to `obb` using `rng`.
  pub fn apply<R: Rng>(&self, obb: &Obb, rng: &mut R) -> Obb {
    let offset = Vec3::new(
      rng.random_range(-self.max_translation..=self.max_translation),
      rng.random_range(-self.max_translation..=self.max_translation),
      rng.random_range(-self.max_translation..=self.max_translation),
    );

    let axis = Vec3::new(
      rng.random_range(-1.0..=1.0),
      rng.random_range(-1.0..=1.0),
      rng.random_range(-1.0..=1.0),
    )
    .try_normalize()
    .unwrap_or(Vec3::Y);
    let angle = rng.random_range(-self.max_rotation..=self.max_rotation);
    let rotation = Mat3::from_quat(Quat::from_axis_angle(axis, angle));

    Obb {
      center: obb.center + offset,
      axes: rotation * obb.axes,
      half_extents: obb.half_extents,
    }
  }
}

#[cfg(test)]
#[path = "obb_test.rs"]
mod obb_test;
