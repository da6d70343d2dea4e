//! Broad-phase pair filtering into the per-frame collision map.
//!
//! The physics broad phase reports overlapping body pairs; this module
//! keeps the pairs where exactly one side is deformable and computes the
//! OBB that voxelization will run inside. The map is transient: rebuilt
//! from scratch every frame, never carried across frames.

use std::collections::BTreeMap;

use rand::Rng;

use crate::obb::{JitterParams, Obb};
use crate::types::{BroadPhasePair, DeformableId, PenetratorId, PipelineError};

/// Uniform scale applied to collision OBBs so voxelization covers the
/// contact boundary without artifacts.
pub const COLLISION_OBB_GROW: f32 = 1.01;

/// Collision-map construction options.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionConfig {
  /// Use the penetrator's own OBB instead of clipping it against the
  /// deformable (OBB-only mode).
  pub obb_only: bool,

  /// Uniform scale-up applied to the resulting OBB.
  pub grow: f32,

  /// Optional per-frame random perturbation to decorrelate voxelization
  /// aliasing across frames.
  pub jitter: Option<JitterParams>,
}

impl Default for CollisionConfig {
  fn default() -> Self {
    Self {
      obb_only: false,
      grow: COLLISION_OBB_GROW,
      jitter: None,
    }
  }
}

/// Per-frame map: deformable -> (penetrator -> intersecting OBB).
///
/// Ordered maps keep per-frame iteration (and therefore batch
/// composition) deterministic.
pub type CollisionMap = BTreeMap<DeformableId, BTreeMap<PenetratorId, Obb>>;

/// Build the collision map from this frame's broad-phase pairs.
///
/// Pairs with no deformable side are skipped; pairs where both sides are
/// deformable are a configuration error ([`PipelineError::DeformablePair`]).
/// For each kept pair the voxelization OBB is the penetrator's OBB
/// clipped to the deformable (or taken whole in OBB-only mode), grown by
/// `config.grow`, and optionally jittered.
pub fn detect_deformable_collision_pairs<R: Rng>(
  pairs: &[BroadPhasePair],
  config: &CollisionConfig,
  rng: &mut R,
) -> Result<CollisionMap, PipelineError> {
  let mut map = CollisionMap::new();

  for pair in pairs {
    let (deformable, penetrator) = match (pair.a.deformable, pair.b.deformable) {
      (true, true) => {
        return Err(PipelineError::DeformablePair {
          a: pair.a.id,
          b: pair.b.id,
        })
      }
      (true, false) => (&pair.a, &pair.b),
      (false, true) => (&pair.b, &pair.a),
      (false, false) => continue,
    };

    let obb = if config.obb_only {
      penetrator.obb
    } else {
      match penetrator.obb.intersection_with(&deformable.obb) {
        Some(obb) => obb,
        // Broad phase can report pairs whose OBBs no longer overlap.
        None => continue,
      }
    };

    let mut obb = obb.grown(config.grow);
    if let Some(jitter) = &config.jitter {
      obb = jitter.apply(&obb, rng);
    }

    map
      .entry(DeformableId(deformable.id))
      .or_default()
      .insert(PenetratorId(penetrator.id), obb);
  }

  Ok(map)
}

#[cfg(test)]
#[path = "collision_test.rs"]
mod collision_test;
