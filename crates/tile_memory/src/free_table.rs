//! Process-wide free slot tracking per resource class.
//!
//! Each class is an independent stack allocator: `cur_loc` is the number of
//! slots still free, `max_loc` the capacity. Allocation decrements
//! `cur_loc`, deallocation increments it. All mutation goes through atomics
//! so concurrent claimants within one dispatch never hand out the same
//! slot.
//!
//! Exhaustion is explicit: a claim against an empty class reports failure
//! instead of letting the stack pointer underflow.

use std::sync::atomic::{AtomicU32, Ordering};

/// Resource classes tracked by the free table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceClass {
  /// Scalar-height displacement tiles.
  Displacement,

  /// RGBA8 paint/color tiles.
  Color,

  /// Sculpting particle slots.
  Particles,
}

impl ResourceClass {
  /// All classes, in table order.
  pub const ALL: [ResourceClass; 3] = [
    ResourceClass::Displacement,
    ResourceClass::Color,
    ResourceClass::Particles,
  ];

  #[inline]
  fn index(self) -> usize {
    match self {
      ResourceClass::Displacement => 0,
      ResourceClass::Color => 1,
      ResourceClass::Particles => 2,
    }
  }
}

/// Capacity per resource class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FreeTableConfig {
  pub displacement: u32,
  pub color: u32,
  pub particles: u32,
}

/// Result of a batched claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchClaim {
  /// New stack top after the claim. Claimed slots are
  /// `base..base + claimed`.
  pub base: u32,

  /// Number of slots actually claimed (`<=` the requested count).
  pub claimed: u32,
}

impl BatchClaim {
  /// Slot for the claimant ranked `rank` (0-based) within the batch.
  ///
  /// Matches the per-thread atomic-decrement order: rank 0 receives the
  /// previous stack top.
  #[inline]
  pub fn slot(&self, rank: u32) -> u32 {
    debug_assert!(rank < self.claimed);
    self.base + self.claimed - 1 - rank
  }
}

#[derive(Debug)]
struct ClassState {
  cur_loc: AtomicU32,
  max_loc: u32,
}

impl ClassState {
  fn new(capacity: u32) -> Self {
    Self {
      cur_loc: AtomicU32::new(capacity),
      max_loc: capacity,
    }
  }
}

/// Stack-pointer free table for all three resource classes.
#[derive(Debug)]
pub struct FreeMemoryTable {
  classes: [ClassState; 3],
}

impl FreeMemoryTable {
  pub fn new(config: FreeTableConfig) -> Self {
    Self {
      classes: [
        ClassState::new(config.displacement),
        ClassState::new(config.color),
        ClassState::new(config.particles),
      ],
    }
  }

  /// Claim a single slot, returning its index, or `None` when the class is
  /// exhausted.
  ///
  /// The checked compare-exchange keeps `cur_loc >= 0` even under
  /// concurrent claims.
  pub fn claim(&self, class: ResourceClass) -> Option<u32> {
    let state = &self.classes[class.index()];
    state
      .cur_loc
      .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| cur.checked_sub(1))
      .ok()
      .map(|prev| prev - 1)
  }

  /// Claim up to `count` slots in one atomic update.
  ///
  /// Used by the scan path where the total allocation count is known up
  /// front. Partial claims are reported through `BatchClaim::claimed`.
  pub fn claim_batch(&self, class: ResourceClass, count: u32) -> BatchClaim {
    let state = &self.classes[class.index()];
    let mut claimed = 0;
    let old = state
      .cur_loc
      .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
        claimed = count.min(cur);
        Some(cur - claimed)
      })
      .unwrap_or(0);
    BatchClaim {
      base: old - claimed,
      claimed,
    }
  }

  /// Return `count` slots to the class.
  ///
  /// Invariant: released slots must have been claimed; the table never
  /// grows past its capacity.
  pub fn release(&self, class: ResourceClass, count: u32) {
    let state = &self.classes[class.index()];
    let prev = state.cur_loc.fetch_add(count, Ordering::AcqRel);
    debug_assert!(
      prev + count <= state.max_loc,
      "released more slots than were claimed"
    );
  }

  /// Slots currently free in the class.
  #[inline]
  pub fn available(&self, class: ResourceClass) -> u32 {
    self.classes[class.index()].cur_loc.load(Ordering::Acquire)
  }

  /// Total capacity of the class.
  #[inline]
  pub fn capacity(&self, class: ResourceClass) -> u32 {
    self.classes[class.index()].max_loc
  }
}

#[cfg(test)]
#[path = "free_table_test.rs"]
mod free_table_test;
