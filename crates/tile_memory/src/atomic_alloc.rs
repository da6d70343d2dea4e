//! Single-pass alloc-only fast path.
//!
//! The displacement-deformation hot path only ever grows the resident
//! set, so it skips the four-pass scan entirely: every requesting tile
//! claims a slot with one atomic decrement. Which tiles win under
//! exhaustion is unordered (whoever claims first), matching the GPU
//! dispatch, but the number of winners is exact.

use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;

use crate::free_table::{FreeMemoryTable, ResourceClass};
use crate::layout::{TileLayoutTable, TileLocation};
use crate::memory_table::TileMemoryTable;

/// Result of one atomic-allocator pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllocationOutcome {
  /// Tile ids that received a new allocation, in tile order.
  pub allocated: Vec<u32>,

  /// Tiles that requested an allocation after the free table ran dry.
  pub out_of_memory: u32,
}

/// Alloc-only allocator: one atomic claim per requesting tile.
#[derive(Clone, Copy, Debug, Default)]
pub struct AtomicAllocator;

impl AtomicAllocator {
  /// Ensure every requested tile in `layout` has a resident allocation.
  ///
  /// Already-allocated tiles are left untouched; unrequested tiles are
  /// never freed here (that is the scan allocator's job).
  pub fn process(
    &self,
    requests: &[bool],
    layout: &mut TileLayoutTable,
    free: &FreeMemoryTable,
    class: ResourceClass,
    table: &TileMemoryTable,
  ) -> AllocationOutcome {
    assert_eq!(
      requests.len(),
      layout.len(),
      "request array length must match the layout table"
    );

    let out_of_memory = AtomicU32::new(0);

    // Parallel claim phase (the dispatch), sequential commit below.
    let claims: Vec<(u32, TileLocation)> = requests
      .par_iter()
      .enumerate()
      .filter_map(|(id, &wanted)| {
        if !wanted || layout.get(id).is_allocated() {
          return None;
        }
        match free.claim(class) {
          Some(slot) => Some((id as u32, table.location(slot))),
          None => {
            out_of_memory.fetch_add(1, Ordering::Relaxed);
            None
          }
        }
      })
      .collect();

    let mut outcome = AllocationOutcome {
      allocated: Vec::with_capacity(claims.len()),
      out_of_memory: out_of_memory.into_inner(),
    };
    for (id, location) in claims {
      layout.set(id as usize, location);
      outcome.allocated.push(id);
    }

    outcome
  }
}

#[cfg(test)]
#[path = "atomic_alloc_test.rs"]
mod atomic_alloc_test;
