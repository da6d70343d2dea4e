//! Scan-based batched tile allocation and deallocation.
//!
//! Consumes a per-tile residency request array (one entry per ptex face,
//! `true` = "needs a resident tile this frame") and reconciles it against
//! the instance's layout table in one batched pass:
//!
//! - requested + unallocated  -> claim a slot, write the location
//! - unrequested + allocated  -> clear the location, return the slot
//!
//! The prefix scan assigns every allocating tile a dense rank, which makes
//! slot assignment deterministic on the CPU (the GPU down-sweep claims
//! slots with per-thread atomics instead; order within a dispatch is
//! undefined there, and tolerated). Both compacted index lists come back
//! ordered by tile id.
//!
//! Used for color/paint workflows where a moving brush both allocates and
//! frees tiles in the same frame. The alloc-only hot path lives in
//! [`crate::atomic_alloc`].

use crate::free_table::{FreeMemoryTable, ResourceClass};
use crate::layout::TileLayoutTable;
use crate::memory_table::TileMemoryTable;
use crate::scan::{exclusive_rank, PrefixScan, ScanBuffers};

/// Result of one scan-allocator pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanOutcome {
  /// Tile ids that received a new allocation, compacted, in tile order.
  pub allocated: Vec<u32>,

  /// Tile ids whose allocation was returned, compacted, in tile order.
  pub deallocated: Vec<u32>,

  /// Tiles that requested an allocation after the free table ran dry.
  /// They keep the unallocated sentinel.
  pub out_of_memory: u32,
}

/// Batched alloc/dealloc driven by the four-pass prefix scan.
#[derive(Debug)]
pub struct ScanAllocator {
  scan: PrefixScan,
  requests: Vec<u32>,
  buffers: ScanBuffers,
}

impl Default for ScanAllocator {
  fn default() -> Self {
    Self::new(PrefixScan::default())
  }
}

impl ScanAllocator {
  pub fn new(scan: PrefixScan) -> Self {
    Self {
      scan,
      requests: Vec::new(),
      buffers: ScanBuffers::default(),
    }
  }

  /// Reconcile `requests` against `layout`, claiming from and releasing to
  /// `free` in `class`, with locations drawn from `table`.
  ///
  /// `requests.len()` must equal `layout.len()`.
  pub fn process(
    &mut self,
    requests: &[bool],
    layout: &mut TileLayoutTable,
    free: &FreeMemoryTable,
    class: ResourceClass,
    table: &TileMemoryTable,
  ) -> ScanOutcome {
    assert_eq!(
      requests.len(),
      layout.len(),
      "request array length must match the layout table"
    );

    // Allocation-request array fed to the scan: 1 where the tile needs a
    // slot it does not yet have.
    self.requests.clear();
    self
      .requests
      .extend(requests.iter().enumerate().map(|(id, &wanted)| {
        (wanted && !layout.get(id).is_allocated()) as u32
      }));

    // Returns first. Allocation and deallocation share one dispatch on the
    // GPU, so slots freed this pass are claimable this pass.
    let mut outcome = ScanOutcome::default();
    for (id, &wanted) in requests.iter().enumerate() {
      if !wanted && layout.get(id).is_allocated() {
        layout.clear(id);
        outcome.deallocated.push(id as u32);
      }
    }
    if !outcome.deallocated.is_empty() {
      free.release(class, outcome.deallocated.len() as u32);
    }

    let alloc_count = self.scan.scan(&self.requests, &mut self.buffers);
    let claim = free.claim_batch(class, alloc_count);
    outcome.out_of_memory = alloc_count - claim.claimed;
    outcome.allocated.reserve(claim.claimed as usize);

    // Down-sweep: commit claims by scan rank. Tiles ranked past the claim
    // keep the sentinel and are reported, never silently dropped.
    for id in 0..self.requests.len() {
      if self.requests[id] != 0 {
        let rank = exclusive_rank(&self.buffers.element_scan, &self.requests, id);
        if rank < claim.claimed {
          layout.set(id, table.location(claim.slot(rank)));
          outcome.allocated.push(id as u32);
        }
      }
    }

    outcome
  }
}

#[cfg(test)]
#[path = "scan_alloc_test.rs"]
mod scan_alloc_test;
