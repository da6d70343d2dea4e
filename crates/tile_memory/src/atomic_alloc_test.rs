use std::collections::HashSet;

use super::*;
use crate::free_table::FreeTableConfig;
use crate::memory_table::{DeviceLimits, TileTextureDesc};

const CLASS: ResourceClass = ResourceClass::Displacement;

fn fixture(capacity: u32, num_tiles: usize) -> (FreeMemoryTable, TileMemoryTable, TileLayoutTable) {
  let free = FreeMemoryTable::new(FreeTableConfig {
    displacement: capacity,
    ..Default::default()
  });
  let table = TileMemoryTable::build(
    &TileTextureDesc {
      num_tiles: capacity,
      tile_size: 128,
      overlap: true,
      mip_levels: 1,
      bytes_per_texel: 4,
    },
    &DeviceLimits::default(),
  )
  .unwrap();
  (free, table, TileLayoutTable::new(num_tiles))
}

#[test]
fn test_allocates_requested_tiles() {
  let (free, table, mut layout) = fixture(32, 8);
  let alloc = AtomicAllocator;

  let requests = [true, false, true, false, true, false, false, true];
  let outcome = alloc.process(&requests, &mut layout, &free, CLASS, &table);

  assert_eq!(outcome.allocated, vec![0, 2, 4, 7]);
  assert_eq!(outcome.out_of_memory, 0);
  assert_eq!(free.available(CLASS), 28);
  assert_eq!(layout.allocated_count(), 4);

  let mut seen = HashSet::new();
  for &id in &outcome.allocated {
    let loc = layout.get(id as usize);
    assert!(loc.is_allocated());
    assert!(seen.insert((loc.page, loc.u, loc.v)));
  }
}

#[test]
fn test_existing_allocations_left_untouched() {
  let (free, table, mut layout) = fixture(32, 4);
  let alloc = AtomicAllocator;

  alloc.process(&[true, true, false, false], &mut layout, &free, CLASS, &table);
  let loc0 = layout.get(0);
  let loc1 = layout.get(1);

  // Tile 1 no longer requested: the fast path never deallocates.
  let outcome = alloc.process(&[true, false, true, false], &mut layout, &free, CLASS, &table);
  assert_eq!(outcome.allocated, vec![2]);
  assert_eq!(layout.get(0), loc0);
  assert_eq!(layout.get(1), loc1);
  assert_eq!(layout.allocated_count(), 3);
}

#[test]
fn test_exhaustion_reports_exact_counts() {
  let (free, table, mut layout) = fixture(5, 12);
  let alloc = AtomicAllocator;

  let outcome = alloc.process(&[true; 12], &mut layout, &free, CLASS, &table);

  // Which tiles win is unordered, but the counts are exact and the free
  // table never underflows.
  assert_eq!(outcome.allocated.len(), 5);
  assert_eq!(outcome.out_of_memory, 7);
  assert_eq!(free.available(CLASS), 0);
  assert_eq!(layout.allocated_count(), 5);

  let mut seen = HashSet::new();
  for &id in &outcome.allocated {
    let loc = layout.get(id as usize);
    assert!(seen.insert((loc.page, loc.u, loc.v)));
  }
}

#[test]
fn test_repeat_pass_is_idempotent() {
  let (free, table, mut layout) = fixture(32, 6);
  let alloc = AtomicAllocator;

  let requests = [true, true, true, false, false, false];
  alloc.process(&requests, &mut layout, &free, CLASS, &table);
  let available = free.available(CLASS);
  let before: Vec<_> = (0..6).map(|i| layout.get(i)).collect();

  let outcome = alloc.process(&requests, &mut layout, &free, CLASS, &table);
  assert!(outcome.allocated.is_empty());
  assert_eq!(free.available(CLASS), available);
  let after: Vec<_> = (0..6).map(|i| layout.get(i)).collect();
  assert_eq!(before, after);
}

#[test]
fn test_large_parallel_allocation() {
  let (free, table, mut layout) = fixture(2048, 2048);
  let alloc = AtomicAllocator;

  let outcome = alloc.process(&vec![true; 2048], &mut layout, &free, CLASS, &table);
  assert_eq!(outcome.allocated.len(), 2048);
  assert_eq!(free.available(CLASS), 0);

  // Every slot in the pool was handed out exactly once.
  let mut seen = HashSet::new();
  for (_, loc) in layout.iter() {
    assert!(loc.is_allocated());
    assert!(seen.insert((loc.page, loc.u, loc.v)));
  }
  assert_eq!(seen.len(), 2048);
}
