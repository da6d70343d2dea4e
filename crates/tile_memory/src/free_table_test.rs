use std::sync::Arc;

use super::*;

#[test]
fn test_new_table_is_full() {
  let table = FreeMemoryTable::new(FreeTableConfig {
    displacement: 100,
    color: 50,
    particles: 10,
  });
  assert_eq!(table.available(ResourceClass::Displacement), 100);
  assert_eq!(table.available(ResourceClass::Color), 50);
  assert_eq!(table.available(ResourceClass::Particles), 10);
  assert_eq!(table.capacity(ResourceClass::Displacement), 100);
}

#[test]
fn test_claim_decrements_stack_top() {
  let table = FreeMemoryTable::new(FreeTableConfig {
    displacement: 3,
    ..Default::default()
  });

  // Stack semantics: claims come off the top, downward.
  assert_eq!(table.claim(ResourceClass::Displacement), Some(2));
  assert_eq!(table.claim(ResourceClass::Displacement), Some(1));
  assert_eq!(table.claim(ResourceClass::Displacement), Some(0));
  assert_eq!(table.claim(ResourceClass::Displacement), None);
  assert_eq!(table.available(ResourceClass::Displacement), 0);
}

#[test]
fn test_claim_release_roundtrip() {
  let table = FreeMemoryTable::new(FreeTableConfig {
    color: 8,
    ..Default::default()
  });

  table.claim(ResourceClass::Color).unwrap();
  table.claim(ResourceClass::Color).unwrap();
  assert_eq!(table.available(ResourceClass::Color), 6);

  table.release(ResourceClass::Color, 2);
  assert_eq!(table.available(ResourceClass::Color), 8);
}

#[test]
fn test_classes_are_independent() {
  let table = FreeMemoryTable::new(FreeTableConfig {
    displacement: 4,
    color: 4,
    particles: 4,
  });

  table.claim(ResourceClass::Displacement).unwrap();
  assert_eq!(table.available(ResourceClass::Displacement), 3);
  assert_eq!(table.available(ResourceClass::Color), 4);
  assert_eq!(table.available(ResourceClass::Particles), 4);
}

#[test]
fn test_batch_claim_full() {
  let table = FreeMemoryTable::new(FreeTableConfig {
    displacement: 10,
    ..Default::default()
  });

  let claim = table.claim_batch(ResourceClass::Displacement, 4);
  assert_eq!(claim.claimed, 4);
  assert_eq!(claim.base, 6);
  assert_eq!(table.available(ResourceClass::Displacement), 6);

  // Rank 0 gets the previous stack top, matching per-thread decrements.
  assert_eq!(claim.slot(0), 9);
  assert_eq!(claim.slot(3), 6);
}

#[test]
fn test_batch_claim_partial_on_exhaustion() {
  let table = FreeMemoryTable::new(FreeTableConfig {
    displacement: 3,
    ..Default::default()
  });

  let claim = table.claim_batch(ResourceClass::Displacement, 5);
  assert_eq!(claim.claimed, 3);
  assert_eq!(claim.base, 0);
  // The stack pointer never goes below zero.
  assert_eq!(table.available(ResourceClass::Displacement), 0);

  let empty = table.claim_batch(ResourceClass::Displacement, 5);
  assert_eq!(empty.claimed, 0);
}

#[test]
fn test_exact_capacity_claim() {
  // Requesting exactly max_loc slots succeeds and leaves cur_loc == 0.
  let table = FreeMemoryTable::new(FreeTableConfig {
    displacement: 7,
    ..Default::default()
  });
  let claim = table.claim_batch(ResourceClass::Displacement, 7);
  assert_eq!(claim.claimed, 7);
  assert_eq!(table.available(ResourceClass::Displacement), 0);
}

#[test]
fn test_concurrent_claims_are_unique() {
  use rayon::prelude::*;

  let table = Arc::new(FreeMemoryTable::new(FreeTableConfig {
    displacement: 1000,
    ..Default::default()
  }));

  // 1500 concurrent claimants against 1000 slots: exactly 1000 must
  // succeed and every slot index must be unique.
  let slots: Vec<Option<u32>> = (0..1500u32)
    .into_par_iter()
    .map(|_| table.claim(ResourceClass::Displacement))
    .collect();

  let mut claimed: Vec<u32> = slots.into_iter().flatten().collect();
  assert_eq!(claimed.len(), 1000);
  claimed.sort_unstable();
  claimed.dedup();
  assert_eq!(claimed.len(), 1000);
  assert_eq!(table.available(ResourceClass::Displacement), 0);
}
