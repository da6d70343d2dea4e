//! The tile memory manager service object.
//!
//! Owns the process-wide free table and the per-class slot -> location
//! tables, and fronts both allocator variants. Constructed once at scene
//! load and passed by reference to whoever needs tile backing storage -
//! there is no global instance.
//!
//! Path selection:
//! - displacement (deformation hot path): alloc-only atomic fast path
//! - color (paint workflows): scan path, alloc + dealloc in one pass

use crate::atomic_alloc::{AllocationOutcome, AtomicAllocator};
use crate::free_table::{FreeMemoryTable, FreeTableConfig, ResourceClass};
use crate::layout::TileLayoutTable;
use crate::memory_table::{DeviceLimits, ProvisionError, TileMemoryTable, TileTextureDesc};
use crate::scan_alloc::{ScanAllocator, ScanOutcome};

/// Pool capacities and tile shapes for one manager instance.
#[derive(Clone, Copy, Debug)]
pub struct MemoryConfig {
  /// Displacement tile pool capacity.
  pub displacement_tiles: u32,

  /// Interior edge length of a displacement tile, in texels.
  pub displacement_tile_size: u32,

  /// Color tile pool capacity.
  pub color_tiles: u32,

  /// Interior edge length of a color tile, in texels.
  pub color_tile_size: u32,

  /// Sculpting particle slot capacity.
  pub particle_slots: u32,
}

impl Default for MemoryConfig {
  fn default() -> Self {
    Self {
      displacement_tiles: 8192,
      displacement_tile_size: 128,
      color_tiles: 8192,
      color_tile_size: 128,
      particle_slots: 1 << 16,
    }
  }
}

/// Free/capacity snapshot of one resource class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassState {
  pub capacity: u32,
  pub available: u32,
}

impl ClassState {
  #[inline]
  pub fn in_use(&self) -> u32 {
    self.capacity - self.available
  }
}

/// Snapshot of all three classes, the diagnostic counterpart of the
/// original staged read-back path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryTableState {
  pub displacement: ClassState,
  pub color: ClassState,
  pub particles: ClassState,
}

/// Tile memory manager: free table + per-class memory tables + allocators.
#[derive(Debug)]
pub struct MemoryManager {
  free: FreeMemoryTable,
  displacement_table: TileMemoryTable,
  color_table: TileMemoryTable,
  atomic: AtomicAllocator,
  scan: ScanAllocator,
}

impl MemoryManager {
  /// Provision both tile pools against the device limits.
  ///
  /// Oversized or unsupported configurations come back as
  /// [`ProvisionError`] so callers can fail scene load cleanly.
  pub fn new(config: &MemoryConfig, limits: &DeviceLimits) -> Result<Self, ProvisionError> {
    // R32_FLOAT scalar height.
    let displacement_table = TileMemoryTable::build(
      &TileTextureDesc {
        num_tiles: config.displacement_tiles,
        tile_size: config.displacement_tile_size,
        overlap: true,
        mip_levels: 1,
        bytes_per_texel: 4,
      },
      limits,
    )?;
    // RGBA8.
    let color_table = TileMemoryTable::build(
      &TileTextureDesc {
        num_tiles: config.color_tiles,
        tile_size: config.color_tile_size,
        overlap: true,
        mip_levels: 1,
        bytes_per_texel: 4,
      },
      limits,
    )?;

    Ok(Self {
      free: FreeMemoryTable::new(FreeTableConfig {
        displacement: config.displacement_tiles,
        color: config.color_tiles,
        particles: config.particle_slots,
      }),
      displacement_table,
      color_table,
      atomic: AtomicAllocator,
      scan: ScanAllocator::default(),
    })
  }

  /// Ensure backing storage for every requested displacement tile.
  ///
  /// Alloc-only atomic fast path; runs once per deformation batch before
  /// the deformation kernel writes.
  pub fn manage_displacement_tiles(
    &self,
    layout: &mut TileLayoutTable,
    requests: &[bool],
  ) -> AllocationOutcome {
    let outcome = self.atomic.process(
      requests,
      layout,
      &self.free,
      ResourceClass::Displacement,
      &self.displacement_table,
    );
    #[cfg(feature = "tracing")]
    tracing::trace!(
      allocated = outcome.allocated.len(),
      out_of_memory = outcome.out_of_memory,
      "displacement tile allocation"
    );
    outcome
  }

  /// Reconcile color tile residency against `requests`, allocating and
  /// deallocating in one scan pass.
  pub fn manage_color_tiles(
    &mut self,
    layout: &mut TileLayoutTable,
    requests: &[bool],
  ) -> ScanOutcome {
    let outcome = self.scan.process(
      requests,
      layout,
      &self.free,
      ResourceClass::Color,
      &self.color_table,
    );
    #[cfg(feature = "tracing")]
    tracing::trace!(
      allocated = outcome.allocated.len(),
      deallocated = outcome.deallocated.len(),
      out_of_memory = outcome.out_of_memory,
      "color tile scan allocation"
    );
    outcome
  }

  /// Claim up to `count` particle slots; returns the number claimed.
  pub fn claim_particles(&self, count: u32) -> u32 {
    self
      .free
      .claim_batch(ResourceClass::Particles, count)
      .claimed
  }

  /// Return particle slots to the pool.
  pub fn release_particles(&self, count: u32) {
    self.free.release(ResourceClass::Particles, count);
  }

  /// Snapshot free/capacity counts for all classes and log them.
  pub fn table_state(&self) -> MemoryTableState {
    let state = MemoryTableState {
      displacement: self.class_state(ResourceClass::Displacement),
      color: self.class_state(ResourceClass::Color),
      particles: self.class_state(ResourceClass::Particles),
    };
    #[cfg(feature = "tracing")]
    tracing::debug!(
      displacement_in_use = state.displacement.in_use(),
      displacement_capacity = state.displacement.capacity,
      color_in_use = state.color.in_use(),
      color_capacity = state.color.capacity,
      particles_in_use = state.particles.in_use(),
      "memory table state"
    );
    state
  }

  fn class_state(&self, class: ResourceClass) -> ClassState {
    ClassState {
      capacity: self.free.capacity(class),
      available: self.free.available(class),
    }
  }

  /// The slot -> location table backing displacement tiles.
  #[inline]
  pub fn displacement_table(&self) -> &TileMemoryTable {
    &self.displacement_table
  }

  /// The slot -> location table backing color tiles.
  #[inline]
  pub fn color_table(&self) -> &TileMemoryTable {
    &self.color_table
  }

  /// The shared free table (mainly for tests and diagnostics).
  #[inline]
  pub fn free_table(&self) -> &FreeMemoryTable {
    &self.free
  }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod manager_test;
