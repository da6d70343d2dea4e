//! tile_memory - per-patch texture tile allocation for sculpting meshes
//!
//! Subdivision-surface sculpting stores displacement and paint data in
//! fixed-size texture tiles, one per ptex face, resident in a large
//! texture array. Tiles come and go every frame as brushes and
//! deformations touch different parts of the surface, so allocation has
//! to be batched and cheap.
//!
//! This crate is the CPU-verifiable core of that allocator:
//!
//! - **TileMemoryTable**: immutable slot -> (page, u, v) table built once
//!   by raster-scanning the texture-array pages
//! - **FreeMemoryTable**: per-class stack pointers mutated only through
//!   atomics
//! - **ScanAllocator**: batched alloc + dealloc compacted by a
//!   work-efficient four-pass prefix scan
//! - **AtomicAllocator**: alloc-only fast path for the deformation hot
//!   loop
//! - **MemoryManager**: the dependency-injected service object tying the
//!   pieces together
//!
//! The scan primitive in [`scan`] is domain-independent and mirrors the
//! four GPU dispatches pass for pass, so the compute-shader port can be
//! validated against it.
//!
//! # Example
//!
//! ```
//! use tile_memory::{DeviceLimits, MemoryConfig, MemoryManager, TileLayoutTable};
//!
//! let manager = MemoryManager::new(&MemoryConfig::default(), &DeviceLimits::default()).unwrap();
//!
//! // One layout table per mesh instance, one entry per ptex face.
//! let mut layout = TileLayoutTable::new(1000);
//!
//! // Tiles touched by this frame's deformation batch.
//! let requests = vec![true; 1000];
//! let outcome = manager.manage_displacement_tiles(&mut layout, &requests);
//! assert_eq!(outcome.allocated.len(), 1000);
//! ```

pub mod constants;

pub mod layout;
pub use layout::{TileLayoutTable, TileLocation};

pub mod free_table;
pub use free_table::{BatchClaim, FreeMemoryTable, FreeTableConfig, ResourceClass};

pub mod memory_table;
pub use memory_table::{DeviceLimits, ProvisionError, TileMemoryTable, TileTextureDesc};

pub mod scan;
pub use scan::{PrefixScan, ScanBuffers};

pub mod scan_alloc;
pub use scan_alloc::{ScanAllocator, ScanOutcome};

pub mod atomic_alloc;
pub use atomic_alloc::{AllocationOutcome, AtomicAllocator};

pub mod manager;
pub use manager::{ClassState, MemoryConfig, MemoryManager, MemoryTableState};
