//! Tile locations and the per-instance layout table.
//!
//! Every ptex face of a mesh instance owns one entry in a
//! [`TileLayoutTable`]. Entries start at the unallocated sentinel and are
//! lazily populated when an allocator hands the tile a concrete spot in the
//! backing texture array.

use crate::constants::UNALLOCATED_PAGE;

/// Concrete location of a tile inside the backing texture array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileLocation {
  /// Texture-array slice holding the tile.
  pub page: u16,

  /// Texel offset of the tile block within the page (includes the overlap
  /// border).
  pub u: u16,
  pub v: u16,

  /// log2 of the interior tile edge length in texels.
  pub size_log2: u8,

  /// Mipmap level. Always 0 - tile mipmaps are not provisioned.
  pub mip_level: u8,
}

impl TileLocation {
  /// Sentinel value for a tile with no resident allocation.
  pub const UNALLOCATED: Self = Self {
    page: UNALLOCATED_PAGE,
    u: 0,
    v: 0,
    size_log2: 0,
    mip_level: 0,
  };

  /// True once an allocator has assigned this tile a page location.
  #[inline]
  pub fn is_allocated(&self) -> bool {
    self.page != UNALLOCATED_PAGE
  }
}

impl Default for TileLocation {
  fn default() -> Self {
    Self::UNALLOCATED
  }
}

/// Per-instance mapping from tile id (ptex face index) to tile location.
///
/// Invariant: an entry reads as [`TileLocation::UNALLOCATED`] until an
/// allocator writes it, and reads as the sentinel again after deallocation.
#[derive(Clone, Debug)]
pub struct TileLayoutTable {
  entries: Vec<TileLocation>,
}

impl TileLayoutTable {
  /// Create a layout table for a mesh with `num_tiles` ptex faces.
  /// All entries start unallocated.
  pub fn new(num_tiles: usize) -> Self {
    Self {
      entries: vec![TileLocation::UNALLOCATED; num_tiles],
    }
  }

  /// Number of tiles (ptex faces) covered by this table.
  #[inline]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Location of tile `id`.
  #[inline]
  pub fn get(&self, id: usize) -> TileLocation {
    self.entries[id]
  }

  /// Overwrite the location of tile `id`.
  #[inline]
  pub fn set(&mut self, id: usize, location: TileLocation) {
    self.entries[id] = location;
  }

  /// Reset tile `id` back to the unallocated sentinel.
  #[inline]
  pub fn clear(&mut self, id: usize) {
    self.entries[id] = TileLocation::UNALLOCATED;
  }

  /// Count of tiles that currently hold a resident allocation.
  pub fn allocated_count(&self) -> usize {
    self.entries.iter().filter(|e| e.is_allocated()).count()
  }

  /// Iterate over (tile id, location) pairs.
  pub fn iter(&self) -> impl Iterator<Item = (usize, TileLocation)> + '_ {
    self.entries.iter().copied().enumerate()
  }
}
