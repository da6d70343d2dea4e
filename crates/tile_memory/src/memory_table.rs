//! Backing-store provisioning: the slot -> (page, u, v) table.
//!
//! The tile texture array is carved into fixed-size blocks (tile plus
//! overlap border) laid out row-major across pages. The table maps a free
//! stack slot index to its concrete block and is built once, up front; it
//! is never written again (stack reuse hands out previously-built
//! locations, it does not rebuild them).
//!
//! Provisioning failures are configuration errors surfaced as typed
//! results at construction time, not process aborts.

use thiserror::Error;

use crate::constants::TILE_BORDER_TEXELS;
use crate::layout::TileLocation;

/// Device capabilities the provisioning math must respect.
#[derive(Clone, Copy, Debug)]
pub struct DeviceLimits {
  /// Maximum width/height of a 2D texture, in texels.
  pub max_texture_dim: u32,

  /// Maximum number of slices in a 2D texture array.
  pub max_array_layers: u32,

  /// Maximum size of a single resource, in bytes.
  pub max_resource_bytes: u64,
}

impl Default for DeviceLimits {
  /// Feature level 11.0 class hardware.
  fn default() -> Self {
    Self {
      max_texture_dim: 16384,
      max_array_layers: 2048,
      max_resource_bytes: 1 << 31,
    }
  }
}

/// Requested shape of a tile texture array.
#[derive(Clone, Copy, Debug)]
pub struct TileTextureDesc {
  /// Number of tiles the pool must hold.
  pub num_tiles: u32,

  /// Interior tile edge length in texels. Must be a power of two.
  pub tile_size: u32,

  /// Whether tiles carry the 1-texel overlap border. Only `true` is
  /// provisioned.
  pub overlap: bool,

  /// Mip levels per tile. Only 1 is provisioned.
  pub mip_levels: u32,

  /// Bytes per texel of the backing format (4 for both R32_FLOAT
  /// displacement and RGBA8 color).
  pub bytes_per_texel: u32,
}

/// Why provisioning was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProvisionError {
  #[error("tiles without an overlap border are not supported")]
  NoOverlapUnsupported,

  #[error("tile mipmaps are not supported (requested {0} levels)")]
  MipmapsUnsupported(u32),

  #[error("tile size {0} is not a power of two")]
  TileSizeNotPowerOfTwo(u32),

  #[error("tile size {tile_size} (+{border} border) exceeds max texture dimension {max_dim}")]
  TileTooLarge {
    tile_size: u32,
    border: u32,
    max_dim: u32,
  },

  #[error("pool needs {pages} pages but the device caps arrays at {max_layers} slices")]
  TooManyPages { pages: u32, max_layers: u32 },

  #[error("pool needs {requested} bytes but the device caps resources at {limit} bytes")]
  ResourceTooLarge { requested: u64, limit: u64 },
}

/// Immutable slot -> location table plus the page geometry it was built
/// from.
#[derive(Clone, Debug)]
pub struct TileMemoryTable {
  locations: Vec<TileLocation>,
  tile_size: u32,
  padded_tile_size: u32,
  tiles_per_row: u32,
  tiles_per_col: u32,
  pages: u32,
  page_bytes: u64,
}

impl TileMemoryTable {
  /// Build the table by raster-scanning pages in row-major order until
  /// `num_tiles` entries are emitted.
  pub fn build(desc: &TileTextureDesc, limits: &DeviceLimits) -> Result<Self, ProvisionError> {
    if !desc.overlap {
      return Err(ProvisionError::NoOverlapUnsupported);
    }
    if desc.mip_levels > 1 {
      return Err(ProvisionError::MipmapsUnsupported(desc.mip_levels));
    }
    if !desc.tile_size.is_power_of_two() {
      return Err(ProvisionError::TileSizeNotPowerOfTwo(desc.tile_size));
    }

    let padded = desc.tile_size + 2 * TILE_BORDER_TEXELS;
    let tiles_per_row = limits.max_texture_dim / padded;
    let tiles_per_col = tiles_per_row;
    if tiles_per_row == 0 {
      return Err(ProvisionError::TileTooLarge {
        tile_size: desc.tile_size,
        border: TILE_BORDER_TEXELS,
        max_dim: limits.max_texture_dim,
      });
    }

    let tiles_per_page = tiles_per_row * tiles_per_col;
    let pages = desc.num_tiles.div_ceil(tiles_per_page).max(1);
    if pages > limits.max_array_layers {
      return Err(ProvisionError::TooManyPages {
        pages,
        max_layers: limits.max_array_layers,
      });
    }

    let page_bytes =
      u64::from(limits.max_texture_dim) * u64::from(limits.max_texture_dim) * u64::from(desc.bytes_per_texel);
    let total_bytes = page_bytes * u64::from(pages);
    if total_bytes > limits.max_resource_bytes {
      return Err(ProvisionError::ResourceTooLarge {
        requested: total_bytes,
        limit: limits.max_resource_bytes,
      });
    }

    let size_log2 = desc.tile_size.trailing_zeros() as u8;
    let mut locations = Vec::with_capacity(desc.num_tiles as usize);
    'pages: for page in 0..pages {
      for row in 0..tiles_per_col {
        for col in 0..tiles_per_row {
          if locations.len() == desc.num_tiles as usize {
            break 'pages;
          }
          locations.push(TileLocation {
            page: page as u16,
            u: (col * padded) as u16,
            v: (row * padded) as u16,
            size_log2,
            mip_level: 0,
          });
        }
      }
    }

    Ok(Self {
      locations,
      tile_size: desc.tile_size,
      padded_tile_size: padded,
      tiles_per_row,
      tiles_per_col,
      pages,
      page_bytes,
    })
  }

  /// Location backing free-table slot `slot`.
  #[inline]
  pub fn location(&self, slot: u32) -> TileLocation {
    self.locations[slot as usize]
  }

  /// Number of slots (equals the pool capacity).
  #[inline]
  pub fn len(&self) -> usize {
    self.locations.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.locations.is_empty()
  }

  /// Number of texture-array pages backing the pool.
  #[inline]
  pub fn pages(&self) -> u32 {
    self.pages
  }

  /// Tile block edge length including the overlap border.
  #[inline]
  pub fn padded_tile_size(&self) -> u32 {
    self.padded_tile_size
  }

  /// Interior tile edge length.
  #[inline]
  pub fn tile_size(&self) -> u32 {
    self.tile_size
  }

  /// Tiles per page row (and per column; pages are square).
  #[inline]
  pub fn tiles_per_row(&self) -> u32 {
    self.tiles_per_row
  }

  #[inline]
  pub fn tiles_per_col(&self) -> u32 {
    self.tiles_per_col
  }

  /// Byte size of one page at the provisioned format.
  #[inline]
  pub fn page_bytes(&self) -> u64 {
    self.page_bytes
  }
}

#[cfg(test)]
#[path = "memory_table_test.rs"]
mod memory_table_test;
