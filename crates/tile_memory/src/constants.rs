//! Shared constants for tile memory layout and scan dispatch sizing.

/// Sentinel page index marking a tile that has no resident allocation.
pub const UNALLOCATED_PAGE: u16 = 0xFFFF;

/// Overlap border in texels on each side of a tile.
///
/// Tiles are stored with a 1-texel border so bilinear filtering across
/// ptex face edges never reads a neighboring tile's interior.
pub const TILE_BORDER_TEXELS: u32 = 1;

/// Elements per scan bucket. One bucket corresponds to one GPU thread
/// group in the compute-shader rendition of the scan.
pub const SCAN_BUCKET_SIZE: usize = 512;
