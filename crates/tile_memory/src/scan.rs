//! Work-efficient parallel prefix sum over fixed-size buckets.
//!
//! CPU rendition of the four-dispatch GPU scan, kept domain-independent so
//! allocation compaction can be verified here before the compute-shader
//! port. Each pass corresponds to one dispatch and must complete before
//! the next pass reads its output; within a pass, buckets are independent
//! and run in parallel via rayon (the SIMT stand-in).
//!
//! ```text
//! pass 1   scan_buckets        per-bucket inclusive scan + bucket totals
//! pass 2   scan_bucket_totals  per-block exclusive scan of bucket totals
//! pass 3   scan_block_totals   exclusive scan of block totals (single group)
//! pass 4   apply_offsets       add bucket/block offsets back into pass 1
//! ```
//!
//! Pass 3 runs as a single group, so the scan handles at most
//! `bucket_size^2` buckets (`bucket_size^3` elements). With the default
//! bucket size of 512 that is far beyond any tile count in practice.

use rayon::prelude::*;

use crate::constants::SCAN_BUCKET_SIZE;

/// Intermediate buffers of one scan, mirroring the GPU-side scratch
/// buffers. Reusable across runs to avoid reallocation.
#[derive(Clone, Debug, Default)]
pub struct ScanBuffers {
  /// Per-element scan. After pass 1: inclusive within its bucket.
  /// After pass 4: globally inclusive.
  pub element_scan: Vec<u32>,

  /// Per-bucket totals written by pass 1.
  pub bucket_totals: Vec<u32>,

  /// Per-bucket exclusive offsets within their block, written by pass 2.
  pub bucket_offsets: Vec<u32>,

  /// Per-block totals written by pass 2.
  pub block_totals: Vec<u32>,

  /// Per-block exclusive global offsets written by pass 3.
  pub block_offsets: Vec<u32>,
}

/// Work-efficient prefix sum, parameterized by bucket size.
#[derive(Clone, Copy, Debug)]
pub struct PrefixScan {
  bucket_size: usize,
}

impl Default for PrefixScan {
  fn default() -> Self {
    Self::new(SCAN_BUCKET_SIZE)
  }
}

impl PrefixScan {
  /// Create a scan with the given bucket size (GPU thread-group size).
  pub fn new(bucket_size: usize) -> Self {
    assert!(bucket_size > 0, "bucket size must be positive");
    Self { bucket_size }
  }

  #[inline]
  pub fn bucket_size(&self) -> usize {
    self.bucket_size
  }

  /// Run all four passes. Returns the total sum; the globally inclusive
  /// per-element scan is left in `buffers.element_scan`.
  pub fn scan(&self, input: &[u32], buffers: &mut ScanBuffers) -> u32 {
    self.scan_buckets(input, buffers);
    self.scan_bucket_totals(buffers);
    let total = self.scan_block_totals(buffers);
    self.apply_offsets(buffers);
    total
  }

  /// Pass 1: inclusive scan within each bucket, plus one total per bucket.
  pub fn scan_buckets(&self, input: &[u32], buffers: &mut ScanBuffers) {
    let bs = self.bucket_size;
    let num_buckets = input.len().div_ceil(bs).max(1);

    buffers.element_scan.resize(input.len(), 0);
    buffers.bucket_totals.resize(num_buckets, 0);

    input
      .par_chunks(bs)
      .zip(buffers.element_scan.par_chunks_mut(bs))
      .zip(buffers.bucket_totals.par_iter_mut())
      .for_each(|((src, dst), total)| {
        let mut sum = 0u32;
        for (s, d) in src.iter().zip(dst.iter_mut()) {
          sum += s;
          *d = sum;
        }
        *total = sum;
      });

    if input.is_empty() {
      buffers.bucket_totals[0] = 0;
    }
  }

  /// Pass 2: exclusive scan of bucket totals within each block of
  /// `bucket_size` buckets, plus one total per block.
  pub fn scan_bucket_totals(&self, buffers: &mut ScanBuffers) {
    let bs = self.bucket_size;
    let num_buckets = buffers.bucket_totals.len();
    let num_blocks = num_buckets.div_ceil(bs).max(1);

    buffers.bucket_offsets.resize(num_buckets, 0);
    buffers.block_totals.resize(num_blocks, 0);

    buffers
      .bucket_totals
      .par_chunks(bs)
      .zip(buffers.bucket_offsets.par_chunks_mut(bs))
      .zip(buffers.block_totals.par_iter_mut())
      .for_each(|((totals, offsets), block_total)| {
        let mut sum = 0u32;
        for (t, o) in totals.iter().zip(offsets.iter_mut()) {
          *o = sum;
          sum += t;
        }
        *block_total = sum;
      });
  }

  /// Pass 3: exclusive scan of block totals. Single group; asserts the
  /// bucket-count ceiling that the GPU port inherits.
  pub fn scan_block_totals(&self, buffers: &mut ScanBuffers) -> u32 {
    debug_assert!(
      buffers.bucket_totals.len() <= self.bucket_size * self.bucket_size,
      "scan supports at most bucket_size^2 buckets"
    );

    let num_blocks = buffers.block_totals.len();
    buffers.block_offsets.resize(num_blocks, 0);

    let mut sum = 0u32;
    for i in 0..num_blocks {
      buffers.block_offsets[i] = sum;
      sum += buffers.block_totals[i];
    }
    sum
  }

  /// Pass 4: add each bucket's block and in-block offsets back into the
  /// per-bucket scans, yielding the globally inclusive scan.
  pub fn apply_offsets(&self, buffers: &mut ScanBuffers) {
    let bs = self.bucket_size;
    let bucket_offsets = &buffers.bucket_offsets;
    let block_offsets = &buffers.block_offsets;

    buffers
      .element_scan
      .par_chunks_mut(bs)
      .enumerate()
      .for_each(|(bucket, chunk)| {
        let offset = bucket_offsets[bucket] + block_offsets[bucket / bs];
        if offset != 0 {
          for v in chunk {
            *v += offset;
          }
        }
      });
  }
}

/// Exclusive rank of element `i` given its inclusive scan and raw input.
#[inline]
pub fn exclusive_rank(inclusive: &[u32], input: &[u32], i: usize) -> u32 {
  inclusive[i] - input[i]
}

#[cfg(test)]
#[path = "scan_test.rs"]
mod scan_test;
