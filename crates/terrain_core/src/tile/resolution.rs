//! Tile buffer sizing.
//!
//! ```text
//!   samples = ceil(extent / source_res)  (+1 when vertex sampled)
//!   image:   round up to a power of two, floor 4, then clamp to the
//!            largest power of two <= max_size
//!            res = extent / samples      (samples - 1 when vertex sampled)
//!   terrain: clamp to max_size, floor 2, no rounding
//!            res = extent / (samples - 1)
//! ```
//!
//! Imagery adds the vertex sample only for `Vector` tiles while terrain adds
//! it for anything but `Raster`, so the two disagree for `DataType::None`.
//! The difference is kept for compatibility with existing databases. The
//! height grid always stores vertices, so its resolution is the spacing the
//! grid is allocated with whatever the sample count rule was.

use super::DestinationTile;
use crate::constants::{MIN_IMAGE_SIZE, MIN_TERRAIN_SIZE};
use crate::types::{BufferSize, DataType, Resolution};

/// Full-resolution sample count along one axis.
#[inline]
fn samples_at_full_resolution(extent: f64, source_res: f64, vertex_sampled: bool) -> u32 {
  let n = (extent / source_res).ceil().max(0.0) as u32;
  if vertex_sampled {
    n + 1
  } else {
    n
  }
}

/// Smallest power of two that is at least `n`, starting from the floor.
#[inline]
fn round_up_to_power_of_two(n: u32) -> u32 {
  let mut size = MIN_IMAGE_SIZE;
  while size < n {
    size *= 2;
  }
  size
}

/// Largest power of two not above `max`, never below the floor.
#[inline]
fn power_of_two_cap(max: u32) -> u32 {
  let mut size = MIN_IMAGE_SIZE;
  while size.saturating_mul(2) <= max {
    size *= 2;
  }
  size
}

#[inline]
fn spacing(extent: f64, samples: u32, vertex_sampled: bool) -> f64 {
  if vertex_sampled {
    extent / samples.saturating_sub(1).max(1) as f64
  } else {
    extent / samples.max(1) as f64
  }
}

impl DestinationTile {
  /// Final image size and presented resolution of `layer`, None when no
  /// source resolution has been recorded for it.
  pub fn compute_image_resolution(&self, layer: usize, max_image_size: u32) -> Option<BufferSize> {
    let source_res = self.imagery.get(layer)?.max_source_resolution?;
    let vertex_sampled = self.data_type == DataType::Vector;
    let width = self.extents.width();
    let height = self.extents.height();

    let cap = power_of_two_cap(max_image_size);
    let num_columns = round_up_to_power_of_two(samples_at_full_resolution(width, source_res.x, vertex_sampled)).min(cap);
    let num_rows = round_up_to_power_of_two(samples_at_full_resolution(height, source_res.y, vertex_sampled)).min(cap);

    Some(BufferSize {
      num_columns,
      num_rows,
      resolution: Resolution::new(
        spacing(width, num_columns, vertex_sampled),
        spacing(height, num_rows, vertex_sampled),
      ),
    })
  }

  /// Final height-grid size and presented resolution, None without a
  /// terrain source.
  pub fn compute_terrain_resolution(&self, max_terrain_size: u32) -> Option<BufferSize> {
    let source_res = self.terrain_max_source_resolution?;
    let vertex_sampled = self.data_type != DataType::Raster;
    let width = self.extents.width();
    let height = self.extents.height();

    let num_columns = samples_at_full_resolution(width, source_res.x, vertex_sampled)
      .min(max_terrain_size)
      .max(MIN_TERRAIN_SIZE);
    let num_rows = samples_at_full_resolution(height, source_res.y, vertex_sampled)
      .min(max_terrain_size)
      .max(MIN_TERRAIN_SIZE);

    Some(BufferSize {
      num_columns,
      num_rows,
      resolution: Resolution::new(spacing(width, num_columns, true), spacing(height, num_rows, true)),
    })
  }
}

#[cfg(test)]
#[path = "resolution_test.rs"]
mod resolution_test;
