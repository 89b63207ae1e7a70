//! Core data types: sampling conventions, raster buffers and height grids.

use glam::{DVec2, Vec2};
use serde::{Deserialize, Serialize};

/// How samples of a dataset relate to its extents.
///
/// Every resolution and size computation in the crate branches on this:
/// raster samples cover cell areas (`extent / count`), vector samples sit on
/// grid vertices (`extent / (count - 1)`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
  /// Samples represent cell areas.
  #[default]
  Raster,
  /// Samples represent point locations.
  Vector,
  /// Unknown sampling; each call site picks its historical default.
  None,
}

/// Pixel layout of an [`ImageBuffer`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
  /// 8-bit red, green, blue.
  #[default]
  Rgb8,
  /// 8-bit red, green, blue, alpha.
  Rgba8,
  /// 8-bit single channel.
  Luminance8,
}

impl PixelFormat {
  /// Bytes per pixel.
  #[inline]
  pub fn bytes_per_pixel(self) -> usize {
    match self {
      PixelFormat::Rgb8 => 3,
      PixelFormat::Rgba8 => 4,
      PixelFormat::Luminance8 => 1,
    }
  }

  /// Only 8-bit RGB buffers take part in boundary equalization.
  #[inline]
  pub fn is_equalizable(self) -> bool {
    self == PixelFormat::Rgb8
  }
}

/// Sample spacing along each axis, in destination units per sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Resolution {
  pub x: f64,
  pub y: f64,
}

impl Resolution {
  pub fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }

  /// Keep the finer value on each axis.
  #[inline]
  pub fn min(self, other: Resolution) -> Self {
    Self {
      x: self.x.min(other.x),
      y: self.y.min(other.y),
    }
  }

  /// Both axes carry a usable (positive, finite) spacing.
  #[inline]
  pub fn is_valid(&self) -> bool {
    self.x > 0.0 && self.y > 0.0 && self.x.is_finite() && self.y.is_finite()
  }
}

/// Buffer dimensions together with the resolution they present.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BufferSize {
  pub num_columns: u32,
  pub num_rows: u32,
  pub resolution: Resolution,
}

// =============================================================================
// ImageBuffer
// =============================================================================

/// Owned 8-bit raster. Row 0 is the bottom (southern) edge.
#[derive(Clone, PartialEq)]
pub struct ImageBuffer {
  width: u32,
  height: u32,
  format: PixelFormat,
  data: Vec<u8>,
}

impl std::fmt::Debug for ImageBuffer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "ImageBuffer({}x{} {:?})", self.width, self.height, self.format)
  }
}

impl ImageBuffer {
  /// Allocate a buffer with every pixel set to `fill` (extra channels take
  /// the first value of `fill`, alpha is opaque).
  pub fn new(width: u32, height: u32, format: PixelFormat, fill: [u8; 3]) -> Self {
    let bpp = format.bytes_per_pixel();
    let mut data = Vec::with_capacity(width as usize * height as usize * bpp);
    for _ in 0..(width as usize * height as usize) {
      match format {
        PixelFormat::Rgb8 => data.extend_from_slice(&fill),
        PixelFormat::Rgba8 => data.extend_from_slice(&[fill[0], fill[1], fill[2], 255]),
        PixelFormat::Luminance8 => data.push(fill[0]),
      }
    }
    Self {
      width,
      height,
      format,
      data,
    }
  }

  /// Wrap existing pixel data.
  ///
  /// Returns None if the data length does not match the dimensions.
  pub fn from_raw(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Option<Self> {
    if data.len() != width as usize * height as usize * format.bytes_per_pixel() {
      return None;
    }
    Some(Self {
      width,
      height,
      format,
      data,
    })
  }

  #[inline]
  pub fn width(&self) -> u32 {
    self.width
  }

  #[inline]
  pub fn height(&self) -> u32 {
    self.height
  }

  #[inline]
  pub fn format(&self) -> PixelFormat {
    self.format
  }

  /// Raw pixel bytes, bottom row first.
  pub fn as_raw(&self) -> &[u8] {
    &self.data
  }

  #[inline]
  fn offset(&self, x: u32, y: u32) -> usize {
    (y as usize * self.width as usize + x as usize) * self.format.bytes_per_pixel()
  }

  /// Pixel channels at column `x`, row `y`.
  #[inline]
  pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
    let start = self.offset(x, y);
    &self.data[start..start + self.format.bytes_per_pixel()]
  }

  /// Mutable pixel channels at column `x`, row `y`.
  #[inline]
  pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
    let start = self.offset(x, y);
    let bpp = self.format.bytes_per_pixel();
    &mut self.data[start..start + bpp]
  }

  /// Copy the first three channels of a pixel.
  #[inline]
  pub fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
    let p = self.pixel(x, y);
    match self.format {
      PixelFormat::Luminance8 => [p[0], p[0], p[0]],
      _ => [p[0], p[1], p[2]],
    }
  }

  /// Overwrite the colour channels of a pixel, leaving alpha untouched.
  #[inline]
  pub fn set_rgb(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
    let format = self.format;
    let p = self.pixel_mut(x, y);
    match format {
      PixelFormat::Luminance8 => p[0] = rgb[0],
      _ => p[..3].copy_from_slice(&rgb),
    }
  }
}

// =============================================================================
// HeightGrid
// =============================================================================

/// Regular grid of height samples placed on vertices.
///
/// Column 0 / row 0 sits at `origin` (the south-west corner); sample
/// `(c, r)` lies at `origin + (c * x_interval, r * y_interval)`.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightGrid {
  num_columns: u32,
  num_rows: u32,
  origin: DVec2,
  x_interval: f64,
  y_interval: f64,
  heights: Vec<f32>,
}

impl HeightGrid {
  /// Allocate a grid with all heights at zero.
  pub fn new(num_columns: u32, num_rows: u32, origin: DVec2, x_interval: f64, y_interval: f64) -> Self {
    Self::filled(num_columns, num_rows, origin, x_interval, y_interval, 0.0)
  }

  /// Allocate a grid with every height set to `height`.
  pub fn filled(
    num_columns: u32,
    num_rows: u32,
    origin: DVec2,
    x_interval: f64,
    y_interval: f64,
    height: f32,
  ) -> Self {
    Self {
      num_columns,
      num_rows,
      origin,
      x_interval,
      y_interval,
      heights: vec![height; num_columns as usize * num_rows as usize],
    }
  }

  #[inline]
  pub fn num_columns(&self) -> u32 {
    self.num_columns
  }

  #[inline]
  pub fn num_rows(&self) -> u32 {
    self.num_rows
  }

  #[inline]
  pub fn origin(&self) -> DVec2 {
    self.origin
  }

  #[inline]
  pub fn x_interval(&self) -> f64 {
    self.x_interval
  }

  #[inline]
  pub fn y_interval(&self) -> f64 {
    self.y_interval
  }

  #[inline]
  fn index(&self, column: u32, row: u32) -> usize {
    row as usize * self.num_columns as usize + column as usize
  }

  #[inline]
  pub fn height(&self, column: u32, row: u32) -> f32 {
    self.heights[self.index(column, row)]
  }

  #[inline]
  pub fn set_height(&mut self, column: u32, row: u32, height: f32) {
    let idx = self.index(column, row);
    self.heights[idx] = height;
  }

  /// Spatial position of a sample.
  #[inline]
  pub fn vertex(&self, column: u32, row: u32) -> DVec2 {
    self.origin + DVec2::new(column as f64 * self.x_interval, row as f64 * self.y_interval)
  }

  /// All heights, bottom row first.
  pub fn heights(&self) -> &[f32] {
    &self.heights
  }

  /// Lowest and highest sample, None for an empty grid.
  pub fn min_max(&self) -> Option<(f32, f32)> {
    self.heights.iter().fold(None, |acc, &h| match acc {
      None => Some((h, h)),
      Some((lo, hi)) => Some((lo.min(h), hi.max(h))),
    })
  }

  /// Gradient `(dz/dx, dz/dy)` at a sample: central differences inside,
  /// one-sided on the border, zero along an axis with a single sample.
  pub fn slope(&self, column: u32, row: u32) -> Vec2 {
    let along = |n: u32, i: u32, spacing: f64, at: &dyn Fn(u32) -> f32| -> f32 {
      if n < 2 || spacing == 0.0 {
        return 0.0;
      }
      let (lo, hi) = (i.saturating_sub(1), (i + 1).min(n - 1));
      (at(hi) - at(lo)) / ((hi - lo) as f64 * spacing) as f32
    };
    Vec2::new(
      along(self.num_columns, column, self.x_interval, &|c| self.height(c, row)),
      along(self.num_rows, row, self.y_interval, &|r| self.height(column, r)),
    )
  }

  /// All samples share one height.
  pub fn is_flat(&self) -> bool {
    matches!(self.min_max(), Some((lo, hi)) if lo == hi)
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
