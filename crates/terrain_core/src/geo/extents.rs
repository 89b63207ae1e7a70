//! Rectangular extent in destination coordinates.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned extent with a geographic flag.
///
/// Geographic extents are in degrees and may wrap the dateline, which
/// `intersects` accounts for by testing a 360° shifted copy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeospatialExtents {
  pub x_min: f64,
  pub y_min: f64,
  pub x_max: f64,
  pub y_max: f64,
  #[serde(default)]
  pub is_geographic: bool,
}

impl Default for GeospatialExtents {
  fn default() -> Self {
    Self::invalid()
  }
}

impl GeospatialExtents {
  pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64, is_geographic: bool) -> Self {
    Self {
      x_min,
      y_min,
      x_max,
      y_max,
      is_geographic,
    }
  }

  /// Sentinel with min > max, ready for `expand_by`.
  pub fn invalid() -> Self {
    Self {
      x_min: f64::MAX,
      y_min: f64::MAX,
      x_max: -f64::MAX,
      y_max: -f64::MAX,
      is_geographic: false,
    }
  }

  #[inline]
  pub fn valid(&self) -> bool {
    self.x_max >= self.x_min && self.y_max >= self.y_min
  }

  #[inline]
  pub fn width(&self) -> f64 {
    self.x_max - self.x_min
  }

  #[inline]
  pub fn height(&self) -> f64 {
    self.y_max - self.y_min
  }

  #[inline]
  pub fn center(&self) -> DVec2 {
    DVec2::new((self.x_min + self.x_max) * 0.5, (self.y_min + self.y_max) * 0.5)
  }

  /// Half the diagonal length.
  #[inline]
  pub fn radius(&self) -> f64 {
    (self.width() * self.width() + self.height() * self.height()).sqrt() * 0.5
  }

  /// Whether `point` lies inside or on the boundary.
  #[inline]
  pub fn contains(&self, point: DVec2) -> bool {
    point.x >= self.x_min && point.x <= self.x_max && point.y >= self.y_min && point.y <= self.y_max
  }

  /// Overlap test, boundary contact counts as overlapping.
  pub fn intersects(&self, other: &GeospatialExtents) -> bool {
    if !self.valid() || !other.valid() {
      return false;
    }
    if self.y_min.max(other.y_min) > self.y_max.min(other.y_max) {
      return false;
    }
    if self.x_min.max(other.x_min) <= self.x_max.min(other.x_max) {
      return true;
    }
    if !self.is_geographic {
      return false;
    }
    let rotation = if self.x_min > other.x_min { 360.0 } else { -360.0 };
    self.x_min.max(other.x_min + rotation) <= self.x_max.min(other.x_max + rotation)
  }

  /// Overlap of `self` with `other` shifted horizontally by `x_offset`.
  ///
  /// Pass ±360 to intersect across the dateline. The result is invalid when
  /// there is no overlap.
  pub fn intersection(&self, other: &GeospatialExtents, x_offset: f64) -> GeospatialExtents {
    GeospatialExtents {
      x_min: self.x_min.max(other.x_min + x_offset),
      y_min: self.y_min.max(other.y_min),
      x_max: self.x_max.min(other.x_max + x_offset),
      y_max: self.y_max.min(other.y_max),
      is_geographic: self.is_geographic,
    }
  }

  /// Grow to include `other`. Invalid inputs are ignored.
  pub fn expand_by(&mut self, other: &GeospatialExtents) {
    if !other.valid() {
      return;
    }
    if !self.valid() {
      self.is_geographic = other.is_geographic;
    }
    self.x_min = self.x_min.min(other.x_min);
    self.y_min = self.y_min.min(other.y_min);
    self.x_max = self.x_max.max(other.x_max);
    self.y_max = self.y_max.max(other.y_max);
  }

  /// Grow to include a point.
  pub fn expand_by_point(&mut self, point: DVec2) {
    self.x_min = self.x_min.min(point.x);
    self.y_min = self.y_min.min(point.y);
    self.x_max = self.x_max.max(point.x);
    self.y_max = self.y_max.max(point.y);
  }

  /// Left and right halves.
  pub fn split_x(&self) -> [GeospatialExtents; 2] {
    let xc = self.center().x;
    [
      Self::new(self.x_min, self.y_min, xc, self.y_max, self.is_geographic),
      Self::new(xc, self.y_min, self.x_max, self.y_max, self.is_geographic),
    ]
  }

  /// Bottom and top halves.
  pub fn split_y(&self) -> [GeospatialExtents; 2] {
    let yc = self.center().y;
    [
      Self::new(self.x_min, self.y_min, self.x_max, yc, self.is_geographic),
      Self::new(self.x_min, yc, self.x_max, self.y_max, self.is_geographic),
    ]
  }

  /// Bottom-left, bottom-right, top-left, top-right.
  pub fn quadrants(&self) -> [GeospatialExtents; 4] {
    let [bottom, top] = self.split_y();
    let [bl, br] = bottom.split_x();
    let [tl, tr] = top.split_x();
    [bl, br, tl, tr]
  }
}

#[cfg(test)]
#[path = "extents_test.rs"]
mod extents_test;
