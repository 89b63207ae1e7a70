//! Sampled dataset geometry: coordinate system, geo-transform and sample
//! counts.

use std::sync::Arc;

use glam::{DAffine2, DMat2, DVec2};
use serde::{Deserialize, Serialize};

use super::GeospatialExtents;
use crate::types::{DataType, Resolution};

/// Broad class of a coordinate system. Reprojection lives outside this
/// crate; the kind is all the core needs to pick its distance math.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateKind {
  /// Longitude/latitude in degrees.
  Geographic,
  /// Planar units (metres, feet...).
  #[default]
  Projected,
}

/// Coordinate system description shared between datasets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CoordinateSystem {
  pub kind: CoordinateKind,
  /// Well-known-text definition, passed through to scene decoration.
  pub wkt: String,
}

impl CoordinateSystem {
  pub fn geographic() -> Arc<Self> {
    Arc::new(Self {
      kind: CoordinateKind::Geographic,
      wkt: "WGS84".to_string(),
    })
  }

  pub fn projected(wkt: impl Into<String>) -> Arc<Self> {
    Arc::new(Self {
      kind: CoordinateKind::Projected,
      wkt: wkt.into(),
    })
  }

  #[inline]
  pub fn is_geographic(&self) -> bool {
    self.kind == CoordinateKind::Geographic
  }
}

/// Affine mapping from sample grid (column, row) to spatial (x, y).
///
/// Same coefficient order as GDAL:
/// `x = c[0] + col * c[1] + row * c[2]`, `y = c[3] + col * c[4] + row * c[5]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoTransform(pub DAffine2);

impl Default for GeoTransform {
  fn default() -> Self {
    Self(DAffine2::IDENTITY)
  }
}

impl GeoTransform {
  pub fn from_coefficients(c: [f64; 6]) -> Self {
    Self(DAffine2::from_mat2_translation(
      DMat2::from_cols(DVec2::new(c[1], c[4]), DVec2::new(c[2], c[5])),
      DVec2::new(c[0], c[3]),
    ))
  }

  /// North-up transform placing `num_x` by `num_y` samples over `extents`.
  /// Row 0 is the northern edge.
  pub fn from_extents(extents: &GeospatialExtents, num_x: u32, num_y: u32, data_type: DataType) -> Self {
    let (dx, dy) = match data_type {
      DataType::Vector => (
        extents.width() / (num_x.max(2) - 1) as f64,
        extents.height() / (num_y.max(2) - 1) as f64,
      ),
      _ => (
        extents.width() / num_x.max(1) as f64,
        extents.height() / num_y.max(1) as f64,
      ),
    };
    Self::from_coefficients([extents.x_min, dx, 0.0, extents.y_max, 0.0, -dy])
  }

  /// GDAL-ordered coefficients.
  pub fn coefficients(&self) -> [f64; 6] {
    let m = self.0.matrix2;
    let t = self.0.translation;
    [t.x, m.x_axis.x, m.y_axis.x, t.y, m.x_axis.y, m.y_axis.y]
  }

  /// Spatial position of a (fractional) grid coordinate.
  #[inline]
  pub fn apply(&self, column: f64, row: f64) -> DVec2 {
    self.0.transform_point2(DVec2::new(column, row))
  }

  /// Grid coordinate of a spatial position.
  #[inline]
  pub fn invert(&self, point: DVec2) -> DVec2 {
    self.0.inverse().transform_point2(point)
  }
}

/// Geometry of a sampled raster or vector dataset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpatialProperties {
  pub cs: Option<Arc<CoordinateSystem>>,
  pub geo_transform: GeoTransform,
  pub extents: GeospatialExtents,
  pub num_values_x: u32,
  pub num_values_y: u32,
  pub num_values_z: u32,
  pub data_type: DataType,
}

impl SpatialProperties {
  /// Properties for a north-up dataset covering `extents`; extents and
  /// geo-transform are kept consistent.
  pub fn new(
    cs: Option<Arc<CoordinateSystem>>,
    extents: GeospatialExtents,
    num_values_x: u32,
    num_values_y: u32,
    data_type: DataType,
  ) -> Self {
    let mut props = Self {
      cs,
      geo_transform: GeoTransform::from_extents(&extents, num_values_x, num_values_y, data_type),
      extents,
      num_values_x,
      num_values_y,
      num_values_z: 1,
      data_type,
    };
    props.compute_extents();
    props
  }

  /// Derive `extents` from the geo-transform and the sample counts.
  ///
  /// Raster samples cover cells, so the far corner is at `(nx, ny)`; vector
  /// samples sit on vertices, so it is at `(nx - 1, ny - 1)`.
  pub fn compute_extents(&mut self) {
    let (nx, ny) = match self.data_type {
      DataType::Vector => (
        self.num_values_x.saturating_sub(1) as f64,
        self.num_values_y.saturating_sub(1) as f64,
      ),
      _ => (self.num_values_x as f64, self.num_values_y as f64),
    };
    let mut extents = GeospatialExtents::invalid();
    for (c, r) in [(0.0, 0.0), (nx, 0.0), (0.0, ny), (nx, ny)] {
      extents.expand_by_point(self.geo_transform.apply(c, r));
    }
    extents.is_geographic = self.cs.as_ref().is_some_and(|cs| cs.is_geographic());
    self.extents = extents;
  }

  /// No samples on some axis; such datasets are skipped silently.
  pub fn is_degenerate(&self) -> bool {
    match self.data_type {
      DataType::Vector => self.num_values_x < 2 || self.num_values_y < 2,
      _ => self.num_values_x == 0 || self.num_values_y == 0,
    }
  }

  /// Spacing between samples, None for degenerate datasets.
  pub fn resolution(&self) -> Option<Resolution> {
    if self.is_degenerate() || !self.extents.valid() {
      return None;
    }
    let (nx, ny) = match self.data_type {
      DataType::Vector => (self.num_values_x - 1, self.num_values_y - 1),
      _ => (self.num_values_x, self.num_values_y),
    };
    let res = Resolution::new(
      self.extents.width() / nx as f64,
      self.extents.height() / ny as f64,
    );
    res.is_valid().then_some(res)
  }
}

#[cfg(test)]
#[path = "spatial_test.rs"]
mod spatial_test;
