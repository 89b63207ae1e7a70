//! Source capability consumed by the quadtree builder and tile population.
//!
//! Reading concrete formats and reprojection live outside the crate: a
//! [`SourceCollection`] only has to answer "where is source X, how fine is
//! it, and what are its values inside this extent".

pub mod memory;

pub use memory::MemorySources;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geo::{CoordinateSystem, GeospatialExtents, SpatialProperties};
use crate::constants::MAXIMUM_NUMBER_OF_LEVELS;
use crate::types::{DataType, HeightGrid, ImageBuffer, Resolution};

/// Index of a source within its collection.
pub type SourceId = usize;

/// What a source contributes to a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
  /// Imagery for a texture layer.
  Image,
  /// Elevation samples.
  HeightField,
  /// Pre-built model placed by reference.
  Model,
  /// Vector overlay, carried but not rasterized by the core.
  Vector,
}

/// Source metadata. The collection owns it; the core only reads it and
/// appends required resolutions.
#[derive(Clone, Debug)]
pub struct Source {
  pub name: String,
  pub source_type: SourceType,
  /// Target image layer (ignored for non-image sources).
  pub layer: u32,
  pub min_level: u32,
  pub max_level: u32,
  pub properties: SpatialProperties,
  required_resolutions: Vec<Resolution>,
}

impl Source {
  pub fn new(name: impl Into<String>, source_type: SourceType, properties: SpatialProperties) -> Self {
    Self {
      name: name.into(),
      source_type,
      layer: 0,
      min_level: 0,
      max_level: MAXIMUM_NUMBER_OF_LEVELS,
      properties,
      required_resolutions: Vec::new(),
    }
  }

  pub fn with_layer(mut self, layer: u32) -> Self {
    self.layer = layer;
    self
  }

  pub fn with_level_range(mut self, min_level: u32, max_level: u32) -> Self {
    self.min_level = min_level;
    self.max_level = max_level;
    self
  }

  /// Level lies within `[min_level, max_level]`.
  #[inline]
  pub fn covers_level(&self, level: u32) -> bool {
    level >= self.min_level && level <= self.max_level
  }

  /// Record a resolution some destination tile will sample this source at.
  /// Exact duplicates are dropped.
  pub fn add_required_resolution(&mut self, resolution: Resolution) {
    if !self.required_resolutions.contains(&resolution) {
      self.required_resolutions.push(resolution);
    }
  }

  /// Resolutions in insertion order.
  pub fn required_resolutions(&self) -> &[Resolution] {
    &self.required_resolutions
  }

  /// Resolutions sorted coarsest first, for building overview pyramids.
  pub fn consolidated_resolutions(&self) -> Vec<Resolution> {
    let mut sorted = self.required_resolutions.clone();
    sorted.sort_by(|a, b| {
      (b.x * b.y)
        .partial_cmp(&(a.x * a.y))
        .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted
  }
}

/// Ordered collection of sources able to fill tile buffers.
///
/// `Sync` so tiles of one row can be populated in parallel.
pub trait SourceCollection: Sync {
  /// All sources in layering order; later sources draw over earlier ones.
  fn sources(&self) -> &[Source];

  /// Mutable access for resolution back-propagation.
  fn source_mut(&mut self, id: SourceId) -> Option<&mut Source>;

  /// Spatial properties of a source expressed in `cs`.
  ///
  /// The default returns the stored properties unchanged; collections that
  /// reproject override it.
  fn spatial_properties(&self, id: SourceId, _cs: Option<&CoordinateSystem>) -> Option<SpatialProperties> {
    self.sources().get(id).map(|s| s.properties.clone())
  }

  /// Whether source `id` overlaps `extents`.
  fn intersects(&self, id: SourceId, extents: &GeospatialExtents) -> bool {
    self
      .sources()
      .get(id)
      .is_some_and(|s| s.properties.extents.intersects(extents))
  }

  /// Write the source's pixels over the part of `image` (covering `extents`,
  /// sampled per `data_type`) the source overlaps. Returns whether any pixel
  /// was written.
  fn read_image(
    &self,
    id: SourceId,
    extents: &GeospatialExtents,
    data_type: DataType,
    image: &mut ImageBuffer,
  ) -> Result<bool>;

  /// Write the source's heights over the part of `grid` the source
  /// overlaps. Returns whether any sample was written.
  fn read_height(&self, id: SourceId, grid: &mut HeightGrid) -> Result<bool>;

  /// Forward a required resolution to source `id`.
  fn add_required_resolution(&mut self, id: SourceId, resolution: Resolution) {
    if let Some(source) = self.source_mut(id) {
      source.add_required_resolution(resolution);
    }
  }
}
