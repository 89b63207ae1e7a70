//! Destination tiles: one quadtree cell's imagery and terrain buffers.
//!
//! ```text
//!   Empty ──allocate──▶ Sized ──read_from──▶ Populated ──mark_equalized──▶ Equalized
//!                                                                              │
//!   Released ◀──unref_data── Emitted ◀──────────────mark_emitted───────────────┘
//! ```
//!
//! Each transition checks the current phase and returns
//! [`BuildError::PhaseViolation`] when called out of order.

pub mod neighbours;
pub mod resolution;

pub use neighbours::{check_neighbouring_tiles, compute_neighbours_from_quad_map, Direction};

use glam::{DVec2, Vec2};
use tracing::{debug, warn};

use crate::constants::NUM_NEIGHBOURS;
use crate::error::{BuildError, Result};
use crate::geo::{CoordinateSystem, GeospatialExtents};
use crate::options::BuildOptions;
use crate::quadtree::{TileId, TileKey};
use crate::source::{SourceCollection, SourceType};
use crate::types::{DataType, HeightGrid, ImageBuffer, PixelFormat, Resolution};

/// Lifecycle stage of a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TilePhase {
  /// Identity and extents only.
  #[default]
  Empty,
  /// Buffers allocated at their final size.
  Sized,
  /// Buffers filled from sources.
  Populated,
  /// Boundaries averaged with neighbours.
  Equalized,
  /// Scene node built and handed to a writer.
  Emitted,
  /// Buffers dropped.
  Released,
}

/// One image layer of a tile.
#[derive(Clone, Debug, Default)]
pub struct ImageData {
  pub image: Option<ImageBuffer>,
  /// Finest resolution offered by the sources of this layer.
  pub max_source_resolution: Option<Resolution>,
}

/// Leaf unit of output covering one quadtree cell.
#[derive(Clone, Debug)]
pub struct DestinationTile {
  pub name: String,
  pub key: TileKey,
  pub extents: GeospatialExtents,
  pub data_type: DataType,
  pub pixel_format: PixelFormat,
  pub max_source_level: u32,
  pub imagery: Vec<ImageData>,
  pub terrain: Option<HeightGrid>,
  pub terrain_max_source_resolution: Option<Resolution>,
  /// Same-level tiles around this one, indexed by [`Direction`].
  pub neighbours: [Option<TileId>; NUM_NEIGHBOURS],
  /// Averaged boundary slopes `(dz/dx, dz/dy)` per edge direction, one
  /// entry per interior edge sample.
  pub height_deltas: [Vec<Vec2>; NUM_NEIGHBOURS],
  /// Names of model sources placed in this tile.
  pub models: Vec<String>,
  /// Boundaries have been equalized.
  pub complete: bool,
  phase: TilePhase,
}

impl DestinationTile {
  pub fn new(name: String, key: TileKey, extents: GeospatialExtents, data_type: DataType, num_layers: usize) -> Self {
    Self {
      name,
      key,
      extents,
      data_type,
      pixel_format: PixelFormat::Rgb8,
      max_source_level: 0,
      imagery: vec![ImageData::default(); num_layers],
      terrain: None,
      terrain_max_source_resolution: None,
      neighbours: [None; NUM_NEIGHBOURS],
      height_deltas: std::array::from_fn(|_| Vec::new()),
      models: Vec::new(),
      complete: false,
      phase: TilePhase::Empty,
    }
  }

  #[inline]
  pub fn phase(&self) -> TilePhase {
    self.phase
  }

  #[inline]
  pub fn level(&self) -> u32 {
    self.key.level
  }

  #[inline]
  pub fn neighbour(&self, direction: Direction) -> Option<TileId> {
    self.neighbours[direction.index()]
  }

  /// Image of `layer`, if allocated.
  pub fn image(&self, layer: usize) -> Option<&ImageBuffer> {
    self.imagery.get(layer).and_then(|d| d.image.as_ref())
  }

  fn require(&self, operation: &'static str, expected: TilePhase) -> Result<()> {
    if self.phase == expected {
      Ok(())
    } else {
      Err(BuildError::PhaseViolation {
        tile: self.key,
        operation,
        expected: phase_name(expected),
        found: self.phase,
      })
    }
  }

  // ===========================================================================
  // Source bookkeeping
  // ===========================================================================

  /// Highest `max_level` over intersecting, non-degenerate sources.
  pub fn compute_maximum_source_level<S: SourceCollection + ?Sized>(
    &mut self,
    sources: &S,
    cs: Option<&CoordinateSystem>,
  ) {
    self.max_source_level = sources
      .sources()
      .iter()
      .enumerate()
      .filter(|(id, _)| sources.intersects(*id, &self.extents))
      .filter(|(id, _)| {
        sources
          .spatial_properties(*id, cs)
          .is_some_and(|p| !p.is_degenerate())
      })
      .map(|(_, s)| s.max_level)
      .max()
      .unwrap_or(0);
  }

  /// Record the finest resolution each image layer and the terrain can be
  /// served at, from sources intersecting the tile at its level.
  pub fn compute_maximum_source_resolution<S: SourceCollection + ?Sized>(
    &mut self,
    sources: &S,
    cs: Option<&CoordinateSystem>,
  ) {
    for (id, source) in sources.sources().iter().enumerate() {
      if !source.covers_level(self.level()) || !sources.intersects(id, &self.extents) {
        continue;
      }
      let Some(resolution) = sources.spatial_properties(id, cs).and_then(|p| p.resolution()) else {
        continue;
      };
      match source.source_type {
        SourceType::Image => {
          let Some(layer) = self.imagery.get_mut(source.layer as usize) else {
            continue;
          };
          layer.max_source_resolution = Some(match layer.max_source_resolution {
            Some(r) => r.min(resolution),
            None => resolution,
          });
        }
        SourceType::HeightField => {
          self.terrain_max_source_resolution = Some(match self.terrain_max_source_resolution {
            Some(r) => r.min(resolution),
            None => resolution,
          });
        }
        SourceType::Model | SourceType::Vector => {}
      }
    }
  }

  /// Attach model sources whose centre falls inside this tile.
  pub fn assign_models<S: SourceCollection + ?Sized>(&mut self, sources: &S) {
    self.models = sources
      .sources()
      .iter()
      .filter(|s| s.source_type == SourceType::Model && s.covers_level(self.level()))
      .filter(|s| s.properties.extents.valid() && self.extents.contains(s.properties.extents.center()))
      .map(|s| s.name.clone())
      .collect();
  }

  // ===========================================================================
  // Lifecycle
  // ===========================================================================

  /// Create image and height buffers at their final sizes.
  pub fn allocate(&mut self, options: &BuildOptions) -> Result<()> {
    self.require("allocate", TilePhase::Empty)?;

    for layer in 0..self.imagery.len() {
      if let Some(size) = self.compute_image_resolution(layer, options.maximum_tile_image_size) {
        self.imagery[layer].image = Some(ImageBuffer::new(
          size.num_columns,
          size.num_rows,
          self.pixel_format,
          options.default_color,
        ));
      }
    }

    if let Some(size) = self.compute_terrain_resolution(options.maximum_tile_terrain_size) {
      self.terrain = Some(HeightGrid::new(
        size.num_columns,
        size.num_rows,
        DVec2::new(self.extents.x_min, self.extents.y_min),
        size.resolution.x,
        size.resolution.y,
      ));
    }

    self.phase = TilePhase::Sized;
    Ok(())
  }

  /// Fill buffers from every source overlapping the tile, in layering
  /// order. A failing source is logged and skipped.
  pub fn read_from<S: SourceCollection + ?Sized>(&mut self, sources: &S) -> Result<()> {
    self.require("read_from", TilePhase::Sized)?;

    for (id, source) in sources.sources().iter().enumerate() {
      if !source.covers_level(self.level()) || !sources.intersects(id, &self.extents) {
        continue;
      }
      let outcome = match source.source_type {
        SourceType::Image => match self
          .imagery
          .get_mut(source.layer as usize)
          .and_then(|d| d.image.as_mut())
        {
          Some(image) => sources.read_image(id, &self.extents, self.data_type, image),
          None => continue,
        },
        SourceType::HeightField => match self.terrain.as_mut() {
          Some(grid) => sources.read_height(id, grid),
          None => continue,
        },
        SourceType::Vector => {
          debug!(tile = %self.key, source = %source.name, "vector source contributes no data");
          continue;
        }
        SourceType::Model => continue,
      };
      match outcome {
        Ok(true) => {}
        Ok(false) => debug!(tile = %self.key, source = %source.name, "source wrote no samples"),
        Err(e) => warn!(tile = %self.key, "{e}"),
      }
    }

    self.phase = TilePhase::Populated;
    Ok(())
  }

  /// Boundaries have been averaged; the tile is complete.
  pub fn mark_equalized(&mut self) -> Result<()> {
    self.require("mark_equalized", TilePhase::Populated)?;
    self.phase = TilePhase::Equalized;
    self.complete = true;
    Ok(())
  }

  /// The tile's scene node has been handed to a writer.
  pub fn mark_emitted(&mut self) -> Result<()> {
    self.require("mark_emitted", TilePhase::Equalized)?;
    self.phase = TilePhase::Emitted;
    Ok(())
  }

  /// Drop image, terrain and slope buffers.
  pub fn unref_data(&mut self) -> Result<()> {
    self.require("unref_data", TilePhase::Emitted)?;
    for layer in &mut self.imagery {
      layer.image = None;
    }
    self.terrain = None;
    for deltas in &mut self.height_deltas {
      *deltas = Vec::new();
    }
    self.phase = TilePhase::Released;
    Ok(())
  }

  /// Jump straight to `phase`; fixtures fill buffers by hand.
  #[cfg(test)]
  pub(crate) fn set_phase(&mut self, phase: TilePhase) {
    self.phase = phase;
  }

  /// Any image or height buffer is held.
  pub fn has_data(&self) -> bool {
    self.terrain.is_some() || self.imagery.iter().any(|d| d.image.is_some())
  }
}

fn phase_name(phase: TilePhase) -> &'static str {
  match phase {
    TilePhase::Empty => "Empty",
    TilePhase::Sized => "Sized",
    TilePhase::Populated => "Populated",
    TilePhase::Equalized => "Equalized",
    TilePhase::Emitted => "Emitted",
    TilePhase::Released => "Released",
  }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
