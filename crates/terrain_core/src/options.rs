//! Build options shared by the quadtree builder, the scene assembler and the
//! orchestrator.
//!
//! Deserialized from the `[build]` table of the builder's TOML file; every
//! field falls back to its default when omitted.

use serde::{Deserialize, Serialize};

use crate::constants::MAXIMUM_NUMBER_OF_LEVELS;
use crate::quadtree::TileKey;
use crate::types::DataType;

/// How a tile's terrain is expressed in the scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryType {
  /// Triangle mesh with skirt.
  #[default]
  Polygonal,
  /// Raw height-field shape.
  HeightField,
}

/// Whether finer levels are embedded or loaded on demand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseType {
  /// One scene holding every level.
  Lod,
  /// One file per subtile group, linked by name.
  #[default]
  PagedLod,
}

/// Which part of the graph a process builds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BuildMode {
  /// The whole database in one process.
  #[default]
  Full,
  /// Levels up to and including `split_level`; subtile files are written
  /// only for parents above it.
  Root { split_level: u32 },
  /// The subtree below one composite at `level`.
  Subtile { level: u32, x: i32, y: i32 },
}

impl BuildMode {
  /// Target composite of a subtile build.
  pub fn subtile_key(&self) -> Option<TileKey> {
    match *self {
      BuildMode::Subtile { level, x, y } => Some(TileKey::new(level, x, y)),
      _ => None,
    }
  }

  /// Whether tiles at `level` are read, equalized and written.
  pub fn processes_level(&self, level: u32) -> bool {
    match *self {
      BuildMode::Full => true,
      BuildMode::Root { split_level } => level <= split_level,
      BuildMode::Subtile { level: target, .. } => level > target,
    }
  }

  /// Whether this process writes the subtile file of a parent at `level`.
  pub fn writes_subtile_of(&self, level: u32) -> bool {
    match *self {
      BuildMode::Full => true,
      BuildMode::Root { split_level } => level < split_level,
      BuildMode::Subtile { level: target, .. } => level >= target,
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
  /// Upper bound on tile image width/height before power-of-two rounding.
  pub maximum_tile_image_size: u32,
  /// Upper bound on tile height-grid columns/rows.
  pub maximum_tile_terrain_size: u32,
  pub max_levels: u32,
  pub radius_to_max_visible_distance_ratio: f64,
  pub maximum_visible_distance_of_top_level: f64,
  /// Skirt depth as a fraction of the tile bounding radius.
  pub skirt_ratio: f64,
  pub destination_data_type: DataType,
  pub geometry_type: GeometryType,
  pub database_type: DatabaseType,
  pub convert_from_geographic_to_geocentric: bool,
  pub use_local_tile_transform: bool,
  pub tile_basename: String,
  pub tile_extension: String,
  /// Fill colour for image pixels no source covers.
  pub default_color: [u8; 3],
  pub equalize_boundaries: bool,
  /// Populate the tiles of one row on the rayon pool.
  pub parallel_read: bool,
  pub decorate_with_coordinate_system_node: bool,
}

impl Default for BuildOptions {
  fn default() -> Self {
    Self {
      maximum_tile_image_size: 256,
      maximum_tile_terrain_size: 64,
      max_levels: MAXIMUM_NUMBER_OF_LEVELS,
      radius_to_max_visible_distance_ratio: 7.0,
      maximum_visible_distance_of_top_level: 1e10,
      skirt_ratio: 0.02,
      destination_data_type: DataType::Raster,
      geometry_type: GeometryType::Polygonal,
      database_type: DatabaseType::PagedLod,
      convert_from_geographic_to_geocentric: false,
      use_local_tile_transform: true,
      tile_basename: "output".to_string(),
      tile_extension: ".json".to_string(),
      default_color: [255, 255, 255],
      equalize_boundaries: true,
      parallel_read: true,
      decorate_with_coordinate_system_node: true,
    }
  }
}

impl BuildOptions {
  pub fn with_max_levels(mut self, max_levels: u32) -> Self {
    self.max_levels = max_levels;
    self
  }

  pub fn with_maximum_tile_image_size(mut self, size: u32) -> Self {
    self.maximum_tile_image_size = size;
    self
  }

  pub fn with_maximum_tile_terrain_size(mut self, size: u32) -> Self {
    self.maximum_tile_terrain_size = size;
    self
  }

  pub fn with_database_type(mut self, database_type: DatabaseType) -> Self {
    self.database_type = database_type;
    self
  }

  pub fn with_geocentric(mut self, geocentric: bool) -> Self {
    self.convert_from_geographic_to_geocentric = geocentric;
    self
  }

  pub fn with_basename(mut self, basename: impl Into<String>) -> Self {
    self.tile_basename = basename.into();
    self
  }

  /// `{basename}_L{level}_X{x}_Y{y}`
  pub fn tile_name(&self, key: TileKey) -> String {
    format!("{}_{}", self.tile_basename, key)
  }

  /// `{basename}{extension}`
  pub fn root_file_name(&self) -> String {
    format!("{}{}", self.tile_basename, self.tile_extension)
  }

  /// `{name}_subtile{extension}`
  pub fn subtile_file_name(&self, name: &str) -> String {
    format!("{}_subtile{}", name, self.tile_extension)
  }
}
