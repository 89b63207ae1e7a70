//! Recursive construction of the destination quadtree.
//!
//! Each node gets one tile covering its extents. The tile's presented
//! resolution is compared with the finest resolution its sources offer; an
//! axis is split when the sources hold noticeably more detail:
//!
//! ```text
//!   split_x = presented_res.x * 0.9 > source_res.x   (any image layer or terrain)
//!   split_y = presented_res.y * 0.9 > source_res.y
//!
//!   both set, h/w > 1.414  ->  Y only
//!   both set, h/w < 0.707  ->  X only
//! ```
//!
//! Recursion stops at `max_levels - 1` or at the deepest level any
//! intersecting source offers, whichever comes first.

use smallvec::SmallVec;
use tracing::debug;

use super::{CompositeDestination, CompositeId, CompositeKind, DestinationGraph, QuadMap, TileKey};
use crate::constants::{CHILD_VISIBLE_DISTANCE_SCALE, MAX_ASPECT_RATIO, MIN_ASPECT_RATIO, RESOLUTION_SENSITIVITY};
use crate::geo::{CoordinateSystem, EllipsoidModel, GeospatialExtents};
use crate::options::BuildOptions;
use crate::source::{SourceCollection, SourceType};
use crate::tile::DestinationTile;

/// Builds composites and tiles into a [`DestinationGraph`], registering
/// each in the [`QuadMap`] as soon as it exists.
pub struct QuadtreeBuilder<'a, S: SourceCollection + ?Sized> {
  options: &'a BuildOptions,
  sources: &'a S,
  cs: Option<&'a CoordinateSystem>,
  ellipsoid: EllipsoidModel,
  subtile: Option<TileKey>,
  num_layers: usize,
}

impl<'a, S: SourceCollection + ?Sized> QuadtreeBuilder<'a, S> {
  pub fn new(options: &'a BuildOptions, sources: &'a S) -> Self {
    let num_layers = sources
      .sources()
      .iter()
      .filter(|s| s.source_type == SourceType::Image)
      .map(|s| s.layer as usize + 1)
      .max()
      .unwrap_or(0);
    Self {
      options,
      sources,
      cs: None,
      ellipsoid: EllipsoidModel::default(),
      subtile: None,
      num_layers,
    }
  }

  pub fn with_coordinate_system(mut self, cs: Option<&'a CoordinateSystem>) -> Self {
    self.cs = cs;
    self
  }

  pub fn with_ellipsoid(mut self, ellipsoid: EllipsoidModel) -> Self {
    self.ellipsoid = ellipsoid;
    self
  }

  /// Keep only the composite at `key`'s level matching `key`; its
  /// ancestors become tile-less groups.
  pub fn with_subtile(mut self, key: Option<TileKey>) -> Self {
    self.subtile = key;
    self
  }

  /// Build the whole tree over `extents` and record its root.
  pub fn build(&self, extents: GeospatialExtents, graph: &mut DestinationGraph, quad_map: &mut QuadMap) -> Option<CompositeId> {
    let root = self.build_node(graph, quad_map, extents, 0, 0, 0, None, None);
    graph.set_root(root);
    root
  }

  /// Build the composite at `(level, x, y)` and everything below it.
  ///
  /// `max_visible_distance` is the distance handed down by the parent; the
  /// root computes its own.
  #[allow(clippy::too_many_arguments)]
  pub fn build_node(
    &self,
    graph: &mut DestinationGraph,
    quad_map: &mut QuadMap,
    extents: GeospatialExtents,
    level: u32,
    x: i32,
    y: i32,
    parent: Option<CompositeId>,
    max_visible_distance: Option<f64>,
  ) -> Option<CompositeId> {
    let key = TileKey::new(level, x, y);
    if let Some(target) = self.subtile {
      if level == target.level && (x, y) != (target.x, target.y) {
        return None;
      }
    }

    let name = self.options.tile_name(key);
    let mut tile = DestinationTile::new(
      name.clone(),
      key,
      extents,
      self.options.destination_data_type,
      self.num_layers,
    );
    tile.compute_maximum_source_level(self.sources, self.cs);
    tile.compute_maximum_source_resolution(self.sources, self.cs);
    tile.assign_models(self.sources);

    let terminal = level + 1 >= self.options.max_levels || level >= tile.max_source_level;
    let (split_x, split_y) = if terminal { (false, false) } else { self.split_decision(&tile) };

    let mut composite = CompositeDestination::new(key, name, extents);
    composite.parent = parent;
    composite.max_visible_distance =
      max_visible_distance.unwrap_or_else(|| self.compute_max_visible_distance(&extents));
    if self.subtile.is_some_and(|t| level < t.level) {
      composite.kind = CompositeKind::Group;
    } else {
      composite.tiles.push(graph.add_tile(tile));
    }
    let child_distance = composite.max_visible_distance * CHILD_VISIBLE_DISTANCE_SCALE;
    let id = graph.add_composite(composite);
    quad_map.insert(key, id);

    let children: SmallVec<[(GeospatialExtents, i32, i32); 4]> = match (split_x, split_y) {
      (true, true) => {
        let [bl, br, tl, tr] = extents.quadrants();
        smallvec::smallvec![
          (bl, 2 * x, 2 * y),
          (br, 2 * x + 1, 2 * y),
          (tl, 2 * x, 2 * y + 1),
          (tr, 2 * x + 1, 2 * y + 1),
        ]
      }
      (true, false) => {
        let [left, right] = extents.split_x();
        smallvec::smallvec![(left, 2 * x, y), (right, 2 * x + 1, y)]
      }
      (false, true) => {
        let [bottom, top] = extents.split_y();
        smallvec::smallvec![(bottom, x, 2 * y), (top, x, 2 * y + 1)]
      }
      (false, false) => SmallVec::new(),
    };

    for (child_extents, cx, cy) in children {
      if let Some(child) = self.build_node(
        graph,
        quad_map,
        child_extents,
        level + 1,
        cx,
        cy,
        Some(id),
        Some(child_distance),
      ) {
        graph.composite_mut(id).children.push(child);
      }
    }

    Some(id)
  }

  /// Per-axis split wanted by any image layer or the terrain, after the
  /// aspect-ratio veto.
  pub fn split_decision(&self, tile: &DestinationTile) -> (bool, bool) {
    let mut split_x = false;
    let mut split_y = false;

    for (layer, data) in tile.imagery.iter().enumerate() {
      let (Some(size), Some(source_res)) = (
        tile.compute_image_resolution(layer, self.options.maximum_tile_image_size),
        data.max_source_resolution,
      ) else {
        continue;
      };
      split_x |= size.resolution.x * RESOLUTION_SENSITIVITY > source_res.x;
      split_y |= size.resolution.y * RESOLUTION_SENSITIVITY > source_res.y;
    }

    if let (Some(size), Some(source_res)) = (
      tile.compute_terrain_resolution(self.options.maximum_tile_terrain_size),
      tile.terrain_max_source_resolution,
    ) {
      split_x |= size.resolution.x * RESOLUTION_SENSITIVITY > source_res.x;
      split_y |= size.resolution.y * RESOLUTION_SENSITIVITY > source_res.y;
    }

    if split_x && split_y {
      let aspect = tile.extents.height() / tile.extents.width();
      if aspect > MAX_ASPECT_RATIO {
        split_x = false;
      } else if aspect < MIN_ASPECT_RATIO {
        split_y = false;
      }
    }

    debug!(tile = %tile.key, split_x, split_y, "split decision");
    (split_x, split_y)
  }

  /// Distance beyond which a node's own tile suffices.
  ///
  /// Geographic extents converted to geocentric use the angular half
  /// diagonal on the equator plus the sagitta of that arc.
  pub fn compute_max_visible_distance(&self, extents: &GeospatialExtents) -> f64 {
    let radius = if self.options.convert_from_geographic_to_geocentric && extents.is_geographic {
      let half_angle = (0.5 * extents.width()).hypot(0.5 * extents.height()).to_radians();
      let r = self.ellipsoid.radius_equator;
      r * half_angle + r * (1.0 - half_angle.cos())
    } else {
      extents.radius()
    };
    radius * self.options.radius_to_max_visible_distance_ratio
  }
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;
