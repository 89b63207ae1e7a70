//! Test fixtures: synthetic sources and hand-populated tile grids.

use glam::DVec2;

use crate::geo::GeospatialExtents;
use crate::options::BuildOptions;
use crate::quadtree::{CompositeDestination, DestinationGraph, QuadMap, QuadtreeBuilder, TileId, TileKey};
use crate::source::MemorySources;
use crate::tile::{compute_neighbours_from_quad_map, DestinationTile, TilePhase};
use crate::types::{DataType, HeightGrid, ImageBuffer, PixelFormat};

// =============================================================================
// Sources
// =============================================================================

pub fn extents(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> GeospatialExtents {
  GeospatialExtents::new(x_min, y_min, x_max, y_max, false)
}

/// Solid RGB image.
pub fn solid_image(width: u32, height: u32, rgb: [u8; 3]) -> ImageBuffer {
  ImageBuffer::new(width, height, PixelFormat::Rgb8, rgb)
}

/// One layer-0 image source over `extents` with square cells of `resolution`.
pub fn image_sources(extents: GeospatialExtents, resolution: f64, rgb: [u8; 3]) -> MemorySources {
  let mut sources = MemorySources::new();
  add_image(&mut sources, extents, resolution, rgb);
  sources
}

pub fn add_image(sources: &mut MemorySources, extents: GeospatialExtents, resolution: f64, rgb: [u8; 3]) {
  let width = (extents.width() / resolution).round() as u32;
  let height = (extents.height() / resolution).round() as u32;
  sources.add_image("image", extents, 0, solid_image(width, height, rgb));
}

/// Vertex-sampled height source of `n` by `n` samples from `f(x, y)`.
pub fn add_terrain(sources: &mut MemorySources, extents: GeospatialExtents, n: u32, f: impl Fn(f64, f64) -> f32) {
  let dx = extents.width() / (n - 1) as f64;
  let dy = extents.height() / (n - 1) as f64;
  let mut values = Vec::with_capacity((n * n) as usize);
  // north row first
  for row in 0..n {
    let y = extents.y_max - row as f64 * dy;
    for col in 0..n {
      values.push(f(extents.x_min + col as f64 * dx, y));
    }
  }
  sources.add_heights("terrain", extents, n, n, values);
}

/// Run the quadtree builder with default coordinate handling.
pub fn build_graph(options: &BuildOptions, sources: &MemorySources, extents: GeospatialExtents) -> (DestinationGraph, QuadMap) {
  let mut graph = DestinationGraph::new();
  let mut quad_map = QuadMap::new();
  QuadtreeBuilder::new(options, sources).build(extents, &mut graph, &mut quad_map);
  (graph, quad_map)
}

// =============================================================================
// Populated tile grids
// =============================================================================

/// `columns` by `rows` unit tiles at level 1, each holding a populated
/// `image_size` square RGB image and a `terrain_size` square height grid,
/// with neighbours wired.
///
/// Returns tile ids indexed `[row][column]`.
pub fn populated_grid(
  columns: i32,
  rows: i32,
  image_size: u32,
  terrain_size: u32,
) -> (DestinationGraph, QuadMap, Vec<Vec<TileId>>) {
  let mut graph = DestinationGraph::new();
  let mut quad_map = QuadMap::new();
  let mut ids = Vec::new();

  for y in 0..rows {
    let mut row = Vec::new();
    for x in 0..columns {
      let key = TileKey::new(1, x, y);
      let e = extents(x as f64, y as f64, x as f64 + 1.0, y as f64 + 1.0);
      let mut tile = DestinationTile::new(format!("t_{key}"), key, e, DataType::Raster, 1);
      tile.imagery[0].image = Some(solid_image(image_size, image_size, [0, 0, 0]));
      let interval = 1.0 / (terrain_size - 1) as f64;
      tile.terrain = Some(HeightGrid::new(
        terrain_size,
        terrain_size,
        DVec2::new(e.x_min, e.y_min),
        interval,
        interval,
      ));
      tile.set_phase(TilePhase::Populated);

      let tile_id = graph.add_tile(tile);
      let mut composite = CompositeDestination::new(key, format!("c_{key}"), e);
      composite.tiles.push(tile_id);
      let composite_id = graph.add_composite(composite);
      quad_map.insert(key, composite_id);
      row.push(tile_id);
    }
    ids.push(row);
  }

  compute_neighbours_from_quad_map(&mut graph, &quad_map);
  (graph, quad_map, ids)
}

/// Paint every pixel and height of a tile with one value.
pub fn fill_tile(graph: &mut DestinationGraph, id: TileId, rgb: [u8; 3], height: f32) {
  let tile = graph.tile_mut(id);
  if let Some(image) = tile.imagery[0].image.as_mut() {
    for y in 0..image.height() {
      for x in 0..image.width() {
        image.set_rgb(x, y, rgb);
      }
    }
  }
  if let Some(grid) = tile.terrain.as_mut() {
    for r in 0..grid.num_rows() {
      for c in 0..grid.num_columns() {
        grid.set_height(c, r, height);
      }
    }
  }
}

/// Snapshot of every buffer in the graph.
pub fn snapshot(graph: &DestinationGraph) -> Vec<(Vec<u8>, Vec<f32>)> {
  graph
    .tiles()
    .iter()
    .map(|t| {
      (
        t.image(0).map(|i| i.as_raw().to_vec()).unwrap_or_default(),
        t.terrain.as_ref().map(|g| g.heights().to_vec()).unwrap_or_default(),
      )
    })
    .collect()
}
