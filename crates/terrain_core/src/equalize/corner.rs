//! Shared-corner averaging across up to four tiles.

use smallvec::SmallVec;

use crate::quadtree::{DestinationGraph, TileId};
use crate::tile::{DestinationTile, Direction};
use crate::types::PixelFormat;

/// Sample coordinate of a corner in a `width` by `height` buffer.
#[inline]
fn corner_sample(direction: Direction, width: u32, height: u32) -> (u32, u32) {
  let right = width.saturating_sub(1);
  let top = height.saturating_sub(1);
  match direction {
    Direction::LeftBelow => (0, 0),
    Direction::BelowRight => (right, 0),
    Direction::RightAbove => (right, top),
    _ => (0, top),
  }
}

/// Tiles meeting at `direction`'s corner of `id`, each with the direction
/// naming that same point from its side.
fn participants(tile: &DestinationTile, id: TileId, direction: Direction) -> SmallVec<[(TileId, Direction); 4]> {
  let d = direction.index();
  let mut found: SmallVec<[(TileId, Direction); 4]> = SmallVec::new();
  found.push((id, direction));
  let around = [
    (Direction::from_index(d + 7), Direction::from_index(d + 2)),
    (direction, Direction::from_index(d + 4)),
    (Direction::from_index(d + 1), Direction::from_index(d + 6)),
  ];
  for (towards, seen_as) in around {
    if let Some(n) = tile.neighbour(towards) {
      found.push((n, seen_as));
    }
  }
  found
}

/// Average the corner of `id` at `direction` with every tile sharing it.
pub fn equalize_corner(graph: &mut DestinationGraph, id: TileId, direction: Direction) {
  debug_assert!(direction.is_corner());
  if graph.equalized(id)[direction.index()] {
    return;
  }

  let found = participants(graph.tile(id), id, direction);
  for (tile, corner) in &found {
    graph.equalized_mut(*tile)[corner.index()] = true;
  }
  if found.len() < 2 {
    return;
  }

  let num_layers = found
    .iter()
    .map(|(t, _)| graph.tile(*t).imagery.len())
    .max()
    .unwrap_or(0);

  for layer in 0..num_layers {
    let mut sum = [0u32; 3];
    let mut count = 0u32;
    for (t, corner) in &found {
      if let Some(image) = graph.tile(*t).image(layer).filter(|i| i.format() == PixelFormat::Rgb8) {
        let (x, y) = corner_sample(*corner, image.width(), image.height());
        let rgb = image.rgb(x, y);
        for c in 0..3 {
          sum[c] += rgb[c] as u32;
        }
        count += 1;
      }
    }
    if count < 2 {
      continue;
    }
    let average = sum.map(|v| (v / count) as u8);
    for (t, corner) in &found {
      let image = graph.tile_mut(*t).imagery.get_mut(layer).and_then(|d| d.image.as_mut());
      if let Some(image) = image.filter(|i| i.format() == PixelFormat::Rgb8) {
        let (x, y) = corner_sample(*corner, image.width(), image.height());
        image.set_rgb(x, y, average);
      }
    }
  }

  let mut height_sum = 0.0f32;
  let mut count = 0u32;
  for (t, corner) in &found {
    if let Some(grid) = graph.tile(*t).terrain.as_ref() {
      let (c, r) = corner_sample(*corner, grid.num_columns(), grid.num_rows());
      height_sum += grid.height(c, r);
      count += 1;
    }
  }
  if count < 2 {
    return;
  }
  let average = height_sum / count as f32;
  for (t, corner) in &found {
    if let Some(grid) = graph.tile_mut(*t).terrain.as_mut() {
      let (c, r) = corner_sample(*corner, grid.num_columns(), grid.num_rows());
      grid.set_height(c, r, average);
    }
  }
}
