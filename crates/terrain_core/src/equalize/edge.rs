//! Shared-edge averaging between two tiles.

use glam::Vec2;
use tracing::debug;

use crate::quadtree::{DestinationGraph, TileId};
use crate::tile::Direction;
use crate::types::{HeightGrid, ImageBuffer};

/// Matching interior samples of the edge `direction` of an `a`-sized buffer
/// and the opposite edge of a `b`-sized one, ordered along the edge.
/// None when the edges differ in length.
fn edge_pairs(direction: Direction, a: (u32, u32), b: (u32, u32)) -> Option<Vec<((u32, u32), (u32, u32))>> {
  let (aw, ah) = a;
  let (bw, bh) = b;
  let pairs = match direction {
    Direction::Left | Direction::Right => {
      if ah != bh || aw == 0 || bw == 0 {
        return None;
      }
      let (ax, bx) = if direction == Direction::Left { (0, bw - 1) } else { (aw - 1, 0) };
      (1..ah.saturating_sub(1)).map(|r| ((ax, r), (bx, r))).collect()
    }
    _ => {
      if aw != bw || ah == 0 || bh == 0 {
        return None;
      }
      let (ay, by) = if direction == Direction::Below { (0, bh - 1) } else { (ah - 1, 0) };
      (1..aw.saturating_sub(1)).map(|c| ((c, ay), (c, by))).collect()
    }
  };
  Some(pairs)
}

fn equalize_image_edge(a: &mut ImageBuffer, b: &mut ImageBuffer, direction: Direction) {
  let Some(pairs) = edge_pairs(direction, (a.width(), a.height()), (b.width(), b.height())) else {
    debug!(?direction, "image edge lengths differ, skipping");
    return;
  };
  for ((ax, ay), (bx, by)) in pairs {
    let pa = a.rgb(ax, ay);
    let pb = b.rgb(bx, by);
    let average = [0, 1, 2].map(|c| ((pa[c] as u16 + pb[c] as u16) / 2) as u8);
    a.set_rgb(ax, ay, average);
    b.set_rgb(bx, by, average);
  }
}

/// Average the shared heights, then return the averaged slope of both
/// sides at each interior sample.
fn equalize_height_edge(a: &mut HeightGrid, b: &mut HeightGrid, direction: Direction) -> Option<Vec<Vec2>> {
  let Some(pairs) = edge_pairs(direction, (a.num_columns(), a.num_rows()), (b.num_columns(), b.num_rows())) else {
    debug!(?direction, "height edge lengths differ, skipping");
    return None;
  };
  for &((ac, ar), (bc, br)) in &pairs {
    let average = (a.height(ac, ar) + b.height(bc, br)) * 0.5;
    a.set_height(ac, ar, average);
    b.set_height(bc, br, average);
  }
  Some(
    pairs
      .iter()
      .map(|&((ac, ar), (bc, br))| (a.slope(ac, ar) + b.slope(bc, br)) * 0.5)
      .collect(),
  )
}

/// Average the edge of `id` at `direction` with the neighbour across it.
pub fn equalize_edge(graph: &mut DestinationGraph, id: TileId, direction: Direction) {
  debug_assert!(!direction.is_corner());
  let d = direction.index();
  if graph.equalized(id)[d] {
    return;
  }
  graph.equalized_mut(id)[d] = true;

  let Some(neighbour_id) = graph.tile(id).neighbour(direction) else {
    return;
  };
  let opposite = direction.opposite().index();
  graph.equalized_mut(neighbour_id)[opposite] = true;

  let (tile, neighbour) = graph.tile_pair_mut(id, neighbour_id);

  let num_layers = tile.imagery.len().min(neighbour.imagery.len());
  for layer in 0..num_layers {
    let (Some(a), Some(b)) = (tile.imagery[layer].image.as_mut(), neighbour.imagery[layer].image.as_mut()) else {
      continue;
    };
    if a.format() != b.format() || !a.format().is_equalizable() {
      continue;
    }
    equalize_image_edge(a, b, direction);
  }

  if let (Some(a), Some(b)) = (tile.terrain.as_mut(), neighbour.terrain.as_mut()) {
    if let Some(deltas) = equalize_height_edge(a, b, direction) {
      neighbour.height_deltas[opposite] = deltas.clone();
      tile.height_deltas[d] = deltas;
    }
  }
}
