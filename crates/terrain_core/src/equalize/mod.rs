//! Boundary equalization between same-level tiles.
//!
//! ```text
//!        7 ─────── 6 ─────── 5
//!        │                   │      corners (1,3,5,7): average the shared
//!        0       tile        4      corner sample of up to four tiles
//!        │                   │
//!        1 ─────── 2 ─────── 3      edges (0,2,4,6): average the interior
//!                                   samples of the shared edge, corners
//!                                   excluded
//! ```
//!
//! Corners run before edges so corner averages see unmodified edge data.
//! A direction's flag is raised on every participant before any value is
//! written; a tile reached through a neighbour's call skips that direction
//! when its own turn comes.
//!
//! Only 8-bit RGB images of matching format and edge length take part;
//! anything else is skipped and the seam stays.

pub mod corner;
pub mod edge;

pub use corner::equalize_corner;
pub use edge::equalize_edge;

use tracing::info_span;

use crate::quadtree::{DestinationGraph, TileId};
use crate::tile::Direction;

/// Equalize all eight boundaries of one tile.
pub fn equalize_boundaries(graph: &mut DestinationGraph, id: TileId) {
  for corner in Direction::CORNERS {
    equalize_corner(graph, id, corner);
  }
  for edge in Direction::EDGES {
    equalize_edge(graph, id, edge);
  }
}

/// Equalize every tile of a row, left to right.
pub fn equalize_row(graph: &mut DestinationGraph, row: &[TileId]) {
  let _span = info_span!("equalize_row", tiles = row.len()).entered();
  for id in row {
    equalize_boundaries(graph, *id);
  }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
