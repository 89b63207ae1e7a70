//! Same-level neighbour wiring.
//!
//! ```text
//!   ABOVE_LEFT(7)   ABOVE(6)   RIGHT_ABOVE(5)
//!   LEFT(0)          tile      RIGHT(4)
//!   LEFT_BELOW(1)   BELOW(2)   BELOW_RIGHT(3)
//! ```
//!
//! Even directions are edges, odd directions are corners; the opposite of
//! `d` is `(d + 4) % 8`.

use tracing::warn;

use crate::constants::NUM_NEIGHBOURS;
use crate::quadtree::{DestinationGraph, QuadMap};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
  Left = 0,
  LeftBelow = 1,
  Below = 2,
  BelowRight = 3,
  Right = 4,
  RightAbove = 5,
  Above = 6,
  AboveLeft = 7,
}

impl Direction {
  pub const ALL: [Direction; NUM_NEIGHBOURS] = [
    Direction::Left,
    Direction::LeftBelow,
    Direction::Below,
    Direction::BelowRight,
    Direction::Right,
    Direction::RightAbove,
    Direction::Above,
    Direction::AboveLeft,
  ];

  pub const EDGES: [Direction; 4] = [Direction::Left, Direction::Below, Direction::Right, Direction::Above];

  pub const CORNERS: [Direction; 4] = [
    Direction::LeftBelow,
    Direction::BelowRight,
    Direction::RightAbove,
    Direction::AboveLeft,
  ];

  #[inline]
  pub fn index(self) -> usize {
    self as usize
  }

  /// Direction for any index, wrapping modulo 8.
  #[inline]
  pub fn from_index(index: usize) -> Self {
    Self::ALL[index % NUM_NEIGHBOURS]
  }

  #[inline]
  pub fn opposite(self) -> Self {
    Self::from_index(self.index() + 4)
  }

  #[inline]
  pub fn is_corner(self) -> bool {
    self.index() % 2 == 1
  }

  /// Tile coordinate offset towards this direction.
  pub fn offset(self) -> (i32, i32) {
    match self {
      Direction::Left => (-1, 0),
      Direction::LeftBelow => (-1, -1),
      Direction::Below => (0, -1),
      Direction::BelowRight => (1, -1),
      Direction::Right => (1, 0),
      Direction::RightAbove => (1, 1),
      Direction::Above => (0, 1),
      Direction::AboveLeft => (-1, 1),
    }
  }
}

/// Point every tile at its eight same-level neighbours.
pub fn compute_neighbours_from_quad_map(graph: &mut DestinationGraph, quad_map: &QuadMap) {
  let ids: Vec<_> = graph.tile_ids().collect();
  for id in ids {
    let key = graph.tile(id).key;
    let mut neighbours = [None; NUM_NEIGHBOURS];
    for direction in Direction::ALL {
      let (dx, dy) = direction.offset();
      neighbours[direction.index()] = graph.tile_at(quad_map, key.offset(dx, dy)).filter(|n| *n != id);
    }
    graph.tile_mut(id).neighbours = neighbours;
  }
}

/// Verify every neighbour points back through the opposite direction.
/// Returns the number of inconsistent links.
pub fn check_neighbouring_tiles(graph: &DestinationGraph) -> usize {
  let mut inconsistent = 0;
  for id in graph.tile_ids() {
    let tile = graph.tile(id);
    for direction in Direction::ALL {
      let Some(neighbour) = tile.neighbour(direction) else {
        continue;
      };
      let back = graph.tile(neighbour).neighbour(direction.opposite());
      if back != Some(id) {
        warn!(
          tile = %tile.key,
          neighbour = %graph.tile(neighbour).key,
          ?direction,
          "neighbour does not point back"
        );
        inconsistent += 1;
      }
    }
  }
  inconsistent
}
