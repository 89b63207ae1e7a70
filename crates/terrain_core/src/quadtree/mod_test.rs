use super::*;
use crate::test_utils::*;
use crate::types::DataType;

fn tile(key: TileKey) -> DestinationTile {
  DestinationTile::new(key.to_string(), key, extents(0.0, 0.0, 1.0, 1.0), DataType::Raster, 0)
}

/// Keys print as `L{level}_X{x}_Y{y}`.
#[test]
fn test_tile_key_display() {
  assert_eq!(TileKey::new(3, -1, 7).to_string(), "L3_X-1_Y7");
  assert_eq!(TileKey::new(2, 4, 4).offset(-1, 1), TileKey::new(2, 3, 5));
}

/// Ids are handed out in insertion order and flags start cleared.
#[test]
fn test_arena_ids() {
  let mut graph = DestinationGraph::new();
  let a = graph.add_tile(tile(TileKey::new(0, 0, 0)));
  let b = graph.add_tile(tile(TileKey::new(1, 0, 0)));
  assert_eq!((a, b), (TileId(0), TileId(1)));
  assert_eq!(graph.equalized(b), &[false; NUM_NEIGHBOURS]);
}

/// Both orders of a pair yield the requested tiles.
#[test]
fn test_tile_pair_mut() {
  let mut graph = DestinationGraph::new();
  let a = graph.add_tile(tile(TileKey::new(0, 0, 0)));
  let b = graph.add_tile(tile(TileKey::new(0, 1, 0)));

  let (ta, tb) = graph.tile_pair_mut(a, b);
  assert_eq!((ta.key.x, tb.key.x), (0, 1));
  let (tb, ta) = graph.tile_pair_mut(b, a);
  assert_eq!((ta.key.x, tb.key.x), (0, 1));
}

/// Many tiles at once, ascending, without repeats or unknown ids.
#[test]
fn test_tiles_many_mut() {
  let mut graph = DestinationGraph::new();
  for x in 0..5 {
    graph.add_tile(tile(TileKey::new(0, x, 0)));
  }

  let tiles = graph.tiles_many_mut(&[TileId(3), TileId(1), TileId(3), TileId(9)]);
  let xs: Vec<i32> = tiles.iter().map(|t| t.key.x).collect();
  assert_eq!(xs, vec![1, 3]);

  for t in graph.tiles_many_mut(&[TileId(0), TileId(4)]) {
    t.key.y = 7;
  }
  let ys: Vec<i32> = graph.tiles().iter().map(|t| t.key.y).collect();
  assert_eq!(ys, vec![7, 0, 0, 0, 7]);
}

/// Resetting clears every flag.
#[test]
fn test_reset_equalization() {
  let (mut graph, _, ids) = populated_grid(2, 1, 4, 3);
  graph.equalized_mut(ids[0][0])[2] = true;
  graph.equalized_mut(ids[0][1])[5] = true;
  graph.reset_equalization();
  assert!(graph.tile_ids().all(|id| graph.equalized(id).iter().all(|f| !f)));
}

/// Rows come out bottom first, each sorted by x.
#[test]
fn test_rows_at_level() {
  let (graph, _, ids) = populated_grid(3, 2, 4, 3);
  let rows = graph.rows_at_level(1);
  assert_eq!(rows.len(), 2);
  let xs: Vec<_> = rows[1].iter().map(|c| graph.composite(*c).key.x).collect();
  assert_eq!(xs, vec![0, 1, 2]);
  assert_eq!(graph.composite(rows[0][0]).tiles[0], ids[0][0]);
  assert!(graph.rows_at_level(0).is_empty());
}

/// `tile_at` resolves through the QuadMap.
#[test]
fn test_tile_at() {
  let (graph, quad_map, ids) = populated_grid(2, 2, 4, 3);
  assert_eq!(graph.tile_at(&quad_map, TileKey::new(1, 1, 1)), Some(ids[1][1]));
  assert_eq!(graph.tile_at(&quad_map, TileKey::new(1, 2, 1)), None);
}
