use super::*;
use crate::test_utils::*;
use crate::types::{ImageBuffer, PixelFormat};

fn equalize_all(graph: &mut crate::quadtree::DestinationGraph, ids: &[Vec<TileId>]) {
  for row in ids {
    equalize_row(graph, row);
  }
}

/// Deterministic per-pixel pattern so every seam starts out mismatched.
fn paint_pattern(graph: &mut crate::quadtree::DestinationGraph, ids: &[Vec<TileId>]) {
  for (i, id) in ids.iter().flatten().enumerate() {
    let tile = graph.tile_mut(*id);
    let image = tile.imagery[0].image.as_mut().unwrap();
    for y in 0..image.height() {
      for x in 0..image.width() {
        let v = (x * 7 + y * 13 + i as u32 * 31) % 256;
        image.set_rgb(x, y, [v as u8, (255 - v) as u8, (v / 2) as u8]);
      }
    }
    let grid = tile.terrain.as_mut().unwrap();
    for r in 0..grid.num_rows() {
      for c in 0..grid.num_columns() {
        grid.set_height(c, r, (c * 3 + r * 5) as f32 + i as f32 * 10.0);
      }
    }
  }
}

// =========================================================================
// Edges
// =========================================================================

/// Two tiles side by side meet at the mean along the whole shared column.
#[test]
fn test_edge_average() {
  let (mut graph, _, ids) = populated_grid(2, 1, 4, 3);
  let (a, b) = (ids[0][0], ids[0][1]);
  fill_tile(&mut graph, a, [0, 0, 0], 0.0);
  fill_tile(&mut graph, b, [100, 50, 200], 10.0);

  equalize_boundaries(&mut graph, a);

  let ia = graph.tile(a).image(0).unwrap();
  let ib = graph.tile(b).image(0).unwrap();
  for y in 0..4 {
    assert_eq!(ia.rgb(3, y), [50, 25, 100], "row {y}");
    assert_eq!(ib.rgb(0, y), [50, 25, 100], "row {y}");
  }
  assert_eq!(ia.rgb(2, 1), [0, 0, 0], "interior untouched");
  assert_eq!(ib.rgb(1, 1), [100, 50, 200], "interior untouched");

  let ga = graph.tile(a).terrain.as_ref().unwrap();
  let gb = graph.tile(b).terrain.as_ref().unwrap();
  for r in 0..3 {
    assert_eq!(ga.height(2, r), 5.0);
    assert_eq!(gb.height(0, r), 5.0);
  }
}

/// Slopes across a shared edge are stored on both sides, one per interior
/// sample.
#[test]
fn test_height_deltas_shared() {
  let (mut graph, _, ids) = populated_grid(2, 1, 4, 5);
  paint_pattern(&mut graph, &ids);
  let (a, b) = (ids[0][0], ids[0][1]);

  equalize_boundaries(&mut graph, a);

  let right = &graph.tile(a).height_deltas[Direction::Right.index()];
  let left = &graph.tile(b).height_deltas[Direction::Left.index()];
  assert_eq!(right.len(), 3);
  assert_eq!(right, left);
  assert!(graph.tile(a).height_deltas[Direction::Left.index()].is_empty());
}

/// After a full pass every shared boundary is bit-identical on both sides.
#[test]
fn test_edges_bit_identical() {
  let (mut graph, _, ids) = populated_grid(3, 3, 8, 5);
  paint_pattern(&mut graph, &ids);
  equalize_all(&mut graph, &ids);

  for row in 0..3 {
    for col in 0..3 {
      let id = ids[row][col];
      let tile = graph.tile(id);
      let image = tile.image(0).unwrap();
      let grid = tile.terrain.as_ref().unwrap();
      if col + 1 < 3 {
        let right = graph.tile(ids[row][col + 1]);
        let (ri, rg) = (right.image(0).unwrap(), right.terrain.as_ref().unwrap());
        for y in 0..8 {
          assert_eq!(image.rgb(7, y), ri.rgb(0, y));
        }
        for r in 0..5 {
          assert_eq!(grid.height(4, r).to_bits(), rg.height(0, r).to_bits());
        }
      }
      if row + 1 < 3 {
        let above = graph.tile(ids[row + 1][col]);
        let (ai, ag) = (above.image(0).unwrap(), above.terrain.as_ref().unwrap());
        for x in 0..8 {
          assert_eq!(image.rgb(x, 7), ai.rgb(x, 0));
        }
        for c in 0..5 {
          assert_eq!(grid.height(c, 4).to_bits(), ag.height(c, 0).to_bits());
        }
      }
    }
  }
}

/// A second pass changes nothing.
#[test]
fn test_idempotent() {
  let (mut graph, _, ids) = populated_grid(3, 2, 8, 5);
  paint_pattern(&mut graph, &ids);
  equalize_all(&mut graph, &ids);
  let first = snapshot(&graph);

  equalize_all(&mut graph, &ids);
  assert_eq!(snapshot(&graph), first);
}

/// Mismatched pixel formats leave the image seam alone but still
/// equalize heights.
#[test]
fn test_mismatched_formats_skipped() {
  let (mut graph, _, ids) = populated_grid(2, 1, 4, 3);
  let (a, b) = (ids[0][0], ids[0][1]);
  fill_tile(&mut graph, a, [0, 0, 0], 0.0);
  fill_tile(&mut graph, b, [100, 100, 100], 10.0);
  graph.tile_mut(b).imagery[0].image = Some(ImageBuffer::new(4, 4, PixelFormat::Rgba8, [100, 100, 100]));

  equalize_boundaries(&mut graph, a);

  assert_eq!(graph.tile(a).image(0).unwrap().rgb(3, 1), [0, 0, 0]);
  assert_eq!(graph.tile(b).image(0).unwrap().rgb(0, 1), [100, 100, 100]);
  assert_eq!(graph.tile(a).terrain.as_ref().unwrap().height(2, 1), 5.0);
}

/// Edge lengths that differ are skipped.
#[test]
fn test_mismatched_sizes_skipped() {
  let (mut graph, _, ids) = populated_grid(2, 1, 4, 3);
  let (a, b) = (ids[0][0], ids[0][1]);
  fill_tile(&mut graph, a, [0, 0, 0], 0.0);
  graph.tile_mut(b).imagery[0].image = Some(solid_image(8, 8, [90, 90, 90]));

  equalize_boundaries(&mut graph, a);
  assert_eq!(graph.tile(a).image(0).unwrap().rgb(3, 1), [0, 0, 0]);
}

// =========================================================================
// Corners
// =========================================================================

/// Four tiles sharing a corner all end up with the mean corner value.
#[test]
fn test_four_way_corner() {
  let (mut graph, _, ids) = populated_grid(2, 2, 4, 3);
  fill_tile(&mut graph, ids[0][0], [0, 0, 0], 0.0);
  fill_tile(&mut graph, ids[0][1], [40, 40, 40], 4.0);
  fill_tile(&mut graph, ids[1][0], [80, 80, 80], 8.0);
  fill_tile(&mut graph, ids[1][1], [120, 120, 120], 12.0);

  equalize_corner(&mut graph, ids[0][0], Direction::RightAbove);

  let corners = [
    (ids[0][0], (3, 3), (2, 2)),
    (ids[0][1], (0, 3), (0, 2)),
    (ids[1][0], (3, 0), (2, 0)),
    (ids[1][1], (0, 0), (0, 0)),
  ];
  for (id, (px, py), (gc, gr)) in corners {
    let tile = graph.tile(id);
    assert_eq!(tile.image(0).unwrap().rgb(px, py), [60, 60, 60]);
    assert_eq!(tile.terrain.as_ref().unwrap().height(gc, gr), 6.0);
  }
  assert!(graph.equalized(ids[1][1])[Direction::LeftBelow.index()]);
  assert!(graph.equalized(ids[0][1])[Direction::AboveLeft.index()]);
  assert!(graph.equalized(ids[1][0])[Direction::BelowRight.index()]);
}

/// A lone corner is flagged but untouched.
#[test]
fn test_lone_corner() {
  let (mut graph, _, ids) = populated_grid(1, 1, 4, 3);
  fill_tile(&mut graph, ids[0][0], [7, 7, 7], 1.0);
  equalize_corner(&mut graph, ids[0][0], Direction::LeftBelow);
  assert!(graph.equalized(ids[0][0])[Direction::LeftBelow.index()]);
  assert_eq!(graph.tile(ids[0][0]).image(0).unwrap().rgb(0, 0), [7, 7, 7]);
}

/// One call raises the tile's own flags and the matching ones on its
/// neighbours.
#[test]
fn test_flags_propagate() {
  let (mut graph, _, ids) = populated_grid(2, 1, 4, 3);
  equalize_boundaries(&mut graph, ids[0][0]);

  assert!(graph.equalized(ids[0][0]).iter().all(|f| *f));
  let right = graph.equalized(ids[0][1]);
  assert!(right[Direction::Left.index()]);
  assert!(right[Direction::LeftBelow.index()]);
  assert!(right[Direction::AboveLeft.index()]);
  assert!(!right[Direction::Right.index()]);
}
