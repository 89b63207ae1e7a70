//! Destination quadtree: composites, tiles and the coordinate index.
//!
//! ```text
//!   level 0            ┌───────────────┐
//!                      │   (0,0) LOD   │
//!                      └───────┬───────┘
//!             ┌───────────┬────┴──────┬───────────┐
//!   level 1  (0,0)      (1,0)       (0,1)       (1,1)
//!             BL          BR          TL          TR
//!
//!   X-only split: (2x, y) (2x+1, y)     Y-only split: (x, 2y) (x, 2y+1)
//! ```
//!
//! Composites and tiles live in one arena ([`DestinationGraph`]); parent,
//! child and neighbour links are plain indices into it, never owners. The
//! [`QuadMap`] is a separate `(level, x, y)` index used for neighbour lookup.

pub mod builder;

pub use builder::QuadtreeBuilder;

use std::collections::HashMap;
use std::fmt;

use smallvec::SmallVec;

use crate::constants::NUM_NEIGHBOURS;
use crate::geo::GeospatialExtents;
use crate::tile::DestinationTile;

// =============================================================================
// Keys and ids
// =============================================================================

/// Position of a composite or tile in the quadtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
  pub level: u32,
  pub x: i32,
  pub y: i32,
}

impl TileKey {
  pub fn new(level: u32, x: i32, y: i32) -> Self {
    Self { level, x, y }
  }

  /// Same level, shifted by `(dx, dy)`.
  #[inline]
  pub fn offset(&self, dx: i32, dy: i32) -> Self {
    Self::new(self.level, self.x + dx, self.y + dy)
  }
}

impl fmt::Display for TileKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "L{}_X{}_Y{}", self.level, self.x, self.y)
  }
}

/// Index of a composite in a [`DestinationGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeId(pub usize);

/// Index of a tile in a [`DestinationGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub usize);

// =============================================================================
// QuadMap
// =============================================================================

/// `(level, x, y)` → composite index, filled while the tree is built.
#[derive(Clone, Debug, Default)]
pub struct QuadMap {
  map: HashMap<TileKey, CompositeId>,
}

impl QuadMap {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, key: TileKey, id: CompositeId) {
    self.map.insert(key, id);
  }

  #[inline]
  pub fn get(&self, key: TileKey) -> Option<CompositeId> {
    self.map.get(&key).copied()
  }

  pub fn len(&self) -> usize {
    self.map.len()
  }

  pub fn is_empty(&self) -> bool {
    self.map.is_empty()
  }

  pub fn clear(&mut self) {
    self.map.clear();
  }
}

// =============================================================================
// CompositeDestination
// =============================================================================

/// Scene role of a composite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompositeKind {
  /// Flat grouping with no LOD selection.
  Group,
  /// Two-range level-of-detail switch.
  #[default]
  Lod,
}

/// Internal quadtree node: up to four child composites plus its own tiles.
#[derive(Clone, Debug)]
pub struct CompositeDestination {
  pub key: TileKey,
  pub name: String,
  pub extents: GeospatialExtents,
  pub max_visible_distance: f64,
  pub kind: CompositeKind,
  pub parent: Option<CompositeId>,
  pub children: SmallVec<[CompositeId; 4]>,
  pub tiles: SmallVec<[TileId; 1]>,
  /// The subtile file of this composite has been emitted.
  pub subtiles_generated: bool,
}

impl CompositeDestination {
  pub fn new(key: TileKey, name: String, extents: GeospatialExtents) -> Self {
    Self {
      key,
      name,
      extents,
      max_visible_distance: 0.0,
      kind: CompositeKind::Lod,
      parent: None,
      children: SmallVec::new(),
      tiles: SmallVec::new(),
      subtiles_generated: false,
    }
  }

  #[inline]
  pub fn level(&self) -> u32 {
    self.key.level
  }
}

// =============================================================================
// DestinationGraph
// =============================================================================

/// Arena owning every composite and tile of one build.
///
/// Per-tile equalization flags are kept beside the tiles rather than inside
/// them so they can be inspected and reset on their own.
#[derive(Debug, Default)]
pub struct DestinationGraph {
  composites: Vec<CompositeDestination>,
  tiles: Vec<DestinationTile>,
  equalized: Vec<[bool; NUM_NEIGHBOURS]>,
  root: Option<CompositeId>,
}

impl DestinationGraph {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_composite(&mut self, composite: CompositeDestination) -> CompositeId {
    self.composites.push(composite);
    CompositeId(self.composites.len() - 1)
  }

  pub fn add_tile(&mut self, tile: DestinationTile) -> TileId {
    self.tiles.push(tile);
    self.equalized.push([false; NUM_NEIGHBOURS]);
    TileId(self.tiles.len() - 1)
  }

  #[inline]
  pub fn root(&self) -> Option<CompositeId> {
    self.root
  }

  pub fn set_root(&mut self, root: Option<CompositeId>) {
    self.root = root;
  }

  #[inline]
  pub fn composite(&self, id: CompositeId) -> &CompositeDestination {
    &self.composites[id.0]
  }

  #[inline]
  pub fn composite_mut(&mut self, id: CompositeId) -> &mut CompositeDestination {
    &mut self.composites[id.0]
  }

  #[inline]
  pub fn tile(&self, id: TileId) -> &DestinationTile {
    &self.tiles[id.0]
  }

  #[inline]
  pub fn tile_mut(&mut self, id: TileId) -> &mut DestinationTile {
    &mut self.tiles[id.0]
  }

  /// Two distinct tiles mutably at once.
  pub fn tile_pair_mut(&mut self, a: TileId, b: TileId) -> (&mut DestinationTile, &mut DestinationTile) {
    assert_ne!(a, b, "tile_pair_mut needs two distinct tiles");
    if a.0 < b.0 {
      let (lo, hi) = self.tiles.split_at_mut(b.0);
      (&mut lo[a.0], &mut hi[0])
    } else {
      let (lo, hi) = self.tiles.split_at_mut(a.0);
      (&mut hi[0], &mut lo[b.0])
    }
  }

  /// Distinct tiles mutably at once, in ascending id order. Repeated and
  /// unknown ids are skipped.
  pub fn tiles_many_mut(&mut self, ids: &[TileId]) -> Vec<&mut DestinationTile> {
    let mut sorted: Vec<usize> = ids.iter().map(|id| id.0).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut out = Vec::with_capacity(sorted.len());
    let mut rest: &mut [DestinationTile] = &mut self.tiles;
    let mut offset = 0;
    for index in sorted {
      if index - offset >= rest.len() {
        break;
      }
      let (_, tail) = std::mem::take(&mut rest).split_at_mut(index - offset);
      let Some((tile, tail)) = tail.split_first_mut() else {
        break;
      };
      out.push(tile);
      rest = tail;
      offset = index + 1;
    }
    out
  }

  pub fn composites(&self) -> &[CompositeDestination] {
    &self.composites
  }

  pub fn tiles(&self) -> &[DestinationTile] {
    &self.tiles
  }

  pub fn tiles_mut(&mut self) -> &mut [DestinationTile] {
    &mut self.tiles
  }

  pub fn composite_ids(&self) -> impl Iterator<Item = CompositeId> {
    (0..self.composites.len()).map(CompositeId)
  }

  pub fn tile_ids(&self) -> impl Iterator<Item = TileId> {
    (0..self.tiles.len()).map(TileId)
  }

  #[inline]
  pub fn equalized(&self, id: TileId) -> &[bool; NUM_NEIGHBOURS] {
    &self.equalized[id.0]
  }

  #[inline]
  pub fn equalized_mut(&mut self, id: TileId) -> &mut [bool; NUM_NEIGHBOURS] {
    &mut self.equalized[id.0]
  }

  /// Clear every equalization flag.
  pub fn reset_equalization(&mut self) {
    for flags in &mut self.equalized {
      *flags = [false; NUM_NEIGHBOURS];
    }
  }

  /// First tile of the composite at `key`.
  pub fn tile_at(&self, quad_map: &QuadMap, key: TileKey) -> Option<TileId> {
    quad_map
      .get(key)
      .and_then(|id| self.composite(id).tiles.first().copied())
  }

  /// Deepest level holding a composite, None for an empty graph.
  pub fn max_level(&self) -> Option<u32> {
    self.composites.iter().map(|c| c.level()).max()
  }

  /// Composites at `level` that own tiles, grouped into rows by ascending
  /// `y`, each row ordered by `x`.
  pub fn rows_at_level(&self, level: u32) -> Vec<Vec<CompositeId>> {
    let mut rows: std::collections::BTreeMap<i32, Vec<CompositeId>> = Default::default();
    for id in self.composite_ids() {
      let c = self.composite(id);
      if c.level() == level && !c.tiles.is_empty() {
        rows.entry(c.key.y).or_default().push(id);
      }
    }
    rows
      .into_values()
      .map(|mut row| {
        row.sort_by_key(|id| self.composite(*id).key.x);
        row
      })
      .collect()
  }

  /// Every tile of `composite`'s children has been equalized.
  pub fn children_complete(&self, composite: CompositeId) -> bool {
    self
      .composite(composite)
      .children
      .iter()
      .flat_map(|c| self.composite(*c).tiles.iter())
      .all(|t| self.tile(*t).complete)
  }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
