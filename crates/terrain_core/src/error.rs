//! Error type for the orchestrator's fallible entry points.
//!
//! Inner per-tile, per-layer and per-neighbour loops never surface these;
//! they log and skip. Only `DataSet` entry points return them.

use thiserror::Error;

use crate::quadtree::TileKey;
use crate::tile::TilePhase;

#[derive(Debug, Error)]
pub enum BuildError {
  /// A tile operation was called out of lifecycle order.
  #[error("tile {tile} is {found:?}, operation `{operation}` requires {expected}")]
  PhaseViolation {
    tile: TileKey,
    operation: &'static str,
    expected: &'static str,
    found: TilePhase,
  },

  /// `write_destination` or `generate_tasks` before a graph exists.
  #[error("destination graph has not been built")]
  NoDestination,

  /// The requested subtile lies outside the built graph.
  #[error("subtile {0} does not exist in the destination graph")]
  UnknownSubtile(TileKey),

  /// A source could not fill a tile buffer.
  #[error("reading source `{source_name}` failed: {reason}")]
  SourceRead { source_name: String, reason: String },

  /// One or more scene files could not be written.
  #[error("{failed} scene file(s) failed to write, first: {first}")]
  WriteFailed { failed: usize, first: String },
}

pub type Result<T> = std::result::Result<T, BuildError>;
