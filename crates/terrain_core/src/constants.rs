//! Numeric constants shared by the destination quadtree, the tile sizing
//! rules and the scene assembler.
//!
//! # Resolution Heuristics
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     SPLIT DECISION                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   presented_res * RESOLUTION_SENSITIVITY > best_source_res      │
//! │                                                                 │
//! │   true  -> source holds more detail than this tile shows,       │
//! │            split the axis                                       │
//! │   false -> tile already presents the source at full detail      │
//! │                                                                 │
//! │   Both axes want to split:                                      │
//! │     height/width > MAX_ASPECT_RATIO  -> split Y only            │
//! │     height/width < MIN_ASPECT_RATIO  -> split X only            │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The sensitivity and aspect thresholds have no derivation behind them;
//! they are kept at these exact values for output compatibility.

/// Scale applied to a tile's presented resolution before it is compared with
/// the best available source resolution.
pub const RESOLUTION_SENSITIVITY: f64 = 0.9;

/// Aspect ratio (height / width) above which a dual-axis split drops the X
/// split.
pub const MAX_ASPECT_RATIO: f64 = 1.414;

/// Aspect ratio (height / width) below which a dual-axis split drops the Y
/// split.
pub const MIN_ASPECT_RATIO: f64 = 0.707;

/// Smallest image buffer edge, keeps mipmap generation away from 2x2 and 1x1.
pub const MIN_IMAGE_SIZE: u32 = 4;

/// Fewest vertices along a height grid edge.
pub const MIN_TERRAIN_SIZE: u32 = 2;

/// Grid edge used for tiles without terrain data and for flattened tiles.
pub const MIN_FLAT_GRID_SIZE: u32 = 8;

/// Longitude/latitude degrees covered by one segment of a generated flat
/// grid when mapping to geocentric coordinates.
pub const DEGREES_PER_FLAT_SEGMENT: f64 = 1.0;

/// Visible distance of a child is this fraction of its parent's.
pub const CHILD_VISIBLE_DISTANCE_SCALE: f64 = 0.5;

/// Number of neighbour slots per tile (4 edges + 4 corners).
pub const NUM_NEIGHBOURS: usize = 8;

/// Level limit used when a source does not declare one.
pub const MAXIMUM_NUMBER_OF_LEVELS: u32 = 30;

// =============================================================================
// WGS84 ellipsoid
// =============================================================================

/// WGS84 equatorial radius in metres.
pub const WGS_84_RADIUS_EQUATOR: f64 = 6_378_137.0;

/// WGS84 polar radius in metres.
pub const WGS_84_RADIUS_POLAR: f64 = 6_356_752.314_245_1;

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
