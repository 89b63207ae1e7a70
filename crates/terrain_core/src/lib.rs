//! terrain_core - Paged terrain database construction
//!
//! Partitions a geospatial extent into a quadtree of tiles sized by the
//! resolution of the available sources, averages imagery and elevation
//! across shared tile boundaries, and assembles the tiles into an
//! LOD/PagedLOD scene hierarchy streamed level by level to a writer.
//!
//! # Pipeline
//!
//! ```text
//!   SourceCollection ─▶ QuadtreeBuilder ─▶ DestinationGraph + QuadMap
//!                                               │
//!                 read rows ─▶ equalize rows ─▶ SceneAssembler ─▶ SceneWriter
//! ```
//!
//! # Example
//!
//! ```ignore
//! use terrain_core::{BuildOptions, DataSet, MemorySceneWriter, MemorySources};
//!
//! let mut sources = MemorySources::new();
//! sources.add_image("ortho", extents, 0, image);
//!
//! let mut dataset = DataSet::new(BuildOptions::default(), sources);
//! dataset.build_destination_graph()?;
//!
//! let mut writer = MemorySceneWriter::new();
//! let stats = dataset.write_destination(&mut writer)?;
//! ```

pub mod constants;
pub mod error;
pub mod types;

pub use error::{BuildError, Result};
pub use types::{BufferSize, DataType, HeightGrid, ImageBuffer, PixelFormat, Resolution};

// Extents, coordinate systems, ellipsoid
pub mod geo;
pub use geo::{CoordinateKind, CoordinateSystem, EllipsoidModel, GeoTransform, GeospatialExtents, SpatialProperties};

// Source capability and the in-memory collection
pub mod source;
pub use source::{MemorySources, Source, SourceCollection, SourceId, SourceType};

pub mod options;
pub use options::{BuildMode, BuildOptions, DatabaseType, GeometryType};

// Destination quadtree
pub mod quadtree;
pub use quadtree::{CompositeDestination, CompositeId, CompositeKind, DestinationGraph, QuadMap, QuadtreeBuilder, TileId, TileKey};

pub mod tile;
pub use tile::{DestinationTile, Direction, TilePhase};

// Boundary equalization
pub mod equalize;
pub use equalize::{equalize_boundaries, equalize_row};

// Scene assembly and output
pub mod scene;
pub use scene::{MemorySceneWriter, SceneAssembler, SceneNode, SceneWriter};

// Orchestration
pub mod dataset;
pub use dataset::{BuildStats, ChannelTaskSink, DataSet, RecordingTaskSink, Task, TaskSink};

#[cfg(test)]
pub(crate) mod test_utils;
