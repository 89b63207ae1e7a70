//! Build orchestration: sources in, scene files out.
//!
//! ```text
//!   build_destination_graph
//!     quadtree ─▶ neighbours ─▶ back-propagate required resolutions
//!
//!   write_destination (paged), per level, rows by ascending y:
//!
//!     read(0)
//!     ┌──────────────────────────────────────────────┐
//!     │ read(n+1)   row above must hold data before  │
//!     │ equalize(n) row n averages its top boundary  │
//!     │ write(n)    parent subtile files, release    │
//!     └──────────────────────────────────────────────┘
//! ```
//!
//! A parent's subtile file is written once every tile among its children is
//! complete; the children's buffers are dropped straight after. The root
//! composite goes to `{basename}{extension}`.
//!
//! In LOD mode every row is read and equalized first and the whole tree is
//! written as one scene.

pub mod stats;
pub mod tasks;

pub use stats::BuildStats;
pub use tasks::{ChannelTaskSink, RecordingTaskSink, Task, TaskSink};

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, info_span, warn};
use web_time::Instant;

use self::stats::elapsed_us;
use crate::equalize::equalize_row;
use crate::error::{BuildError, Result};
use crate::geo::{CoordinateSystem, EllipsoidModel, GeospatialExtents};
use crate::options::{BuildMode, BuildOptions, DatabaseType};
use crate::quadtree::{CompositeId, DestinationGraph, QuadMap, QuadtreeBuilder, TileId};
use crate::scene::{SceneAssembler, SceneNode, SceneWriter};
use crate::source::{SourceCollection, SourceId, SourceType};
use crate::tile::{check_neighbouring_tiles, compute_neighbours_from_quad_map, DestinationTile, TilePhase};
use crate::types::Resolution;

/// Drives one build over a source collection.
pub struct DataSet<S: SourceCollection> {
  options: BuildOptions,
  sources: S,
  extents: Option<GeospatialExtents>,
  cs: Option<Arc<CoordinateSystem>>,
  ellipsoid: EllipsoidModel,
  mode: BuildMode,
  graph: Option<DestinationGraph>,
  quad_map: QuadMap,
  stats: BuildStats,
}

impl<S: SourceCollection> DataSet<S> {
  pub fn new(options: BuildOptions, sources: S) -> Self {
    Self {
      options,
      sources,
      extents: None,
      cs: None,
      ellipsoid: EllipsoidModel::default(),
      mode: BuildMode::Full,
      graph: None,
      quad_map: QuadMap::new(),
      stats: BuildStats::default(),
    }
  }

  /// Extents to tile; the union of all sources when unset.
  pub fn set_destination_extents(&mut self, extents: GeospatialExtents) {
    self.extents = Some(extents);
  }

  pub fn set_destination_coordinate_system(&mut self, cs: Arc<CoordinateSystem>) {
    self.cs = Some(cs);
  }

  pub fn set_build_mode(&mut self, mode: BuildMode) {
    self.mode = mode;
  }

  pub fn options(&self) -> &BuildOptions {
    &self.options
  }

  pub fn sources(&self) -> &S {
    &self.sources
  }

  pub fn graph(&self) -> Option<&DestinationGraph> {
    self.graph.as_ref()
  }

  pub fn quad_map(&self) -> &QuadMap {
    &self.quad_map
  }

  pub fn stats(&self) -> &BuildStats {
    &self.stats
  }

  fn is_geographic(&self) -> bool {
    self.cs.as_ref().is_some_and(|cs| cs.is_geographic())
  }

  fn is_geocentric(&self) -> bool {
    self.options.convert_from_geographic_to_geocentric && self.is_geographic()
  }

  /// Union of every source's extents.
  fn source_extents(&self) -> GeospatialExtents {
    let mut extents = GeospatialExtents::invalid();
    for source in self.sources.sources() {
      extents.expand_by(&source.properties.extents);
    }
    extents
  }

  // ===========================================================================
  // Destination graph
  // ===========================================================================

  /// Build the destination quadtree, wire neighbours and tell sources which
  /// resolutions the tiles will request.
  pub fn build_destination_graph(&mut self) -> Result<()> {
    let _span = info_span!("build_destination_graph").entered();
    let start = Instant::now();

    let mut extents = self.extents.unwrap_or_else(|| self.source_extents());
    if !extents.valid() {
      warn!("no destination extents and no sources to derive them from");
      return Err(BuildError::NoDestination);
    }
    extents.is_geographic |= self.is_geographic();

    let mut graph = DestinationGraph::new();
    self.quad_map.clear();
    let subtile = self.mode.subtile_key();
    QuadtreeBuilder::new(&self.options, &self.sources)
      .with_coordinate_system(self.cs.as_deref())
      .with_ellipsoid(self.ellipsoid)
      .with_subtile(subtile)
      .build(extents, &mut graph, &mut self.quad_map);

    if let Some(key) = subtile {
      if self.quad_map.get(key).is_none() {
        return Err(BuildError::UnknownSubtile(key));
      }
    }

    compute_neighbours_from_quad_map(&mut graph, &self.quad_map);
    let inconsistent = check_neighbouring_tiles(&graph);
    if inconsistent > 0 {
      warn!(inconsistent, "neighbour back-pointers disagree");
    }

    self.update_sources_for_destination_needs(&graph);

    self.stats.composites_created = graph.composites().len();
    self.stats.tiles_created = graph.tiles().len();
    self.stats.build_graph_us = elapsed_us(start);
    info!(
      composites = self.stats.composites_created,
      tiles = self.stats.tiles_created,
      levels = graph.max_level().map_or(0, |l| l + 1),
      "destination graph built"
    );
    self.graph = Some(graph);
    Ok(())
  }

  /// Record on every source the presented resolutions of the tiles it feeds.
  fn update_sources_for_destination_needs(&mut self, graph: &DestinationGraph) {
    let _span = info_span!("update_sources").entered();

    let mut needs: Vec<(SourceId, Resolution)> = Vec::new();
    for tile in graph.tiles() {
      let images: Vec<Option<Resolution>> = (0..tile.imagery.len())
        .map(|layer| {
          tile
            .compute_image_resolution(layer, self.options.maximum_tile_image_size)
            .map(|s| s.resolution)
        })
        .collect();
      let terrain = tile
        .compute_terrain_resolution(self.options.maximum_tile_terrain_size)
        .map(|s| s.resolution);

      for (id, source) in self.sources.sources().iter().enumerate() {
        if !source.covers_level(tile.level()) || !self.sources.intersects(id, &tile.extents) {
          continue;
        }
        let needed = match source.source_type {
          SourceType::Image => images.get(source.layer as usize).copied().flatten(),
          SourceType::HeightField => terrain,
          SourceType::Model | SourceType::Vector => None,
        };
        if let Some(resolution) = needed {
          needs.push((id, resolution));
        }
      }
    }

    debug!(requests = needs.len(), "required resolutions");
    for (id, resolution) in needs {
      self.sources.add_required_resolution(id, resolution);
    }
  }

  // ===========================================================================
  // Writing
  // ===========================================================================

  /// Read, equalize and write every processed level of the graph.
  pub fn write_destination(&mut self, writer: &mut dyn SceneWriter) -> Result<BuildStats> {
    if self.graph.is_none() {
      return Err(BuildError::NoDestination);
    }

    let mut failures = WriteFailures::default();
    match self.options.database_type {
      DatabaseType::PagedLod => self.write_paged(writer, &mut failures),
      DatabaseType::Lod => self.write_single_scene(writer, &mut failures),
    }

    self.stats.write_failures = failures.count;
    info!(
      files = self.stats.files_written,
      failures = failures.count,
      released = self.stats.tiles_released,
      "destination written"
    );
    match failures.first {
      Some(first) => Err(BuildError::WriteFailed {
        failed: failures.count,
        first,
      }),
      None => Ok(self.stats.clone()),
    }
  }

  fn processed_levels(&self) -> Vec<u32> {
    let max_level = self.graph.as_ref().and_then(|g| g.max_level()).unwrap_or(0);
    (0..=max_level).filter(|l| self.mode.processes_level(*l)).collect()
  }

  fn rows_at_level(&self, level: u32) -> Vec<Vec<CompositeId>> {
    self.graph.as_ref().map(|g| g.rows_at_level(level)).unwrap_or_default()
  }

  fn write_paged(&mut self, writer: &mut dyn SceneWriter, failures: &mut WriteFailures) {
    for level in self.processed_levels() {
      let rows = self.rows_at_level(level);
      if rows.is_empty() {
        continue;
      }
      info!(level, rows = rows.len(), "writing level");

      self.read_row(&rows[0]);
      for (n, row) in rows.iter().enumerate() {
        if let Some(next) = rows.get(n + 1) {
          self.read_row(next);
        }
        self.equalize_row(row);
        self.write_row(row, writer, failures);
      }
    }
  }

  fn write_single_scene(&mut self, writer: &mut dyn SceneWriter, failures: &mut WriteFailures) {
    for level in self.processed_levels() {
      let rows = self.rows_at_level(level);
      for row in &rows {
        self.read_row(row);
      }
      for row in &rows {
        self.equalize_row(row);
      }
    }

    let geocentric = self.is_geocentric();
    let Some(graph) = self.graph.as_mut() else {
      return;
    };
    let Some(root) = graph.root() else {
      return;
    };
    let _span = info_span!("write_row", level = 0).entered();
    let start = Instant::now();
    let scene = {
      let assembler = SceneAssembler::new(graph, &self.options, self.ellipsoid, geocentric);
      assembler
        .create_scene(root)
        .map(|node| assembler.decorate(node, self.cs.as_deref()))
    };
    if let Some(scene) = scene {
      let file_name = self.options.root_file_name();
      write_file(writer, &scene, &file_name, &mut self.stats, failures);
    }

    let equalized: Vec<TileId> = graph
      .tile_ids()
      .filter(|id| graph.tile(*id).phase() == TilePhase::Equalized)
      .collect();
    release_tiles(graph, &equalized, &mut self.stats);
    self.stats.write_us += elapsed_us(start);
  }

  /// Allocate and populate every tile of `row`.
  fn read_row(&mut self, row: &[CompositeId]) {
    let Some(graph) = self.graph.as_mut() else {
      return;
    };
    let _span = info_span!("read_row", composites = row.len()).entered();
    let start = Instant::now();

    let ids: Vec<TileId> = row
      .iter()
      .flat_map(|c| graph.composite(*c).tiles.iter().copied())
      .collect();
    let options = &self.options;
    let sources = &self.sources;
    let populate = |tile: &mut DestinationTile| {
      let outcome = tile.allocate(options).and_then(|()| tile.read_from(sources));
      if let Err(e) = &outcome {
        warn!(tile = %tile.key, "{e}");
      }
      outcome.is_ok()
    };

    let tiles = graph.tiles_many_mut(&ids);
    let read = if options.parallel_read {
      tiles.into_par_iter().map(populate).filter(|ok| *ok).count()
    } else {
      tiles.into_iter().map(populate).filter(|ok| *ok).count()
    };

    self.stats.tiles_read += read;
    self.stats.read_us += elapsed_us(start);
  }

  /// Average the boundaries of `row` and mark its tiles complete.
  fn equalize_row(&mut self, row: &[CompositeId]) {
    let Some(graph) = self.graph.as_mut() else {
      return;
    };
    let start = Instant::now();
    let tiles: Vec<TileId> = row
      .iter()
      .flat_map(|c| graph.composite(*c).tiles.iter().copied())
      .collect();

    if self.options.equalize_boundaries {
      equalize_row(graph, &tiles);
    }
    for id in &tiles {
      let tile = graph.tile_mut(*id);
      match tile.mark_equalized() {
        Ok(()) => self.stats.tiles_equalized += 1,
        Err(e) => warn!("{e}"),
      }
    }
    self.stats.equalize_us += elapsed_us(start);
  }

  /// Write the subtile files that `row` completes, and the root file.
  fn write_row(&mut self, row: &[CompositeId], writer: &mut dyn SceneWriter, failures: &mut WriteFailures) {
    let geocentric = self.is_geocentric();
    let Some(graph) = self.graph.as_mut() else {
      return;
    };
    let _span = info_span!("write_row", composites = row.len()).entered();
    let start = Instant::now();

    for &id in row {
      match graph.composite(id).parent {
        Some(parent) => {
          let p = graph.composite(parent);
          if p.subtiles_generated || !self.mode.writes_subtile_of(p.level()) || !graph.children_complete(parent) {
            continue;
          }
          let file_name = self.options.subtile_file_name(&p.name);
          let scene = SceneAssembler::new(graph, &self.options, self.ellipsoid, geocentric).create_sub_tile_scene(parent);
          graph.composite_mut(parent).subtiles_generated = true;
          if let Some(scene) = scene {
            write_file(writer, &scene, &file_name, &mut self.stats, failures);
          }

          let children: Vec<TileId> = graph
            .composite(parent)
            .children
            .iter()
            .flat_map(|c| graph.composite(*c).tiles.iter().copied())
            .collect();
          release_tiles(graph, &children, &mut self.stats);
        }
        None => {
          let scene = {
            let assembler = SceneAssembler::new(graph, &self.options, self.ellipsoid, geocentric);
            assembler
              .create_paged_lod_scene(id)
              .map(|node| assembler.decorate(node, self.cs.as_deref()))
          };
          if let Some(scene) = scene {
            let file_name = self.options.root_file_name();
            write_file(writer, &scene, &file_name, &mut self.stats, failures);
          }
          let own: Vec<TileId> = graph.composite(id).tiles.to_vec();
          release_tiles(graph, &own, &mut self.stats);
        }
      }
    }
    self.stats.write_us += elapsed_us(start);
  }

  // ===========================================================================
  // Distributed builds
  // ===========================================================================

  /// Emit the root task and one task per split-level composite with
  /// children. Returns the number of tasks emitted.
  pub fn generate_tasks(
    &self,
    sink: &mut dyn TaskSink,
    split_level: u32,
    command: &str,
    source_file: &str,
  ) -> Result<usize> {
    let graph = self.graph.as_ref().ok_or(BuildError::NoDestination)?;
    let basename = &self.options.tile_basename;

    sink.add_task(Task {
      task_file: format!("{basename}_root.task"),
      command_line: format!("{command} --split-level {split_level}"),
      source_dependency: source_file.to_string(),
    });
    let mut count = 1;

    for composite in graph.composites() {
      if composite.level() != split_level || composite.children.is_empty() {
        continue;
      }
      let key = composite.key;
      sink.add_task(Task {
        task_file: format!("{}.task", composite.name),
        command_line: format!("{command} --subtile {} {} {}", key.level, key.x, key.y),
        source_dependency: source_file.to_string(),
      });
      count += 1;
    }

    info!(tasks = count, split_level, "tasks generated");
    Ok(count)
  }
}

/// Failed writes of one run.
#[derive(Default)]
struct WriteFailures {
  count: usize,
  first: Option<String>,
}

fn write_file(
  writer: &mut dyn SceneWriter,
  scene: &SceneNode,
  file_name: &str,
  stats: &mut BuildStats,
  failures: &mut WriteFailures,
) {
  match writer.write(scene, file_name) {
    Ok(()) => {
      debug!(file_name, "written");
      stats.files_written += 1;
    }
    Err(e) => {
      warn!(file_name, "write failed: {e}");
      failures.count += 1;
      failures.first.get_or_insert_with(|| format!("{file_name}: {e}"));
    }
  }
}

/// Mark tiles emitted and drop their buffers.
fn release_tiles(graph: &mut DestinationGraph, tiles: &[TileId], stats: &mut BuildStats) {
  for &id in tiles {
    let tile = graph.tile_mut(id);
    match tile.mark_emitted().and_then(|()| tile.unref_data()) {
      Ok(()) => stats.tiles_released += 1,
      Err(e) => warn!("{e}"),
    }
  }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
