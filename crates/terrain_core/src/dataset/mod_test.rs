use super::*;
use crate::quadtree::TileKey;
use crate::scene::{Mesh, MemorySceneWriter};
use crate::source::{MemorySources, Source};
use crate::test_utils::*;
use crate::types::{DataType, HeightGrid, ImageBuffer};
use std::sync::Mutex;

const RED: [u8; 3] = [255, 0, 0];
const BLUE: [u8; 3] = [0, 0, 255];

/// 0..100 square at 0.1 units per pixel: a root and four children with
/// two levels, sixteen grandchildren with three.
fn square(max_levels: u32) -> DataSet<MemorySources> {
  let sources = image_sources(extents(0.0, 0.0, 100.0, 100.0), 0.1, [10, 20, 30]);
  DataSet::new(BuildOptions::default().with_max_levels(max_levels), sources)
}

/// 200 by 100, red left half and blue right half: the aspect veto splits the
/// root into two children side by side.
fn red_blue(options: BuildOptions) -> DataSet<MemorySources> {
  let mut sources = MemorySources::new();
  add_image(&mut sources, extents(0.0, 0.0, 100.0, 100.0), 0.25, RED);
  add_image(&mut sources, extents(100.0, 0.0, 200.0, 100.0), 0.25, BLUE);
  DataSet::new(options.with_max_levels(2), sources)
}

fn meshes(node: &SceneNode) -> Vec<&Mesh> {
  let mut out = Vec::new();
  node.visit(&mut |n| {
    if let SceneNode::Mesh(mesh) = n {
      out.push(mesh);
    }
  });
  out
}

fn all_phases(dataset: &DataSet<MemorySources>) -> Vec<TilePhase> {
  dataset.graph().unwrap().tiles().iter().map(|t| t.phase()).collect()
}

// =============================================================================
// Graph construction
// =============================================================================

/// Extents default to the union of the sources.
#[test]
fn test_default_extents_from_sources() {
  let mut sources = MemorySources::new();
  add_image(&mut sources, extents(0.0, 0.0, 50.0, 50.0), 1.0, RED);
  add_image(&mut sources, extents(50.0, 25.0, 100.0, 75.0), 1.0, BLUE);
  let mut dataset = DataSet::new(BuildOptions::default(), sources);
  dataset.build_destination_graph().unwrap();

  let graph = dataset.graph().unwrap();
  let root = graph.composite(graph.root().unwrap());
  assert_eq!(root.extents, extents(0.0, 0.0, 100.0, 75.0));
}

/// Without sources or explicit extents there is nothing to build.
#[test]
fn test_no_sources_no_destination() {
  let mut dataset = DataSet::new(BuildOptions::default(), MemorySources::new());
  assert!(matches!(dataset.build_destination_graph(), Err(BuildError::NoDestination)));
}

/// Explicit extents without sources give one empty tile.
#[test]
fn test_explicit_extents_without_sources() {
  let mut dataset = DataSet::new(BuildOptions::default(), MemorySources::new());
  dataset.set_destination_extents(extents(0.0, 0.0, 10.0, 10.0));
  dataset.build_destination_graph().unwrap();
  assert_eq!(dataset.stats().tiles_created, 1);
  assert!(!dataset.graph().unwrap().tiles()[0].has_data());
}

/// Every tile's presented resolution is recorded on its sources.
#[test]
fn test_required_resolutions_recorded() {
  let mut dataset = square(2);
  dataset.build_destination_graph().unwrap();

  let source = &dataset.sources().sources()[0];
  let resolutions = source.consolidated_resolutions();
  // 256 pixels over 100 units at the root, over 50 units below it.
  assert_eq!(resolutions.len(), 2);
  assert!((resolutions[0].x - 100.0 / 256.0).abs() < 1e-12);
  assert!((resolutions[1].x - 50.0 / 256.0).abs() < 1e-12);
}

/// A subtile outside the graph is rejected.
#[test]
fn test_unknown_subtile() {
  let mut dataset = square(2);
  dataset.set_build_mode(BuildMode::Subtile { level: 1, x: 5, y: 5 });
  match dataset.build_destination_graph() {
    Err(BuildError::UnknownSubtile(key)) => assert_eq!(key, TileKey::new(1, 5, 5)),
    other => panic!("expected UnknownSubtile, got {other:?}"),
  }
}

/// Writing needs a graph.
#[test]
fn test_write_before_build() {
  let mut dataset = square(2);
  let mut writer = MemorySceneWriter::new();
  assert!(matches!(
    dataset.write_destination(&mut writer),
    Err(BuildError::NoDestination)
  ));
}

// =============================================================================
// Paged output
// =============================================================================

/// Root file plus one subtile file; every tile read once and released.
#[test]
fn test_paged_two_levels() {
  let mut dataset = square(2);
  dataset.build_destination_graph().unwrap();
  let mut writer = MemorySceneWriter::new();
  let stats = dataset.write_destination(&mut writer).unwrap();

  let names: Vec<&str> = writer.files.keys().map(String::as_str).collect();
  assert_eq!(names, vec!["output.json", "output_L0_X0_Y0_subtile.json"]);
  assert_eq!(stats.tiles_read, 5);
  assert_eq!(stats.tiles_equalized, 5);
  assert_eq!(stats.tiles_released, 5);
  assert_eq!(stats.files_written, 2);
  assert!(all_phases(&dataset).iter().all(|p| *p == TilePhase::Released));

  match writer.get("output.json").unwrap() {
    SceneNode::CoordinateSystem { child, .. } => match child.as_ref() {
      SceneNode::PagedLod { file_name, .. } => assert_eq!(file_name, "output_L0_X0_Y0_subtile.json"),
      other => panic!("expected a paged LOD, got {other:?}"),
    },
    other => panic!("expected a decorated root, got {other:?}"),
  }
  assert_eq!(writer.get("output_L0_X0_Y0_subtile.json").unwrap().drawable_count(), 4);
}

/// Three levels: one subtile file per parent.
#[test]
fn test_paged_three_levels() {
  let mut dataset = square(3);
  dataset.build_destination_graph().unwrap();
  let mut writer = MemorySceneWriter::new();
  let stats = dataset.write_destination(&mut writer).unwrap();

  assert_eq!(writer.files.len(), 6);
  for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
    assert!(writer.get(&format!("output_L1_X{x}_Y{y}_subtile.json")).is_some());
  }
  assert_eq!(stats.tiles_released, 21);
}

/// Shared edge pixels match after equalization.
#[test]
fn test_written_edges_equalized() {
  let mut dataset = red_blue(BuildOptions::default());
  dataset.build_destination_graph().unwrap();
  let mut writer = MemorySceneWriter::new();
  dataset.write_destination(&mut writer).unwrap();

  let subtile = writer.get("output_L0_X0_Y0_subtile.json").unwrap();
  let tiles = meshes(subtile);
  assert_eq!(tiles.len(), 2);
  let left = &tiles[0].textures[0].image;
  let right = &tiles[1].textures[0].image;

  let row = left.height() / 2;
  let shared = left.rgb(left.width() - 1, row);
  assert_eq!(shared, right.rgb(0, row));
  assert_eq!(shared, [127, 0, 127]);
  assert_eq!(left.rgb(left.width() - 2, row), RED);
  assert_eq!(right.rgb(1, row), BLUE);
}

/// With equalization off the seam stays.
#[test]
fn test_equalization_disabled() {
  let options = BuildOptions {
    equalize_boundaries: false,
    ..BuildOptions::default()
  };
  let mut dataset = red_blue(options);
  dataset.build_destination_graph().unwrap();
  let mut writer = MemorySceneWriter::new();
  let stats = dataset.write_destination(&mut writer).unwrap();

  let subtile = writer.get("output_L0_X0_Y0_subtile.json").unwrap();
  let tiles = meshes(subtile);
  let left = &tiles[0].textures[0].image;
  let row = left.height() / 2;
  assert_eq!(left.rgb(left.width() - 1, row), RED);
  assert_eq!(stats.tiles_equalized, 3);
}

/// Sequential reads give the same output as parallel ones.
#[test]
fn test_sequential_read_matches_parallel() {
  let mut outputs = Vec::new();
  for parallel_read in [true, false] {
    let options = BuildOptions {
      parallel_read,
      ..BuildOptions::default()
    };
    let mut dataset = red_blue(options);
    dataset.build_destination_graph().unwrap();
    let mut writer = MemorySceneWriter::new();
    dataset.write_destination(&mut writer).unwrap();
    let subtile = writer.get("output_L0_X0_Y0_subtile.json").unwrap();
    let images: Vec<Vec<u8>> = meshes(subtile)
      .iter()
      .map(|m| m.textures[0].image.as_raw().to_vec())
      .collect();
    outputs.push(images);
  }
  assert_eq!(outputs[0], outputs[1]);
}

/// Records the extents of every tile an image read is issued for.
struct RecordingSources {
  inner: MemorySources,
  reads: Mutex<Vec<GeospatialExtents>>,
}

impl SourceCollection for RecordingSources {
  fn sources(&self) -> &[Source] {
    self.inner.sources()
  }

  fn source_mut(&mut self, id: SourceId) -> Option<&mut Source> {
    self.inner.source_mut(id)
  }

  fn read_image(
    &self,
    id: SourceId,
    extents: &GeospatialExtents,
    data_type: DataType,
    image: &mut ImageBuffer,
  ) -> Result<bool> {
    self.reads.lock().unwrap().push(*extents);
    self.inner.read_image(id, extents, data_type, image)
  }

  fn read_height(&self, id: SourceId, grid: &mut HeightGrid) -> Result<bool> {
    self.inner.read_height(id, grid)
  }
}

/// Reading a row populates that row's tiles and touches nothing else.
#[test]
fn test_read_row_touches_only_its_tiles() {
  for parallel_read in [true, false] {
    let sources = RecordingSources {
      inner: image_sources(extents(0.0, 0.0, 100.0, 100.0), 0.1, [10, 20, 30]),
      reads: Mutex::new(Vec::new()),
    };
    let options = BuildOptions {
      parallel_read,
      ..BuildOptions::default()
    }
    .with_max_levels(3);
    let mut dataset = DataSet::new(options, sources);
    dataset.build_destination_graph().unwrap();

    let rows = dataset.rows_at_level(2);
    assert_eq!(rows.len(), 4);
    dataset.read_row(&rows[1]);

    let graph = dataset.graph().unwrap();
    let mut expected: Vec<(i32, i32)> = rows[1].iter().map(|c| (graph.composite(*c).key.x, 1)).collect();
    expected.sort();
    let mut populated: Vec<(i32, i32)> = graph
      .tiles()
      .iter()
      .filter(|t| t.phase() != TilePhase::Empty)
      .map(|t| (t.key.x, t.key.y))
      .collect();
    populated.sort();
    assert_eq!(populated, expected);
    assert!(graph.tiles().iter().filter(|t| t.phase() != TilePhase::Empty).all(|t| t.level() == 2));

    let reads = dataset.sources().reads.lock().unwrap();
    assert_eq!(reads.len(), 4);
    assert!(reads.iter().all(|e| e.y_min == 25.0 && e.y_max == 50.0));
    assert_eq!(dataset.stats().tiles_read, 4);
  }
}

/// A failed write is reported but the rest of the build still runs.
#[test]
fn test_write_failure_reported() {
  let mut dataset = square(2);
  dataset.build_destination_graph().unwrap();
  let mut writer = MemorySceneWriter::new().failing_on("output_L0_X0_Y0_subtile.json");

  match dataset.write_destination(&mut writer) {
    Err(BuildError::WriteFailed { failed, first }) => {
      assert_eq!(failed, 1);
      assert!(first.starts_with("output_L0_X0_Y0_subtile.json"));
    }
    other => panic!("expected WriteFailed, got {other:?}"),
  }
  assert!(writer.get("output.json").is_some());
  assert_eq!(dataset.stats().write_failures, 1);
  assert_eq!(dataset.stats().tiles_released, 5);
}

// =============================================================================
// LOD output and build modes
// =============================================================================

/// LOD databases are one scene in one file.
#[test]
fn test_lod_single_file() {
  let sources = image_sources(extents(0.0, 0.0, 100.0, 100.0), 0.1, [10, 20, 30]);
  let options = BuildOptions::default()
    .with_max_levels(2)
    .with_database_type(DatabaseType::Lod);
  let mut dataset = DataSet::new(options, sources);
  dataset.build_destination_graph().unwrap();
  let mut writer = MemorySceneWriter::new();
  let stats = dataset.write_destination(&mut writer).unwrap();

  assert_eq!(writer.files.len(), 1);
  let SceneNode::CoordinateSystem { child, .. } = writer.get("output.json").unwrap() else {
    panic!("expected a decorated root");
  };
  assert!(matches!(child.as_ref(), SceneNode::Lod { .. }));
  assert_eq!(child.drawable_count(), 5);
  assert_eq!(stats.tiles_released, 5);
}

/// Root mode stops at the split level and leaves its subtiles alone.
#[test]
fn test_root_mode() {
  let mut dataset = square(3);
  dataset.set_build_mode(BuildMode::Root { split_level: 1 });
  dataset.build_destination_graph().unwrap();
  let mut writer = MemorySceneWriter::new();
  let stats = dataset.write_destination(&mut writer).unwrap();

  let names: Vec<&str> = writer.files.keys().map(String::as_str).collect();
  assert_eq!(names, vec!["output.json", "output_L0_X0_Y0_subtile.json"]);
  assert_eq!(stats.tiles_read, 5);

  let graph = dataset.graph().unwrap();
  let untouched = graph.tiles().iter().filter(|t| t.phase() == TilePhase::Empty).count();
  assert_eq!(untouched, 16);
}

/// Subtile mode writes only the target's subtile file.
#[test]
fn test_subtile_mode() {
  let mut dataset = square(3);
  dataset.set_build_mode(BuildMode::Subtile { level: 1, x: 1, y: 0 });
  dataset.build_destination_graph().unwrap();
  let mut writer = MemorySceneWriter::new();
  let stats = dataset.write_destination(&mut writer).unwrap();

  let names: Vec<&str> = writer.files.keys().map(String::as_str).collect();
  assert_eq!(names, vec!["output_L1_X1_Y0_subtile.json"]);
  assert_eq!(stats.tiles_read, 4);
  assert_eq!(stats.tiles_released, 4);
}

// =============================================================================
// Tasks
// =============================================================================

/// One root task plus one per split-level parent.
#[test]
fn test_generate_tasks() {
  let mut dataset = square(3);
  dataset.build_destination_graph().unwrap();
  let mut sink = RecordingTaskSink::new();
  let count = dataset.generate_tasks(&mut sink, 1, "build_terrain -c terrain.toml", "terrain.toml").unwrap();

  assert_eq!(count, 5);
  assert_eq!(sink.tasks[0].task_file, "output_root.task");
  assert_eq!(sink.tasks[0].command_line, "build_terrain -c terrain.toml --split-level 1");
  assert!(sink
    .tasks
    .iter()
    .any(|t| t.task_file == "output_L1_X1_Y1.task" && t.command_line.ends_with("--subtile 1 1 1")));
  assert!(sink.tasks.iter().all(|t| t.source_dependency == "terrain.toml"));
}

/// Leaves at the split level get no task.
#[test]
fn test_generate_tasks_skips_leaves() {
  let mut dataset = square(2);
  dataset.build_destination_graph().unwrap();
  let mut sink = RecordingTaskSink::new();
  assert_eq!(dataset.generate_tasks(&mut sink, 1, "build_terrain", "t.toml").unwrap(), 1);
}
