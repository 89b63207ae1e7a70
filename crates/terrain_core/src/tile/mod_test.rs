use super::*;
use crate::source::MemorySources;
use crate::test_utils::*;

fn sized_tile(options: &BuildOptions) -> DestinationTile {
  let mut tile = DestinationTile::new(
    "t".to_string(),
    TileKey::new(0, 0, 0),
    extents(0.0, 0.0, 16.0, 16.0),
    DataType::Raster,
    1,
  );
  tile.imagery[0].max_source_resolution = Some(Resolution::new(1.0, 1.0));
  tile.terrain_max_source_resolution = Some(Resolution::new(2.0, 2.0));
  tile.allocate(options).unwrap();
  tile
}

// =========================================================================
// Lifecycle
// =========================================================================

/// The full lifecycle runs in order and ends with no buffers.
#[test]
fn test_lifecycle_in_order() {
  let options = BuildOptions::default();
  let mut tile = sized_tile(&options);
  assert_eq!(tile.phase(), TilePhase::Sized);
  assert!(tile.has_data());

  tile.read_from(&MemorySources::new()).unwrap();
  tile.mark_equalized().unwrap();
  assert!(tile.complete);
  tile.mark_emitted().unwrap();
  tile.unref_data().unwrap();

  assert_eq!(tile.phase(), TilePhase::Released);
  assert!(!tile.has_data());
}

/// Out-of-order calls are rejected with the tile and phase named.
#[test]
fn test_phase_violation() {
  let options = BuildOptions::default();
  let mut tile = sized_tile(&options);

  let err = tile.mark_emitted().unwrap_err();
  match err {
    BuildError::PhaseViolation { tile: key, operation, found, .. } => {
      assert_eq!(key, TileKey::new(0, 0, 0));
      assert_eq!(operation, "mark_emitted");
      assert_eq!(found, TilePhase::Sized);
    }
    other => panic!("unexpected error {other:?}"),
  }
  assert!(tile.allocate(&options).is_err(), "allocating twice is illegal");
  assert_eq!(tile.phase(), TilePhase::Sized);
}

/// Allocation sizes buffers from the recorded resolutions.
#[test]
fn test_allocate_sizes() {
  let options = BuildOptions::default();
  let tile = sized_tile(&options);

  let image = tile.image(0).unwrap();
  assert_eq!((image.width(), image.height()), (16, 16));
  assert_eq!(image.rgb(3, 3), options.default_color);

  let grid = tile.terrain.as_ref().unwrap();
  assert_eq!((grid.num_columns(), grid.num_rows()), (8, 8));
  assert!((grid.x_interval() - 16.0 / 7.0).abs() < 1e-12);
}

// =========================================================================
// Sources
// =========================================================================

/// Later sources draw over earlier ones; non-overlapping ones are skipped.
#[test]
fn test_read_from_layers_sources() {
  let options = BuildOptions::default();
  let mut sources = MemorySources::new();
  add_image(&mut sources, extents(0.0, 0.0, 16.0, 16.0), 1.0, [1, 1, 1]);
  add_image(&mut sources, extents(8.0, 0.0, 16.0, 16.0), 1.0, [2, 2, 2]);
  add_image(&mut sources, extents(100.0, 100.0, 101.0, 101.0), 1.0, [3, 3, 3]);

  let mut tile = sized_tile(&options);
  tile.read_from(&sources).unwrap();

  let image = tile.image(0).unwrap();
  assert_eq!(image.rgb(0, 0), [1, 1, 1]);
  assert_eq!(image.rgb(15, 15), [2, 2, 2]);
}

/// A source that fails to read is skipped; the tile still populates.
#[test]
fn test_read_from_skips_failing_source() {
  let options = BuildOptions::default();
  let mut sources = MemorySources::new();
  add_image(&mut sources, extents(0.0, 0.0, 16.0, 16.0), 1.0, [4, 4, 4]);
  sources.add_heights("short", extents(0.0, 0.0, 16.0, 16.0), 3, 3, vec![7.0; 4]);

  let mut tile = sized_tile(&options);
  tile.read_from(&sources).unwrap();

  assert_eq!(tile.phase(), TilePhase::Populated);
  assert_eq!(tile.image(0).unwrap().rgb(5, 5), [4, 4, 4]);
  assert!(tile.terrain.as_ref().unwrap().heights().iter().all(|h| *h == 0.0));
}

/// Source resolution and level bookkeeping ignore disjoint sources.
#[test]
fn test_maximum_source_resolution_and_level() {
  let mut sources = MemorySources::new();
  add_image(&mut sources, extents(0.0, 0.0, 16.0, 16.0), 2.0, [0, 0, 0]);
  add_image(&mut sources, extents(0.0, 0.0, 16.0, 16.0), 0.5, [0, 0, 0]);
  add_image(&mut sources, extents(50.0, 50.0, 60.0, 60.0), 0.01, [0, 0, 0]);
  add_terrain(&mut sources, extents(0.0, 0.0, 16.0, 16.0), 5, |_, _| 0.0);

  let mut tile = DestinationTile::new(
    "t".to_string(),
    TileKey::new(0, 0, 0),
    extents(0.0, 0.0, 16.0, 16.0),
    DataType::Raster,
    1,
  );
  tile.compute_maximum_source_level(&sources, None);
  tile.compute_maximum_source_resolution(&sources, None);

  assert_eq!(tile.max_source_level, crate::constants::MAXIMUM_NUMBER_OF_LEVELS);
  assert_eq!(tile.imagery[0].max_source_resolution, Some(Resolution::new(0.5, 0.5)));
  assert_eq!(tile.terrain_max_source_resolution, Some(Resolution::new(4.0, 4.0)));
}
