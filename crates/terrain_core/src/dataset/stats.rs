//! Counters and stage timings of one build.

use serde::Serialize;
use web_time::Instant;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
  pub composites_created: usize,
  pub tiles_created: usize,
  pub tiles_read: usize,
  pub tiles_equalized: usize,
  pub files_written: usize,
  pub write_failures: usize,
  pub tiles_released: usize,
  /// Quadtree construction and resolution back-propagation.
  pub build_graph_us: u64,
  pub read_us: u64,
  pub equalize_us: u64,
  /// Scene assembly plus writer calls.
  pub write_us: u64,
}

/// Microseconds since `start`.
#[inline]
pub(crate) fn elapsed_us(start: Instant) -> u64 {
  start.elapsed().as_micros() as u64
}
