//! In-memory source collection.
//!
//! Holds fully decoded rasters alongside their metadata and samples them
//! into tile buffers: imagery by nearest cell, heights by bilinear
//! interpolation.

use glam::DVec2;

use super::{Source, SourceCollection, SourceId, SourceType};
use crate::error::{BuildError, Result};
use crate::geo::{GeospatialExtents, SpatialProperties};
use crate::types::{DataType, HeightGrid, ImageBuffer};

/// Slack for vertex-sampled lookups landing exactly on the far edge.
const EDGE_EPSILON: f64 = 1e-9;

/// Decoded source values. Row 0 is grid row 0 of the source's
/// geo-transform (the northern edge for north-up data).
#[derive(Clone, Debug)]
pub enum RasterData {
  Image(ImageBuffer),
  Heights(Vec<f32>),
  /// Model and vector sources carry no raster.
  None,
}

/// Sources held entirely in memory.
#[derive(Debug, Default)]
pub struct MemorySources {
  sources: Vec<Source>,
  data: Vec<RasterData>,
}

impl MemorySources {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a source with its decoded values, returning its id.
  pub fn add(&mut self, source: Source, data: RasterData) -> SourceId {
    self.sources.push(source);
    self.data.push(data);
    self.sources.len() - 1
  }

  /// Add an imagery source whose properties match the image dimensions.
  pub fn add_image(
    &mut self,
    name: impl Into<String>,
    extents: GeospatialExtents,
    layer: u32,
    image: ImageBuffer,
  ) -> SourceId {
    let cs = None;
    let props = SpatialProperties::new(cs, extents, image.width(), image.height(), DataType::Raster);
    let source = Source::new(name, SourceType::Image, props).with_layer(layer);
    self.add(source, RasterData::Image(image))
  }

  /// Add a vertex-sampled height source of `num_x` by `num_y` values.
  pub fn add_heights(
    &mut self,
    name: impl Into<String>,
    extents: GeospatialExtents,
    num_x: u32,
    num_y: u32,
    values: Vec<f32>,
  ) -> SourceId {
    let props = SpatialProperties::new(None, extents, num_x, num_y, DataType::Vector);
    let source = Source::new(name, SourceType::HeightField, props);
    self.add(source, RasterData::Heights(values))
  }

  pub fn len(&self) -> usize {
    self.sources.len()
  }

  pub fn is_empty(&self) -> bool {
    self.sources.is_empty()
  }
}

/// Positions to try for a lookup: the point itself, then its 360° shifted
/// copies for geographic data.
fn wrap_candidates(point: DVec2, geographic: bool) -> impl Iterator<Item = DVec2> {
  let shifts: &[f64] = if geographic { &[0.0, 360.0, -360.0] } else { &[0.0] };
  shifts.iter().map(move |&s| DVec2::new(point.x + s, point.y))
}

/// Cell containing `point`, if any.
fn locate_cell(props: &SpatialProperties, point: DVec2, nx: u32, ny: u32) -> Option<(u32, u32)> {
  wrap_candidates(point, props.extents.is_geographic).find_map(|p| {
    let g = props.geo_transform.invert(p);
    let (c, r) = (g.x.floor(), g.y.floor());
    (c >= 0.0 && r >= 0.0 && c < nx as f64 && r < ny as f64).then_some((c as u32, r as u32))
  })
}

/// Bilinear height at `point`, if it lies within the sampled area.
fn sample_height(props: &SpatialProperties, values: &[f32], point: DVec2) -> Option<f32> {
  let nx = props.num_values_x;
  let ny = props.num_values_y;
  if nx == 0 || ny == 0 {
    return None;
  }
  // Raster heights describe cell centres; shift onto the centre lattice.
  let (shift, margin) = match props.data_type {
    DataType::Vector => (0.0, EDGE_EPSILON),
    _ => (0.5, 0.5 + EDGE_EPSILON),
  };
  let max_x = (nx - 1) as f64;
  let max_y = (ny - 1) as f64;

  wrap_candidates(point, props.extents.is_geographic).find_map(|p| {
    let g = props.geo_transform.invert(p) - DVec2::splat(shift);
    if g.x < -margin || g.y < -margin || g.x > max_x + margin || g.y > max_y + margin {
      return None;
    }
    let gx = g.x.clamp(0.0, max_x);
    let gy = g.y.clamp(0.0, max_y);
    let c0 = gx.floor() as u32;
    let r0 = gy.floor() as u32;
    let c1 = (c0 + 1).min(nx - 1);
    let r1 = (r0 + 1).min(ny - 1);
    let tx = (gx - c0 as f64) as f32;
    let ty = (gy - r0 as f64) as f32;
    let at = |c: u32, r: u32| values[r as usize * nx as usize + c as usize];
    let bottom = at(c0, r0) * (1.0 - tx) + at(c1, r0) * tx;
    let top = at(c0, r1) * (1.0 - tx) + at(c1, r1) * tx;
    Some(bottom * (1.0 - ty) + top * ty)
  })
}

impl SourceCollection for MemorySources {
  fn sources(&self) -> &[Source] {
    &self.sources
  }

  fn source_mut(&mut self, id: SourceId) -> Option<&mut Source> {
    self.sources.get_mut(id)
  }

  fn read_image(
    &self,
    id: SourceId,
    extents: &GeospatialExtents,
    data_type: DataType,
    image: &mut ImageBuffer,
  ) -> Result<bool> {
    let (Some(source), Some(RasterData::Image(raster))) = (self.sources.get(id), self.data.get(id)) else {
      return Ok(false);
    };
    let width = image.width();
    let height = image.height();
    if width == 0 || height == 0 {
      return Ok(false);
    }
    let (dx, dy, half) = match data_type {
      DataType::Vector => (
        extents.width() / width.saturating_sub(1).max(1) as f64,
        extents.height() / height.saturating_sub(1).max(1) as f64,
        0.0,
      ),
      _ => (extents.width() / width as f64, extents.height() / height as f64, 0.5),
    };

    let mut wrote = false;
    for row in 0..height {
      for col in 0..width {
        let p = DVec2::new(
          extents.x_min + (col as f64 + half) * dx,
          extents.y_min + (row as f64 + half) * dy,
        );
        if let Some((sc, sr)) = locate_cell(&source.properties, p, raster.width(), raster.height()) {
          image.set_rgb(col, row, raster.rgb(sc, sr));
          wrote = true;
        }
      }
    }
    Ok(wrote)
  }

  fn read_height(&self, id: SourceId, grid: &mut HeightGrid) -> Result<bool> {
    let (Some(source), Some(RasterData::Heights(values))) = (self.sources.get(id), self.data.get(id)) else {
      return Ok(false);
    };
    let expected = source.properties.num_values_x as usize * source.properties.num_values_y as usize;
    if values.len() < expected {
      return Err(BuildError::SourceRead {
        source_name: source.name.clone(),
        reason: format!(
          "{} height values for a {}x{} grid",
          values.len(),
          source.properties.num_values_x,
          source.properties.num_values_y
        ),
      });
    }
    let mut wrote = false;
    for row in 0..grid.num_rows() {
      for col in 0..grid.num_columns() {
        if let Some(h) = sample_height(&source.properties, values, grid.vertex(col, row)) {
          grid.set_height(col, row, h);
          wrote = true;
        }
      }
    }
    Ok(wrote)
  }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod memory_test;
