//! Tile-local geometry: polygonal meshes with skirts, or raw height fields.
//!
//! ```text
//!   grid source      tile terrain, or a flat grid when there is none
//!   flat terrain     regenerated as a minimum 8x8 grid (aspect adjusted)
//!   positions        planar (x, y, z) or ellipsoid XYZ from (lon, lat, h)
//!   local frame      translation (planar) or east/north/up (geocentric)
//!   normals          central differences, edge samples from equalized slopes
//!   quads            split along the diagonal with the smaller height jump
//!   skirt            perimeter dropped by skirt_ratio * bound radius
//! ```

use glam::{DMat4, DVec2, DVec3, Vec2, Vec3};
use tracing::debug;

use super::{BoundingSphere, ClusterCullingCallback, HeightFieldShape, Mesh, SceneNode, Texture};
use crate::constants::{DEGREES_PER_FLAT_SEGMENT, MIN_FLAT_GRID_SIZE};
use crate::geo::{EllipsoidModel, GeospatialExtents};
use crate::options::{BuildOptions, GeometryType};
use crate::tile::{DestinationTile, Direction};
use crate::types::HeightGrid;

/// Builds the drawable of one tile.
#[derive(Clone, Debug)]
pub struct MeshBuilder<'a> {
  options: &'a BuildOptions,
  ellipsoid: EllipsoidModel,
  geocentric: bool,
}

impl<'a> MeshBuilder<'a> {
  pub fn new(options: &'a BuildOptions, ellipsoid: EllipsoidModel, geocentric: bool) -> Self {
    Self {
      options,
      ellipsoid,
      geocentric,
    }
  }

  /// The tile's drawable plus an external node per placed model.
  pub fn create_tile_scene(&self, tile: &DestinationTile) -> SceneNode {
    let drawable = match self.options.geometry_type {
      GeometryType::HeightField if !self.geocentric => self.create_height_field(tile),
      GeometryType::HeightField => {
        debug!(tile = %tile.key, "height fields are planar, building a polygonal mesh");
        self.create_polygonal(tile)
      }
      GeometryType::Polygonal => self.create_polygonal(tile),
    };
    if tile.models.is_empty() {
      return drawable;
    }
    let mut children = vec![drawable];
    children.extend(tile.models.iter().map(|name| SceneNode::External { name: name.clone() }));
    SceneNode::Group(children)
  }

  // ===========================================================================
  // Grids
  // ===========================================================================

  /// Columns and rows of a grid standing in for flat or missing terrain.
  fn flat_dimensions(&self, extents: &GeospatialExtents) -> (u32, u32) {
    let min = MIN_FLAT_GRID_SIZE;
    let cap = self.options.maximum_tile_terrain_size.max(min);
    let (w, h) = (extents.width(), extents.height());
    let (mut columns, mut rows) = (min, min);
    if w > 0.0 && h > 0.0 {
      let aspect = w / h;
      if aspect > 1.0 {
        columns = (min as f64 * aspect).round() as u32;
      } else if aspect < 1.0 {
        rows = (min as f64 / aspect).round() as u32;
      }
    }
    if self.geocentric {
      columns = columns.max((w / DEGREES_PER_FLAT_SEGMENT).ceil() as u32 + 1);
      rows = rows.max((h / DEGREES_PER_FLAT_SEGMENT).ceil() as u32 + 1);
    }
    (columns.min(cap), rows.min(cap))
  }

  /// Constant-height grid over `extents`.
  pub fn flat_grid(&self, extents: &GeospatialExtents, height: f32) -> HeightGrid {
    let (columns, rows) = self.flat_dimensions(extents);
    HeightGrid::filled(
      columns,
      rows,
      DVec2::new(extents.x_min, extents.y_min),
      extents.width() / (columns - 1) as f64,
      extents.height() / (rows - 1) as f64,
      height,
    )
  }

  /// Replacement for a constant-height grid, None when the grid varies.
  pub fn flat_tile_grid(&self, grid: &HeightGrid, extents: &GeospatialExtents) -> Option<HeightGrid> {
    if !grid.is_flat() {
      return None;
    }
    Some(self.flat_grid(extents, grid.height(0, 0)))
  }

  /// Grid the mesh is built from and whether it is the tile's own terrain.
  fn tile_grid(&self, tile: &DestinationTile) -> (HeightGrid, bool) {
    match &tile.terrain {
      Some(grid) => match self.flat_tile_grid(grid, &tile.extents) {
        Some(flat) => (flat, false),
        None => (grid.clone(), true),
      },
      None => (self.flat_grid(&tile.extents, 0.0), false),
    }
  }

  // ===========================================================================
  // Frames
  // ===========================================================================

  #[inline]
  fn to_world(&self, p: DVec2, height: f64) -> DVec3 {
    if self.geocentric {
      self.ellipsoid.degrees_to_xyz(p.x, p.y, height)
    } else {
      DVec3::new(p.x, p.y, height)
    }
  }

  #[inline]
  fn up_at(&self, p: DVec2) -> DVec3 {
    if self.geocentric {
      self.ellipsoid.up_vector(p.y.to_radians(), p.x.to_radians())
    } else {
      DVec3::Z
    }
  }

  /// Local-to-world matrix of a tile centred on `center` at `height`.
  fn local_frame(&self, center: DVec2, height: f64) -> DMat4 {
    if !self.options.use_local_tile_transform {
      DMat4::IDENTITY
    } else if self.geocentric {
      self.ellipsoid.local_to_world(center.y.to_radians(), center.x.to_radians(), height)
    } else {
      DMat4::from_translation(DVec3::new(center.x, center.y, height))
    }
  }

  /// World-space normal from a slope in destination units.
  fn normal_from_slope(&self, p: DVec2, slope: Vec2) -> DVec3 {
    if self.geocentric {
      let lat = p.y.to_radians();
      let (mx, my) = self.ellipsoid.metres_per_degree(lat);
      let enu = DVec3::new(-slope.x as f64 / mx.max(f64::EPSILON), -slope.y as f64 / my, 1.0).normalize();
      self.ellipsoid.east_north_up(lat, p.x.to_radians()) * enu
    } else {
      DVec3::new(-slope.x as f64, -slope.y as f64, 1.0).normalize()
    }
  }

  fn textures(&self, tile: &DestinationTile) -> Vec<Texture> {
    tile
      .imagery
      .iter()
      .enumerate()
      .filter_map(|(layer, data)| {
        data.image.as_ref().map(|image| Texture {
          layer,
          name: format!("{}_layer{}", tile.name, layer),
          image: image.clone(),
        })
      })
      .collect()
  }

  // ===========================================================================
  // Polygonal
  // ===========================================================================

  /// Triangle mesh with skirt, wrapped in the tile's local transform.
  pub fn create_polygonal(&self, tile: &DestinationTile) -> SceneNode {
    let (grid, own_terrain) = self.tile_grid(tile);
    let columns = grid.num_columns();
    let rows = grid.num_rows();
    let (lo, hi) = grid.min_max().unwrap_or((0.0, 0.0));
    let center = tile.extents.center();
    let local_to_world = self.local_frame(center, (lo as f64 + hi as f64) * 0.5);
    let world_to_local = local_to_world.inverse();

    let mut world = Vec::with_capacity((columns * rows) as usize);
    let mut normals = Vec::with_capacity(world.capacity());
    let mut tex_coords = Vec::with_capacity(world.capacity());
    for r in 0..rows {
      for c in 0..columns {
        let p = grid.vertex(c, r);
        world.push(self.to_world(p, grid.height(c, r) as f64));

        let slope = own_terrain
          .then(|| boundary_slope(tile, &grid, c, r))
          .flatten()
          .unwrap_or_else(|| grid.slope(c, r));
        let n = world_to_local.transform_vector3(self.normal_from_slope(p, slope));
        normals.push(n.normalize_or_zero().as_vec3());

        tex_coords.push(Vec2::new(
          ratio(p.x - tile.extents.x_min, tile.extents.width()),
          ratio(p.y - tile.extents.y_min, tile.extents.height()),
        ));
      }
    }

    let index = |c: u32, r: u32| r * columns + c;
    let mut indices = Vec::with_capacity(((columns.saturating_sub(1)) * (rows.saturating_sub(1)) * 6) as usize);
    for r in 0..rows.saturating_sub(1) {
      for c in 0..columns.saturating_sub(1) {
        let (i00, i10, i01, i11) = (index(c, r), index(c + 1, r), index(c, r + 1), index(c + 1, r + 1));
        let rising = (grid.height(c, r) - grid.height(c + 1, r + 1)).abs();
        let falling = (grid.height(c + 1, r) - grid.height(c, r + 1)).abs();
        if rising <= falling {
          indices.extend_from_slice(&[i00, i10, i11, i00, i11, i01]);
        } else {
          indices.extend_from_slice(&[i00, i10, i01, i10, i11, i01]);
        }
      }
    }

    let surface_bound = BoundingSphere::from_points(&world);
    let skirt_height = self.options.skirt_ratio * surface_bound.radius.max(0.0);
    if columns >= 2 && rows >= 2 && skirt_height > 0.0 {
      let ring = perimeter(columns, rows);
      let first_skirt = world.len() as u32;
      for &i in &ring {
        let p = grid.vertex(i % columns, i / columns);
        world.push(world[i as usize] - self.up_at(p) * skirt_height);
        normals.push(normals[i as usize]);
        tex_coords.push(tex_coords[i as usize]);
      }
      for k in 0..ring.len() {
        let next = (k + 1) % ring.len();
        let (i, j) = (ring[k], ring[next]);
        let (si, sj) = (first_skirt + k as u32, first_skirt + next as u32);
        indices.extend_from_slice(&[si, sj, j, si, j, i]);
      }
    }

    let vertices: Vec<DVec3> = world.iter().map(|v| world_to_local.transform_point3(*v)).collect();
    let culling = self.geocentric.then(|| {
      let control_point = world_to_local.transform_point3(self.to_world(center, (lo as f64 + hi as f64) * 0.5));
      let normal = world_to_local.transform_vector3(self.up_at(center)).normalize_or_zero();
      cluster_culling(&vertices, &normals, control_point, normal)
    });

    let mesh = Mesh {
      name: tile.name.clone(),
      bound: BoundingSphere::from_points(&vertices),
      vertices,
      normals,
      tex_coords,
      indices,
      textures: self.textures(tile),
      culling,
    };

    if local_to_world == DMat4::IDENTITY {
      SceneNode::Mesh(mesh)
    } else {
      SceneNode::Transform {
        matrix: local_to_world,
        child: Box::new(SceneNode::Mesh(mesh)),
      }
    }
  }

  // ===========================================================================
  // Height field
  // ===========================================================================

  pub fn create_height_field(&self, tile: &DestinationTile) -> SceneNode {
    let (grid, _) = self.tile_grid(tile);
    let corners: Vec<DVec3> = [(0, 0), (grid.num_columns() - 1, grid.num_rows() - 1)]
      .into_iter()
      .flat_map(|(c, r)| {
        let p = grid.vertex(c, r);
        let (lo, hi) = grid.min_max().unwrap_or((0.0, 0.0));
        [DVec3::new(p.x, p.y, lo as f64), DVec3::new(p.x, p.y, hi as f64)]
      })
      .collect();
    let bound = BoundingSphere::from_points(&corners);

    SceneNode::HeightField(HeightFieldShape {
      name: tile.name.clone(),
      origin: grid.origin(),
      x_interval: grid.x_interval(),
      y_interval: grid.y_interval(),
      num_columns: grid.num_columns(),
      num_rows: grid.num_rows(),
      heights: grid.heights().to_vec(),
      skirt_height: self.options.skirt_ratio * bound.radius.max(0.0),
      textures: self.textures(tile),
      bound,
    })
  }
}

#[inline]
fn ratio(offset: f64, extent: f64) -> f32 {
  if extent > 0.0 {
    (offset / extent) as f32
  } else {
    0.0
  }
}

/// Equalized slope for an interior edge sample of the tile's own grid.
fn boundary_slope(tile: &DestinationTile, grid: &HeightGrid, c: u32, r: u32) -> Option<Vec2> {
  let (columns, rows) = (grid.num_columns(), grid.num_rows());
  let pick = |direction: Direction, i: u32, len: u32| -> Option<Vec2> {
    let deltas = &tile.height_deltas[direction.index()];
    (i >= 1 && i + 1 < len && deltas.len() == (len - 2) as usize).then(|| deltas[(i - 1) as usize])
  };
  if c == 0 {
    pick(Direction::Left, r, rows)
  } else if c + 1 == columns {
    pick(Direction::Right, r, rows)
  } else if r == 0 {
    pick(Direction::Below, c, columns)
  } else if r + 1 == rows {
    pick(Direction::Above, c, columns)
  } else {
    None
  }
}

/// Grid indices around the border, counter-clockwise from the origin.
fn perimeter(columns: u32, rows: u32) -> Vec<u32> {
  let index = |c: u32, r: u32| r * columns + c;
  let mut ring = Vec::with_capacity(2 * (columns + rows) as usize);
  ring.extend((0..columns).map(|c| index(c, 0)));
  ring.extend((1..rows).map(|r| index(columns - 1, r)));
  ring.extend((0..columns - 1).rev().map(|c| index(c, rows - 1)));
  ring.extend((1..rows - 1).rev().map(|r| index(0, r)));
  ring
}

/// Culling cone around the tile's up vector, in the mesh's local frame.
fn cluster_culling(vertices: &[DVec3], normals: &[Vec3], control_point: DVec3, normal: DVec3) -> ClusterCullingCallback {
  let min_dot = normals
    .iter()
    .map(|n| n.as_dvec3().dot(normal))
    .fold(1.0_f64, f64::min);
  let deviation = if min_dot > 0.0 { -(1.0 - min_dot * min_dot).sqrt() } else { -1.0 };
  let radius = vertices
    .iter()
    .map(|v| v.distance(control_point))
    .fold(0.0_f64, f64::max);
  ClusterCullingCallback {
    control_point,
    normal,
    deviation,
    radius,
  }
}

#[cfg(test)]
#[path = "mesh_test.rs"]
mod mesh_test;
