//! Composite-to-scene assembly.
//!
//! ```text
//!   no tiles, no children   -> nothing
//!   Group                   -> flat group of tiles and child scenes
//!   tiles only              -> the tiles' drawables
//!   one child, no tiles     -> that child's scene
//!   otherwise               -> LOD / PagedLOD
//!                               [cutoff, far]  this level's tiles
//!                               [0, cutoff]    children (inline or by file)
//!
//!   cutoff = max(max child visible distance, bound radius * ratio)
//! ```
//!
//! A culling cone on the coarse drawable is moved up onto the LOD node,
//! re-expressed through the drawable's transform.

use super::mesh::MeshBuilder;
use super::{BoundingSphere, ClusterCullingCallback, LodRange, SceneNode};
use crate::geo::{CoordinateSystem, EllipsoidModel};
use crate::options::BuildOptions;
use crate::quadtree::{CompositeDestination, CompositeId, CompositeKind, DestinationGraph, TileId};

/// Turns composites of a [`DestinationGraph`] into scene nodes.
pub struct SceneAssembler<'a> {
  graph: &'a DestinationGraph,
  options: &'a BuildOptions,
  mesh: MeshBuilder<'a>,
  ellipsoid: EllipsoidModel,
  geocentric: bool,
}

impl<'a> SceneAssembler<'a> {
  pub fn new(graph: &'a DestinationGraph, options: &'a BuildOptions, ellipsoid: EllipsoidModel, geocentric: bool) -> Self {
    Self {
      graph,
      options,
      mesh: MeshBuilder::new(options, ellipsoid, geocentric),
      ellipsoid,
      geocentric,
    }
  }

  pub fn tile_scene(&self, id: TileId) -> SceneNode {
    self.mesh.create_tile_scene(self.graph.tile(id))
  }

  fn own_tiles_scene(&self, composite: &CompositeDestination) -> Option<SceneNode> {
    group_or_single(composite.tiles.iter().map(|t| self.tile_scene(*t)).collect())
  }

  fn cutoff_distance(&self, composite: &CompositeDestination, bound: &BoundingSphere) -> f64 {
    let children = composite
      .children
      .iter()
      .map(|c| self.graph.composite(*c).max_visible_distance)
      .fold(0.0, f64::max);
    children.max(bound.radius.max(0.0) * self.options.radius_to_max_visible_distance_ratio)
  }

  /// Scene with every finer level embedded.
  pub fn create_scene(&self, id: CompositeId) -> Option<SceneNode> {
    let composite = self.graph.composite(id);
    if composite.children.is_empty() && composite.tiles.is_empty() {
      return None;
    }

    let children: Vec<SceneNode> = composite.children.iter().filter_map(|c| self.create_scene(*c)).collect();

    if composite.kind == CompositeKind::Group {
      let mut nodes: Vec<SceneNode> = composite.tiles.iter().map(|t| self.tile_scene(*t)).collect();
      nodes.extend(children);
      return group_or_single(nodes);
    }
    let Some(mut near) = self.own_tiles_scene(composite) else {
      return group_or_single(children);
    };
    let Some(far_detail) = group_or_single(children) else {
      return Some(near);
    };

    let culling = take_culling(&mut near);
    let bound = near.bound();
    let cutoff = self.cutoff_distance(composite, &bound);
    Some(SceneNode::Lod {
      center: bound.center,
      radius: bound.radius,
      children: vec![
        (near, LodRange::new(cutoff, self.options.maximum_visible_distance_of_top_level)),
        (far_detail, LodRange::new(0.0, cutoff)),
      ],
      culling,
    })
  }

  /// Scene with this level inline and the children behind the subtile file.
  pub fn create_paged_lod_scene(&self, id: CompositeId) -> Option<SceneNode> {
    let composite = self.graph.composite(id);
    if composite.children.is_empty() && composite.tiles.is_empty() {
      return None;
    }

    if composite.kind == CompositeKind::Group {
      let mut nodes: Vec<SceneNode> = composite.tiles.iter().map(|t| self.tile_scene(*t)).collect();
      nodes.extend(composite.children.iter().filter_map(|c| self.create_paged_lod_scene(*c)));
      return group_or_single(nodes);
    }
    let Some(mut near) = self.own_tiles_scene(composite) else {
      return self.create_sub_tile_scene(id);
    };
    if composite.children.is_empty() {
      return Some(near);
    }

    let culling = take_culling(&mut near);
    let bound = near.bound();
    let cutoff = self.cutoff_distance(composite, &bound);
    Some(SceneNode::PagedLod {
      center: bound.center,
      radius: bound.radius,
      near: Box::new(near),
      near_range: LodRange::new(cutoff, self.options.maximum_visible_distance_of_top_level),
      file_name: self.options.subtile_file_name(&composite.name),
      file_range: LodRange::new(0.0, cutoff),
      culling,
    })
  }

  /// Contents of a composite's subtile file: its children's paged scenes.
  pub fn create_sub_tile_scene(&self, id: CompositeId) -> Option<SceneNode> {
    let composite = self.graph.composite(id);
    group_or_single(
      composite
        .children
        .iter()
        .filter_map(|c| self.create_paged_lod_scene(*c))
        .collect(),
    )
  }

  /// Wrap a root scene with its coordinate system, when configured.
  pub fn decorate(&self, node: SceneNode, cs: Option<&CoordinateSystem>) -> SceneNode {
    if !self.options.decorate_with_coordinate_system_node {
      return node;
    }
    SceneNode::CoordinateSystem {
      wkt: cs.map(|cs| cs.wkt.clone()).unwrap_or_default(),
      ellipsoid: self.geocentric.then_some(self.ellipsoid),
      child: Box::new(node),
    }
  }
}

fn group_or_single(mut nodes: Vec<SceneNode>) -> Option<SceneNode> {
  match nodes.len() {
    0 => None,
    1 => nodes.pop(),
    _ => Some(SceneNode::Group(nodes)),
  }
}

/// Remove the culling cone from a drawable (directly, under transforms, or
/// ahead of its placed models) and return it in the parent's frame.
fn take_culling(node: &mut SceneNode) -> Option<ClusterCullingCallback> {
  match node {
    SceneNode::Mesh(mesh) => mesh.culling.take(),
    SceneNode::Transform { matrix, child } => take_culling(child).map(|c| c.transformed(matrix)),
    SceneNode::Group(children) if children.iter().skip(1).all(|c| matches!(c, SceneNode::External { .. })) => {
      children.first_mut().and_then(take_culling)
    }
    _ => None,
  }
}

#[cfg(test)]
#[path = "assembler_test.rs"]
mod assembler_test;
