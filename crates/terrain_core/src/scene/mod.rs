//! Renderable node tree produced from the destination graph.
//!
//! ```text
//!   CoordinateSystem                      (root decoration)
//!     └─ PagedLod ─┬─ [cutoff, far]  Transform ─ Mesh   (this level)
//!                  └─ [0, cutoff]    "name_subtile.json" (loaded on demand)
//! ```
//!
//! Nodes are plain data; writing them to disk is a [`SceneWriter`]'s job.

pub mod assembler;
pub mod mesh;
pub mod writer;

pub use assembler::SceneAssembler;
pub use writer::{MemorySceneWriter, SceneWriter};

use glam::{DMat4, DVec2, DVec3, Vec2, Vec3};

use crate::geo::EllipsoidModel;
use crate::types::ImageBuffer;

// =============================================================================
// Bounds and culling
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
  pub center: DVec3,
  pub radius: f64,
}

impl Default for BoundingSphere {
  fn default() -> Self {
    Self::invalid()
  }
}

impl BoundingSphere {
  pub fn new(center: DVec3, radius: f64) -> Self {
    Self { center, radius }
  }

  pub fn invalid() -> Self {
    Self {
      center: DVec3::ZERO,
      radius: -1.0,
    }
  }

  #[inline]
  pub fn valid(&self) -> bool {
    self.radius >= 0.0
  }

  /// Centre of the points' box, radius to the farthest point.
  pub fn from_points(points: &[DVec3]) -> Self {
    let Some(first) = points.first() else {
      return Self::invalid();
    };
    let (lo, hi) = points.iter().fold((*first, *first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
    let center = (lo + hi) * 0.5;
    let radius = points.iter().map(|p| p.distance(center)).fold(0.0, f64::max);
    Self { center, radius }
  }

  /// Grow to enclose `other`.
  pub fn expand_by(&mut self, other: &BoundingSphere) {
    if !other.valid() {
      return;
    }
    if !self.valid() {
      *self = *other;
      return;
    }
    let d = other.center.distance(self.center);
    if d + other.radius <= self.radius {
      return;
    }
    if d + self.radius <= other.radius {
      *self = *other;
      return;
    }
    let radius = (self.radius + d + other.radius) * 0.5;
    let dir = (other.center - self.center) / d;
    self.center += dir * (radius - self.radius);
    self.radius = radius;
  }

  /// Sphere under a rigid transform.
  pub fn transformed(&self, matrix: &DMat4) -> Self {
    if !self.valid() {
      return *self;
    }
    Self {
      center: matrix.transform_point3(self.center),
      radius: self.radius,
    }
  }
}

/// Back-face cluster culling: the cluster is invisible when the eye sees it
/// from below the `deviation` cone around `normal`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterCullingCallback {
  pub control_point: DVec3,
  pub normal: DVec3,
  pub deviation: f64,
  pub radius: f64,
}

impl ClusterCullingCallback {
  /// Same callback expressed through `matrix`.
  pub fn transformed(&self, matrix: &DMat4) -> Self {
    Self {
      control_point: matrix.transform_point3(self.control_point),
      normal: matrix.transform_vector3(self.normal).normalize_or_zero(),
      deviation: self.deviation,
      radius: self.radius,
    }
  }
}

// =============================================================================
// Geometry
// =============================================================================

/// Tile image bound to one texture unit.
#[derive(Clone, Debug)]
pub struct Texture {
  pub layer: usize,
  /// Texture file name relative to the scene file.
  pub name: String,
  pub image: ImageBuffer,
}

#[derive(Clone, Debug, Default)]
pub struct Mesh {
  pub name: String,
  pub vertices: Vec<DVec3>,
  pub normals: Vec<Vec3>,
  pub tex_coords: Vec<Vec2>,
  /// Counter-clockwise triangles.
  pub indices: Vec<u32>,
  pub textures: Vec<Texture>,
  pub culling: Option<ClusterCullingCallback>,
  pub bound: BoundingSphere,
}

impl Mesh {
  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }
}

/// Raw height field, drawn by the consumer.
#[derive(Clone, Debug)]
pub struct HeightFieldShape {
  pub name: String,
  pub origin: DVec2,
  pub x_interval: f64,
  pub y_interval: f64,
  pub num_columns: u32,
  pub num_rows: u32,
  pub heights: Vec<f32>,
  pub skirt_height: f64,
  pub textures: Vec<Texture>,
  pub bound: BoundingSphere,
}

/// Visible distance band of an LOD child.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodRange {
  pub min: f64,
  pub max: f64,
}

impl LodRange {
  pub fn new(min: f64, max: f64) -> Self {
    Self { min, max }
  }
}

// =============================================================================
// SceneNode
// =============================================================================

#[derive(Clone, Debug)]
pub enum SceneNode {
  Group(Vec<SceneNode>),
  /// Children shown by eye distance.
  Lod {
    center: DVec3,
    radius: f64,
    children: Vec<(SceneNode, LodRange)>,
    culling: Option<ClusterCullingCallback>,
  },
  /// Coarse child held inline, fine child loaded from `file_name`.
  PagedLod {
    center: DVec3,
    radius: f64,
    near: Box<SceneNode>,
    near_range: LodRange,
    file_name: String,
    file_range: LodRange,
    culling: Option<ClusterCullingCallback>,
  },
  Transform {
    matrix: DMat4,
    child: Box<SceneNode>,
  },
  Mesh(Mesh),
  HeightField(HeightFieldShape),
  /// Model referenced by name.
  External { name: String },
  CoordinateSystem {
    wkt: String,
    ellipsoid: Option<EllipsoidModel>,
    child: Box<SceneNode>,
  },
}

impl SceneNode {
  /// Sphere enclosing everything below this node; paged children are not
  /// loaded, so only the stored centre and radius count.
  pub fn bound(&self) -> BoundingSphere {
    match self {
      SceneNode::Group(children) => {
        let mut bound = BoundingSphere::invalid();
        for child in children {
          bound.expand_by(&child.bound());
        }
        bound
      }
      SceneNode::Lod { center, radius, .. } | SceneNode::PagedLod { center, radius, .. } => {
        BoundingSphere::new(*center, *radius)
      }
      SceneNode::Transform { matrix, child } => child.bound().transformed(matrix),
      SceneNode::Mesh(mesh) => mesh.bound,
      SceneNode::HeightField(shape) => shape.bound,
      SceneNode::External { .. } => BoundingSphere::invalid(),
      SceneNode::CoordinateSystem { child, .. } => child.bound(),
    }
  }

  /// Visit this node and all inline descendants, depth first.
  pub fn visit<'a>(&'a self, f: &mut dyn FnMut(&'a SceneNode)) {
    f(self);
    match self {
      SceneNode::Group(children) => {
        for child in children {
          child.visit(f);
        }
      }
      SceneNode::Lod { children, .. } => {
        for (child, _) in children {
          child.visit(f);
        }
      }
      SceneNode::PagedLod { near, .. } => near.visit(f),
      SceneNode::Transform { child, .. } | SceneNode::CoordinateSystem { child, .. } => child.visit(f),
      SceneNode::Mesh(_) | SceneNode::HeightField(_) | SceneNode::External { .. } => {}
    }
  }

  /// Number of meshes and height fields held inline.
  pub fn drawable_count(&self) -> usize {
    let mut count = 0;
    self.visit(&mut |n| {
      if matches!(n, SceneNode::Mesh(_) | SceneNode::HeightField(_)) {
        count += 1;
      }
    });
    count
  }
}
