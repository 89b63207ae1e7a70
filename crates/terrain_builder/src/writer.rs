//! Scene files on disk.
//!
//! Each scene becomes a JSON manifest of its node tree; mesh and height-field
//! textures are written beside it as `{texture name}.png`, flipped so the
//! northern row comes first.

use glam::{DMat4, DVec3};
use log::debug;
use serde_json::{json, Value};
use std::io;
use std::path::{Path, PathBuf};
use terrain_core::scene::{ClusterCullingCallback, LodRange, Texture};
use terrain_core::{SceneNode, SceneWriter};

/// Writes manifests and textures into one directory.
pub struct DirectorySceneWriter {
	dir: PathBuf,
}

impl DirectorySceneWriter {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	fn write_texture(&self, texture: &Texture) -> io::Result<String> {
		let file_name = format!("{}.png", texture.name);
		let image = &texture.image;
		let (width, height) = (image.width(), image.height());
		let mut png = image::RgbImage::new(width, height);
		for y in 0..height {
			for x in 0..width {
				png.put_pixel(x, height - 1 - y, image::Rgb(image.rgb(x, y)));
			}
		}
		png.save(self.dir.join(&file_name)).map_err(io::Error::other)?;
		Ok(file_name)
	}

	fn textures_json(&self, textures: &[Texture]) -> io::Result<Value> {
		let mut out = Vec::with_capacity(textures.len());
		for texture in textures {
			let file = self.write_texture(texture)?;
			out.push(json!({ "layer": texture.layer, "file": file }));
		}
		Ok(Value::Array(out))
	}

	/// Manifest of `node`, writing textures as they are met.
	fn node_json(&self, node: &SceneNode) -> io::Result<Value> {
		Ok(match node {
			SceneNode::Group(children) => {
				let children = children.iter().map(|c| self.node_json(c)).collect::<io::Result<Vec<_>>>()?;
				json!({ "type": "group", "children": children })
			}
			SceneNode::Lod { center, radius, children, culling } => {
				let mut out = Vec::with_capacity(children.len());
				for (child, range) in children {
					out.push(json!({ "range": range_json(range), "node": self.node_json(child)? }));
				}
				json!({
					"type": "lod",
					"center": vec3(*center),
					"radius": radius,
					"culling": culling.as_ref().map(culling_json),
					"children": out,
				})
			}
			SceneNode::PagedLod { center, radius, near, near_range, file_name, file_range, culling } => json!({
				"type": "paged_lod",
				"center": vec3(*center),
				"radius": radius,
				"culling": culling.as_ref().map(culling_json),
				"near": { "range": range_json(near_range), "node": self.node_json(near)? },
				"file": { "range": range_json(file_range), "name": file_name },
			}),
			SceneNode::Transform { matrix, child } => json!({
				"type": "transform",
				"matrix": mat4(matrix),
				"child": self.node_json(child)?,
			}),
			SceneNode::Mesh(mesh) => json!({
				"type": "mesh",
				"name": mesh.name,
				"vertices": mesh.vertices.iter().map(|v| vec3(*v)).collect::<Vec<_>>(),
				"normals": mesh.normals.iter().map(|n| [n.x, n.y, n.z]).collect::<Vec<_>>(),
				"tex_coords": mesh.tex_coords.iter().map(|t| [t.x, t.y]).collect::<Vec<_>>(),
				"indices": mesh.indices,
				"textures": self.textures_json(&mesh.textures)?,
				"culling": mesh.culling.as_ref().map(culling_json),
				"bound": { "center": vec3(mesh.bound.center), "radius": mesh.bound.radius },
			}),
			SceneNode::HeightField(shape) => json!({
				"type": "height_field",
				"name": shape.name,
				"origin": [shape.origin.x, shape.origin.y],
				"interval": [shape.x_interval, shape.y_interval],
				"size": [shape.num_columns, shape.num_rows],
				"heights": shape.heights,
				"skirt_height": shape.skirt_height,
				"textures": self.textures_json(&shape.textures)?,
			}),
			SceneNode::External { name } => json!({ "type": "external", "name": name }),
			SceneNode::CoordinateSystem { wkt, ellipsoid, child } => json!({
				"type": "coordinate_system",
				"wkt": wkt,
				"ellipsoid": ellipsoid.map(|e| json!({
					"radius_equator": e.radius_equator,
					"radius_polar": e.radius_polar,
				})),
				"child": self.node_json(child)?,
			}),
		})
	}
}

impl SceneWriter for DirectorySceneWriter {
	fn write(&mut self, node: &SceneNode, file_name: &str) -> io::Result<()> {
		let manifest = self.node_json(node)?;
		let path = self.dir.join(file_name);
		let text = serde_json::to_string_pretty(&manifest)?;
		std::fs::write(&path, text)?;
		debug!("Wrote {}", path.display());
		Ok(())
	}
}

fn vec3(v: DVec3) -> [f64; 3] {
	[v.x, v.y, v.z]
}

fn mat4(m: &DMat4) -> [f64; 16] {
	m.to_cols_array()
}

fn range_json(range: &LodRange) -> Value {
	json!([range.min, range.max])
}

fn culling_json(c: &ClusterCullingCallback) -> Value {
	json!({
		"control_point": vec3(c.control_point),
		"normal": vec3(c.normal),
		"deviation": c.deviation,
		"radius": c.radius,
	})
}
