//! Configuration parsing for terrain database builds.
//!
//! ```toml
//! [destination]
//! coordinate_system = "geographic"
//! extents = [-10.0, 40.0, 10.0, 60.0]   # optional, default: union of sources
//!
//! [[sources]]
//! path = "ortho.png"
//! type = "image"
//! extents = [-10.0, 40.0, 10.0, 60.0]
//!
//! [[sources]]
//! path = "dem.png"
//! type = "height_field"
//! geo_transform = [-10.0, 0.01, 0.0, 60.0, 0.0, -0.01]
//! height_scale = 0.1
//!
//! [build]
//! max_levels = 8
//! database_type = "paged_lod"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use terrain_core::{BuildOptions, CoordinateKind, GeoTransform, GeospatialExtents, SourceType};

/// Root configuration of one build.
#[derive(Debug, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub destination: DestinationConfig,
	pub sources: Vec<SourceConfig>,
	#[serde(default)]
	pub build: BuildOptions,
}

/// Output coordinate system and area.
#[derive(Debug, Default, Deserialize)]
pub struct DestinationConfig {
	#[serde(default)]
	pub coordinate_system: CoordinateKind,
	/// Definition passed through to the root scene; defaults per kind.
	pub wkt: Option<String>,
	/// `[x_min, y_min, x_max, y_max]`.
	pub extents: Option<[f64; 4]>,
}

/// One input file.
#[derive(Debug, Deserialize)]
pub struct SourceConfig {
	/// Relative paths resolve against the config file's directory.
	pub path: PathBuf,
	#[serde(rename = "type")]
	pub source_type: SourceType,
	/// Target image layer.
	#[serde(default)]
	pub layer: u32,
	pub min_level: Option<u32>,
	pub max_level: Option<u32>,
	/// `[x_min, y_min, x_max, y_max]`.
	pub extents: Option<[f64; 4]>,
	/// North-up GDAL coefficients, used when `extents` is absent.
	pub geo_transform: Option<[f64; 6]>,
	#[serde(default = "default_height_scale")]
	pub height_scale: f32,
	#[serde(default)]
	pub height_offset: f32,
}

fn default_height_scale() -> f32 {
	1.0
}

fn to_extents(e: [f64; 4], geographic: bool) -> GeospatialExtents {
	GeospatialExtents::new(e[0], e[1], e[2], e[3], geographic)
}

impl Config {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		Self::parse(&content)
	}

	/// Parse and validate configuration text.
	pub fn parse(content: &str) -> Result<Self> {
		let config: Config = toml::from_str(content).with_context(|| "Failed to parse config TOML")?;

		if config.sources.is_empty() {
			anyhow::bail!("Config must have at least one source");
		}
		let image_size = config.build.maximum_tile_image_size;
		if image_size == 0 || !image_size.is_power_of_two() {
			anyhow::bail!("maximum_tile_image_size must be a power of 2, got {}", image_size);
		}
		if config.build.maximum_tile_terrain_size < 2 {
			anyhow::bail!(
				"maximum_tile_terrain_size must be at least 2, got {}",
				config.build.maximum_tile_terrain_size
			);
		}
		for source in &config.sources {
			if source.extents.is_none() && source.geo_transform.is_none() {
				anyhow::bail!("Source {} needs extents or geo_transform", source.path.display());
			}
			if let Some(c) = source.geo_transform {
				if c[2] != 0.0 || c[4] != 0.0 {
					anyhow::bail!("Source {}: rotated geo_transform not supported", source.path.display());
				}
			}
		}

		Ok(config)
	}

	pub fn is_geographic(&self) -> bool {
		self.destination.coordinate_system == CoordinateKind::Geographic
	}

	/// Explicit destination extents, if configured.
	pub fn destination_extents(&self) -> Option<GeospatialExtents> {
		self.destination.extents.map(|e| to_extents(e, self.is_geographic()))
	}
}

impl SourceConfig {
	/// Display name used in logs and external model nodes.
	pub fn name(&self) -> String {
		self.path
			.file_stem()
			.map(|s| s.to_string_lossy().into_owned())
			.unwrap_or_else(|| self.path.display().to_string())
	}

	/// Area covered by a `width` by `height` raster of this source.
	pub fn extents(&self, width: u32, height: u32, geographic: bool) -> GeospatialExtents {
		if let Some(e) = self.extents {
			return to_extents(e, geographic);
		}
		let transform = GeoTransform::from_coefficients(self.geo_transform.unwrap_or([0.0, 1.0, 0.0, 0.0, 0.0, -1.0]));
		let a = transform.apply(0.0, 0.0);
		let b = transform.apply(width as f64, height as f64);
		GeospatialExtents::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y), geographic)
	}
}
