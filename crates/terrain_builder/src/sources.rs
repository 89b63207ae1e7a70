//! PNG-backed sources.
//!
//! Imagery is decoded to RGB8; height fields are decoded to 16-bit
//! grayscale and mapped through `value * height_scale + height_offset`.
//! Both keep the file's row order, northern row first. Model and vector
//! entries carry no raster and only need extents.

use anyhow::{Context, Result};
use log::info;
use std::path::Path;
use terrain_core::source::memory::RasterData;
use terrain_core::{DataType, ImageBuffer, MemorySources, PixelFormat, Source, SourceId, SourceType, SpatialProperties};

use crate::config::{Config, SourceConfig};

/// Decode every configured source into memory.
pub fn load_sources(config: &Config, base_dir: &Path) -> Result<MemorySources> {
	let mut sources = MemorySources::new();
	let geographic = config.is_geographic();

	for source_config in &config.sources {
		let path = base_dir.join(&source_config.path);
		let id = match source_config.source_type {
			SourceType::Image => load_image(&mut sources, source_config, &path, geographic)
				.with_context(|| format!("Loading image: {}", path.display()))?,
			SourceType::HeightField => load_heights(&mut sources, source_config, &path, geographic)
				.with_context(|| format!("Loading height field: {}", path.display()))?,
			SourceType::Model | SourceType::Vector => {
				let extents = source_config.extents(0, 0, geographic);
				let props = SpatialProperties::new(None, extents, 0, 0, DataType::None);
				let source = Source::new(source_config.name(), source_config.source_type, props);
				sources.add(source, RasterData::None)
			}
		};

		if let Some(source) = terrain_core::SourceCollection::source_mut(&mut sources, id) {
			if let Some(min_level) = source_config.min_level {
				source.min_level = min_level;
			}
			if let Some(max_level) = source_config.max_level {
				source.max_level = max_level;
			}
			info!(
				"Source '{}' ({:?}) levels {}..={}",
				source.name, source.source_type, source.min_level, source.max_level
			);
		}
	}

	Ok(sources)
}

fn load_image(sources: &mut MemorySources, config: &SourceConfig, path: &Path, geographic: bool) -> Result<SourceId> {
	let rgb = image::open(path)?.to_rgb8();
	let (width, height) = rgb.dimensions();
	let image = ImageBuffer::from_raw(width, height, PixelFormat::Rgb8, rgb.into_raw())
		.context("Decoded image has unexpected size")?;
	let extents = config.extents(width, height, geographic);
	Ok(sources.add_image(config.name(), extents, config.layer, image))
}

fn load_heights(sources: &mut MemorySources, config: &SourceConfig, path: &Path, geographic: bool) -> Result<SourceId> {
	let gray = image::open(path)?.to_luma16();
	let (width, height) = gray.dimensions();
	if width < 2 || height < 2 {
		anyhow::bail!("Height field must be at least 2x2, got {}x{}", width, height);
	}
	let values = gray
		.pixels()
		.map(|p| p.0[0] as f32 * config.height_scale + config.height_offset)
		.collect();
	// Samples sit on vertices: n samples span n - 1 intervals.
	let extents = config.extents(width - 1, height - 1, geographic);
	Ok(sources.add_heights(config.name(), extents, width, height, values))
}
