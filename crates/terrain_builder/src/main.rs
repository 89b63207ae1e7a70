//! Paged terrain database builder.
//!
//! Reads a TOML build description, loads its PNG sources, builds the
//! destination quadtree and writes the scene files:
//!
//! ```text
//!   build_terrain -c terrain.toml -o out/                       whole database
//!   build_terrain -c terrain.toml -o out/ --generate-tasks t.jsonl --split-level 2
//!   build_terrain -c terrain.toml -o out/ --split-level 2       root process
//!   build_terrain -c terrain.toml -o out/ --subtile 2 1 3       one subtile
//! ```

mod config;
mod sources;
mod tasks;
mod writer;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::{Path, PathBuf};
use terrain_core::{BuildMode, ChannelTaskSink, CoordinateKind, CoordinateSystem, DataSet};

use config::Config;
use writer::DirectorySceneWriter;

/// Paged terrain database builder.
#[derive(Parser, Debug)]
#[command(name = "build_terrain")]
#[command(about = "Builds paged LOD terrain databases from raster sources")]
struct Args {
	/// Path to configuration TOML file.
	#[arg(short, long)]
	config: PathBuf,

	/// Directory receiving scene files and textures.
	#[arg(short, long, default_value = ".")]
	output_dir: PathBuf,

	/// Override `[build] max_levels`.
	#[arg(long)]
	max_levels: Option<u32>,

	/// Build only the subtree below one composite.
	#[arg(long, num_args = 3, value_names = ["LEVEL", "X", "Y"], allow_negative_numbers = true)]
	subtile: Option<Vec<i32>>,

	/// Root process of a distributed build: stop at this level.
	#[arg(long)]
	split_level: Option<u32>,

	/// Write the distributed task list to FILE instead of building.
	#[arg(long, value_name = "FILE", requires = "split_level")]
	generate_tasks: Option<PathBuf>,
}

impl Args {
	fn build_mode(&self) -> Result<BuildMode> {
		if let Some(v) = &self.subtile {
			let level = u32::try_from(v[0]).context("Subtile level must not be negative")?;
			return Ok(BuildMode::Subtile { level, x: v[1], y: v[2] });
		}
		Ok(match self.split_level {
			Some(split_level) if self.generate_tasks.is_none() => BuildMode::Root { split_level },
			_ => BuildMode::Full,
		})
	}

	/// Command line a worker runs, without the mode flags.
	fn worker_command(&self) -> String {
		let mut command = format!(
			"build_terrain --config {} --output-dir {}",
			self.config.display(),
			self.output_dir.display()
		);
		if let Some(max_levels) = self.max_levels {
			command.push_str(&format!(" --max-levels {max_levels}"));
		}
		command
	}
}

fn main() -> Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = Args::parse();

	info!("Loading config from: {}", args.config.display());
	let mut config = Config::load(&args.config)?;
	if let Some(max_levels) = args.max_levels {
		config.build.max_levels = max_levels;
	}
	let base_dir = args.config.parent().unwrap_or(Path::new(".")).to_path_buf();
	let sources = sources::load_sources(&config, &base_dir)?;

	let mut dataset = DataSet::new(config.build.clone(), sources);
	let cs = match config.destination.coordinate_system {
		CoordinateKind::Geographic => CoordinateSystem::geographic(),
		CoordinateKind::Projected => CoordinateSystem::projected(config.destination.wkt.clone().unwrap_or_default()),
	};
	dataset.set_destination_coordinate_system(cs);
	if let Some(extents) = config.destination_extents() {
		dataset.set_destination_extents(extents);
	}
	let mode = args.build_mode()?;
	dataset.set_build_mode(mode);
	info!("Build mode: {:?}", mode);

	dataset.build_destination_graph().context("Building destination graph")?;

	if let Some(task_path) = &args.generate_tasks {
		let split_level = args.split_level.context("--generate-tasks needs --split-level")?;
		let (mut sink, receiver) = ChannelTaskSink::unbounded();
		let path = task_path.clone();
		let list = std::thread::spawn(move || tasks::write_task_list(&path, receiver));
		let source_file = args.config.display().to_string();
		dataset
			.generate_tasks(&mut sink, split_level, &args.worker_command(), &source_file)
			.context("Generating tasks")?;
		drop(sink);
		let written = list
			.join()
			.map_err(|_| anyhow::anyhow!("Task list writer panicked"))??;
		info!("Wrote {} tasks to {}", written, task_path.display());
		return Ok(());
	}

	std::fs::create_dir_all(&args.output_dir)
		.with_context(|| format!("Failed to create output dir: {}", args.output_dir.display()))?;
	let mut writer = DirectorySceneWriter::new(&args.output_dir);
	let stats = dataset.write_destination(&mut writer).context("Writing destination")?;

	info!(
		"Done: {} files, {} tiles in {} us (read {} us, equalize {} us, write {} us)",
		stats.files_written,
		stats.tiles_created,
		stats.build_graph_us + stats.read_us + stats.equalize_us + stats.write_us,
		stats.read_us,
		stats.equalize_us,
		stats.write_us
	);
	let stats_path = writer.dir().join(format!("{}_stats.json", config.build.tile_basename));
	std::fs::write(&stats_path, serde_json::to_string_pretty(&stats)?)
		.with_context(|| format!("Failed to write: {}", stats_path.display()))?;

	Ok(())
}
