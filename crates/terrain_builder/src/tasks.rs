//! Task list output for distributed builds.
//!
//! One JSON object per line, in generation order:
//!
//! ```text
//! {"task_file":"output_root.task","command_line":"build_terrain ... --split-level 2","source_dependency":"terrain.toml"}
//! ```

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use terrain_core::Task;

/// Drain `tasks` into `path` until every sender is gone. Returns the number
/// of tasks written.
pub fn write_task_list(path: &Path, tasks: Receiver<Task>) -> Result<usize> {
	let file = File::create(path).with_context(|| format!("Failed to create task list: {}", path.display()))?;
	let mut out = BufWriter::new(file);
	let mut count = 0;
	for task in tasks.iter() {
		serde_json::to_writer(&mut out, &task)?;
		out.write_all(b"\n")?;
		count += 1;
	}
	out.flush()?;
	Ok(count)
}

#[cfg(test)]
mod tests {
	use super::*;
	use terrain_core::{ChannelTaskSink, TaskSink};

	#[test]
	fn test_writes_one_line_per_task() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("tasks.jsonl");
		let (mut sink, receiver) = ChannelTaskSink::unbounded();

		let writer = {
			let path = path.clone();
			std::thread::spawn(move || write_task_list(&path, receiver))
		};
		for name in ["output_root.task", "output_L1_X0_Y0.task"] {
			sink.add_task(Task {
				task_file: name.to_string(),
				command_line: "build_terrain".to_string(),
				source_dependency: "terrain.toml".to_string(),
			});
		}
		drop(sink);

		assert_eq!(writer.join().unwrap().unwrap(), 2);
		let text = std::fs::read_to_string(&path).unwrap();
		let lines: Vec<&str> = text.lines().collect();
		assert_eq!(lines.len(), 2);
		let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
		assert_eq!(first["task_file"], "output_root.task");
	}
}
