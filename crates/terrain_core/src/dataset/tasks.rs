//! Distributed build tasks.
//!
//! A distributed build runs one root process for the levels down to the
//! split level and one subtile process per split-level composite that has
//! children:
//!
//! ```text
//!   output_root.task      <command> --split-level 2
//!   output_L2_X0_Y0.task  <command> --subtile 2 0 0
//!   output_L2_X1_Y0.task  <command> --subtile 2 1 0
//!   ...
//! ```

use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;
use tracing::warn;

/// One unit of work for a worker process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Task {
  pub task_file: String,
  pub command_line: String,
  /// Source file the task reads; the scheduler waits for it to exist.
  pub source_dependency: String,
}

/// Receives tasks as they are generated.
pub trait TaskSink {
  fn add_task(&mut self, task: Task);
}

/// Collects tasks in order.
#[derive(Debug, Default)]
pub struct RecordingTaskSink {
  pub tasks: Vec<Task>,
}

impl RecordingTaskSink {
  pub fn new() -> Self {
    Self::default()
  }
}

impl TaskSink for RecordingTaskSink {
  fn add_task(&mut self, task: Task) {
    self.tasks.push(task);
  }
}

/// Forwards tasks to a scheduler thread.
pub struct ChannelTaskSink {
  sender: Sender<Task>,
}

impl ChannelTaskSink {
  /// Sink plus the receiving end for the scheduler.
  pub fn unbounded() -> (Self, Receiver<Task>) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    (Self { sender }, receiver)
  }
}

impl TaskSink for ChannelTaskSink {
  fn add_task(&mut self, task: Task) {
    if let Err(e) = self.sender.send(task) {
      warn!(task_file = %e.0.task_file, "task receiver dropped");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn task(name: &str) -> Task {
    Task {
      task_file: name.to_string(),
      command_line: "build_terrain".to_string(),
      source_dependency: "terrain.toml".to_string(),
    }
  }

  #[test]
  fn test_channel_sink_forwards_in_order() {
    let (mut sink, receiver) = ChannelTaskSink::unbounded();
    sink.add_task(task("a.task"));
    sink.add_task(task("b.task"));
    drop(sink);

    let names: Vec<String> = receiver.iter().map(|t| t.task_file).collect();
    assert_eq!(names, vec!["a.task", "b.task"]);
  }

  #[test]
  fn test_channel_sink_survives_dropped_receiver() {
    let (mut sink, receiver) = ChannelTaskSink::unbounded();
    drop(receiver);
    sink.add_task(task("a.task"));
  }
}
