//! Scene output capability.

use std::collections::BTreeMap;
use std::io;

use super::SceneNode;

/// Destination for finished scene nodes.
pub trait SceneWriter {
  /// Persist `node` under `file_name` (`{name}{extension}` or
  /// `{name}_subtile{extension}`).
  fn write(&mut self, node: &SceneNode, file_name: &str) -> io::Result<()>;
}

/// Keeps written scenes in memory, keyed by file name.
#[derive(Debug, Default)]
pub struct MemorySceneWriter {
  pub files: BTreeMap<String, SceneNode>,
  /// File names whose writes fail.
  pub fail_on: Vec<String>,
}

impl MemorySceneWriter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn failing_on(mut self, file_name: impl Into<String>) -> Self {
    self.fail_on.push(file_name.into());
    self
  }

  pub fn get(&self, file_name: &str) -> Option<&SceneNode> {
    self.files.get(file_name)
  }
}

impl SceneWriter for MemorySceneWriter {
  fn write(&mut self, node: &SceneNode, file_name: &str) -> io::Result<()> {
    if self.fail_on.iter().any(|f| f == file_name) {
      return Err(io::Error::new(io::ErrorKind::PermissionDenied, format!("cannot write {file_name}")));
    }
    self.files.insert(file_name.to_string(), node.clone());
    Ok(())
  }
}
