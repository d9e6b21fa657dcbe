//! Test utilities for fnbuild-lib.
//!
//! [`MemTree`] is an in-memory [`TreeSource`] so tree walks can be tested without
//! a scratch directory. Paths are absolute and rooted at `/`.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use crate::context::tree::{NodeInfo, NodeType, TreeSource};

#[derive(Debug, Clone)]
enum MemNode {
  Dir { mode: u32 },
  File { mode: u32, contents: Vec<u8> },
  Symlink { target: PathBuf },
}

#[derive(Debug, Clone)]
pub struct MemTree {
  nodes: BTreeMap<PathBuf, MemNode>,
}

impl Default for MemTree {
  fn default() -> Self {
    Self::new()
  }
}

impl MemTree {
  pub fn new() -> Self {
    let mut nodes = BTreeMap::new();
    nodes.insert(PathBuf::from("/"), MemNode::Dir { mode: 0o755 });
    Self { nodes }
  }

  pub fn dir(mut self, rel: &str) -> Self {
    let path = self.ensure_parents(rel);
    self.nodes.insert(path, MemNode::Dir { mode: 0o755 });
    self
  }

  pub fn file(self, rel: &str, contents: &str) -> Self {
    self.file_with_mode(rel, contents, 0o644)
  }

  pub fn file_with_mode(mut self, rel: &str, contents: &str, mode: u32) -> Self {
    let path = self.ensure_parents(rel);
    self.nodes.insert(
      path,
      MemNode::File {
        mode,
        contents: contents.as_bytes().to_vec(),
      },
    );
    self
  }

  pub fn symlink(mut self, rel: &str, target: &str) -> Self {
    let path = self.ensure_parents(rel);
    self.nodes.insert(
      path,
      MemNode::Symlink {
        target: PathBuf::from(target),
      },
    );
    self
  }

  fn ensure_parents(&mut self, rel: &str) -> PathBuf {
    let path = Path::new("/").join(rel);
    for ancestor in path.ancestors().skip(1) {
      self
        .nodes
        .entry(ancestor.to_path_buf())
        .or_insert(MemNode::Dir { mode: 0o755 });
    }
    path
  }

  fn get(&self, path: &Path) -> io::Result<&MemNode> {
    self
      .nodes
      .get(path)
      .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
  }
}

impl TreeSource for MemTree {
  fn stat(&self, path: &Path) -> io::Result<NodeInfo> {
    Ok(match self.get(path)? {
      MemNode::Dir { mode } => NodeInfo {
        node_type: NodeType::Dir,
        mode: *mode,
      },
      MemNode::File { mode, .. } => NodeInfo {
        node_type: NodeType::File,
        mode: *mode,
      },
      MemNode::Symlink { .. } => NodeInfo {
        node_type: NodeType::Symlink,
        mode: 0o777,
      },
    })
  }

  fn list(&self, path: &Path) -> io::Result<Vec<OsString>> {
    match self.get(path)? {
      MemNode::Dir { .. } => Ok(
        self
          .nodes
          .keys()
          .filter(|p| p.parent() == Some(path))
          .filter_map(|p| p.file_name().map(|n| n.to_os_string()))
          .collect(),
      ),
      _ => Err(io::Error::other(format!("not a directory: {}", path.display()))),
    }
  }

  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    match self.get(path)? {
      MemNode::File { contents, .. } => Ok(contents.clone()),
      _ => Err(io::Error::other(format!("not a file: {}", path.display()))),
    }
  }

  fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
    match self.get(path)? {
      MemNode::Symlink { target } => Ok(target.clone()),
      _ => Err(io::Error::new(io::ErrorKind::InvalidInput, path.display().to_string())),
    }
  }
}
