//! Filtered recursive tree walk and materialization.
//!
//! Copying a directory is split in two: [`walk_tree`] reads a tree into an ordered
//! list of entries through the [`TreeSource`] trait, and [`write_tree`] recreates
//! those entries under a destination. The walk never touches `std::fs` directly,
//! so it can be exercised against an in-memory tree.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Errors raised while reading or writing a tree. Each variant names the offending path.
#[derive(Debug, Error)]
pub enum TreeError {
  #[error("failed to stat '{path}': {source}")]
  Stat {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to list directory '{path}': {source}")]
  List {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read file '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read symlink '{path}': {source}")]
  ReadLink {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to create directory '{path}': {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write file '{path}': {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to set permissions on '{path}': {source}")]
  SetPermissions {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to create symlink '{path}': {source}")]
  Symlink {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// What kind of node a path refers to, without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
  Dir,
  File,
  Symlink,
}

/// Type and permission bits of a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeInfo {
  pub node_type: NodeType,
  pub mode: u32,
}

/// Read-only view of a directory tree.
pub trait TreeSource {
  /// Describe `path` without following a trailing symlink.
  fn stat(&self, path: &Path) -> io::Result<NodeInfo>;

  /// Describe `path`, following it if it is a symlink. Used for walk roots.
  fn stat_follow(&self, path: &Path) -> io::Result<NodeInfo> {
    self.stat(path)
  }

  /// Names of the direct children of the directory at `path`, in any order.
  fn list(&self, path: &Path) -> io::Result<Vec<OsString>>;

  fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

  fn read_link(&self, path: &Path) -> io::Result<PathBuf>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsTree;

impl TreeSource for FsTree {
  fn stat(&self, path: &Path) -> io::Result<NodeInfo> {
    Ok(node_info(&fs::symlink_metadata(path)?))
  }

  fn stat_follow(&self, path: &Path) -> io::Result<NodeInfo> {
    Ok(node_info(&fs::metadata(path)?))
  }

  fn list(&self, path: &Path) -> io::Result<Vec<OsString>> {
    fs::read_dir(path)?
      .map(|entry| entry.map(|e| e.file_name()))
      .collect()
  }

  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    fs::read(path)
  }

  fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
    fs::read_link(path)
  }
}

fn node_info(meta: &fs::Metadata) -> NodeInfo {
  let file_type = meta.file_type();
  let node_type = if file_type.is_symlink() {
    NodeType::Symlink
  } else if file_type.is_dir() {
    NodeType::Dir
  } else {
    NodeType::File
  };
  NodeInfo {
    node_type,
    mode: mode_of(meta, node_type),
  }
}

#[cfg(unix)]
fn mode_of(meta: &fs::Metadata, _node_type: NodeType) -> u32 {
  use std::os::unix::fs::PermissionsExt;
  meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(meta: &fs::Metadata, node_type: NodeType) -> u32 {
  match node_type {
    NodeType::Dir | NodeType::Symlink => 0o755,
    NodeType::File if meta.permissions().readonly() => 0o444,
    NodeType::File => 0o644,
  }
}

/// Payload of a walked entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
  Dir { mode: u32 },
  File { mode: u32, contents: Vec<u8> },
  Symlink { target: PathBuf },
}

/// One node of a walked tree. `path` is relative to the walk root; the root itself
/// has an empty path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
  pub path: PathBuf,
  pub kind: EntryKind,
}

impl TreeEntry {
  pub fn is_root(&self) -> bool {
    self.path.as_os_str().is_empty()
  }
}

/// Walk the tree at `root`, keeping entries for which `keep` returns true.
///
/// `keep` receives the path relative to `root` and the node type; rejecting a
/// directory prunes its whole subtree. The root is always kept and is followed
/// if it is a symlink; nested symlinks are recorded as links. Children are
/// visited in sorted name order so the result is deterministic, and parents always
/// precede their children.
pub fn walk_tree<S, F>(source: &S, root: &Path, keep: F) -> Result<Vec<TreeEntry>, TreeError>
where
  S: TreeSource + ?Sized,
  F: Fn(&Path, NodeType) -> bool,
{
  let info = source.stat_follow(root).map_err(|e| TreeError::Stat {
    path: root.to_path_buf(),
    source: e,
  })?;

  let mut entries = Vec::new();
  walk_into(source, root, PathBuf::new(), info, &keep, &mut entries)?;
  Ok(entries)
}

fn walk_into<S, F>(
  source: &S,
  abs: &Path,
  rel: PathBuf,
  info: NodeInfo,
  keep: &F,
  entries: &mut Vec<TreeEntry>,
) -> Result<(), TreeError>
where
  S: TreeSource + ?Sized,
  F: Fn(&Path, NodeType) -> bool,
{
  match info.node_type {
    NodeType::File => {
      let contents = source.read(abs).map_err(|e| TreeError::Read {
        path: abs.to_path_buf(),
        source: e,
      })?;
      entries.push(TreeEntry {
        path: rel,
        kind: EntryKind::File {
          mode: info.mode,
          contents,
        },
      });
    }
    NodeType::Symlink => {
      let target = source.read_link(abs).map_err(|e| TreeError::ReadLink {
        path: abs.to_path_buf(),
        source: e,
      })?;
      entries.push(TreeEntry {
        path: rel,
        kind: EntryKind::Symlink { target },
      });
    }
    NodeType::Dir => {
      let mut names = source.list(abs).map_err(|e| TreeError::List {
        path: abs.to_path_buf(),
        source: e,
      })?;
      names.sort();

      entries.push(TreeEntry {
        path: rel.clone(),
        kind: EntryKind::Dir { mode: info.mode },
      });

      for name in names {
        let child_abs = abs.join(&name);
        let child_rel = rel.join(&name);

        let child_info = source.stat(&child_abs).map_err(|e| TreeError::Stat {
          path: child_abs.clone(),
          source: e,
        })?;

        if !keep(&child_rel, child_info.node_type) {
          debug!(path = %child_rel.display(), "skipping entry");
          continue;
        }

        walk_into(source, &child_abs, child_rel, child_info, keep, entries)?;
      }
    }
  }

  Ok(())
}

/// Recreate walked entries under `dest`.
///
/// Existing directories are reused and keep their mode; new directories get the
/// walked mode once everything beneath them has been written, so read-only source
/// directories do not block their own contents.
pub fn write_tree(entries: &[TreeEntry], dest: &Path) -> Result<(), TreeError> {
  let mut pending_modes: Vec<(PathBuf, u32)> = Vec::new();

  for entry in entries {
    let target = if entry.is_root() {
      dest.to_path_buf()
    } else {
      dest.join(&entry.path)
    };

    match &entry.kind {
      EntryKind::Dir { mode } => {
        if !target.is_dir() {
          fs::create_dir_all(&target).map_err(|e| TreeError::CreateDir {
            path: target.clone(),
            source: e,
          })?;
          pending_modes.push((target, *mode));
        }
      }
      EntryKind::File { mode, contents } => {
        ensure_parent(&target)?;
        remove_if_symlink(&target)?;
        fs::write(&target, contents).map_err(|e| TreeError::Write {
          path: target.clone(),
          source: e,
        })?;
        set_mode(&target, *mode)?;
      }
      EntryKind::Symlink { target: link_target } => {
        ensure_parent(&target)?;
        write_symlink(link_target, &target)?;
      }
    }
  }

  // Deepest directories first.
  for (path, mode) in pending_modes.iter().rev() {
    set_mode(path, *mode)?;
  }

  Ok(())
}

/// Copy `from` to `to`, keeping only entries accepted by `keep`. Returns the number
/// of entries written.
pub fn copy_tree<F>(from: &Path, to: &Path, keep: F) -> Result<usize, TreeError>
where
  F: Fn(&Path, NodeType) -> bool,
{
  let entries = walk_tree(&FsTree, from, keep)?;
  write_tree(&entries, to)?;
  debug!(from = %from.display(), to = %to.display(), entries = entries.len(), "copied tree");
  Ok(entries.len())
}

fn ensure_parent(path: &Path) -> Result<(), TreeError> {
  if let Some(parent) = path.parent() {
    if !parent.is_dir() {
      fs::create_dir_all(parent).map_err(|e| TreeError::CreateDir {
        path: parent.to_path_buf(),
        source: e,
      })?;
    }
  }
  Ok(())
}

fn remove_if_symlink(path: &Path) -> Result<(), TreeError> {
  let is_link = fs::symlink_metadata(path)
    .map(|m| m.file_type().is_symlink())
    .unwrap_or(false);
  if is_link {
    fs::remove_file(path).map_err(|e| TreeError::Write {
      path: path.to_path_buf(),
      source: e,
    })?;
  }
  Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), TreeError> {
  use std::os::unix::fs::PermissionsExt;
  fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| TreeError::SetPermissions {
    path: path.to_path_buf(),
    source: e,
  })
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), TreeError> {
  Ok(())
}

#[cfg(unix)]
fn write_symlink(link_target: &Path, path: &Path) -> Result<(), TreeError> {
  if fs::symlink_metadata(path).is_ok() {
    fs::remove_file(path).map_err(|e| TreeError::Symlink {
      path: path.to_path_buf(),
      source: e,
    })?;
  }
  std::os::unix::fs::symlink(link_target, path).map_err(|e| TreeError::Symlink {
    path: path.to_path_buf(),
    source: e,
  })
}

#[cfg(not(unix))]
fn write_symlink(link_target: &Path, path: &Path) -> Result<(), TreeError> {
  tracing::warn!(path = %path.display(), target = %link_target.display(), "symlinks are not copied on this platform");
  Ok(())
}
