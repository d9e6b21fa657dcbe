//! Content digests for assembled build contexts.
//!
//! - `ContentHash`: a full 64-character SHA-256 hex digest
//! - `hash_entries()`: digest of a walked tree
//! - `hash_context()`: digest of a directory on disk
//! - `hash_bytes()`: digest of arbitrary bytes

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::context::tree::{EntryKind, FsTree, TreeEntry, TreeError, walk_tree};

/// A full 64-character SHA256 hash.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  ContentHash(hex::encode(Sha256::digest(data)))
}

/// Digest a walked tree.
///
/// Covers relative paths, entry kinds, permission bits, file contents and symlink
/// targets. Timestamps and ownership are ignored, so two assemblies from the same
/// inputs hash equal. Entries are sorted by path before hashing.
pub fn hash_entries(entries: &[TreeEntry]) -> ContentHash {
  let mut lines: Vec<(String, String)> = entries
    .iter()
    .filter(|e| !e.is_root())
    .map(|e| {
      let rel = e.path.to_string_lossy().into_owned();
      let line = match &e.kind {
        EntryKind::Dir { mode } => format!("D:{}:{:o}", rel, mode),
        EntryKind::File { mode, contents } => format!("F:{}:{:o}:{}", rel, mode, hash_bytes(contents)),
        EntryKind::Symlink { target } => {
          format!("L:{}:{}", rel, hash_bytes(target.to_string_lossy().as_bytes()))
        }
      };
      (rel, line)
    })
    .collect();

  lines.sort_by(|a, b| a.0.cmp(&b.0));

  let mut hasher = Sha256::new();
  for (_, line) in lines {
    hasher.update(line.as_bytes());
    hasher.update(b"\n");
  }
  ContentHash(format!("{:x}", hasher.finalize()))
}

/// Digest the directory tree at `path`.
pub fn hash_context(path: &Path) -> Result<ContentHash, TreeError> {
  let entries = walk_tree(&FsTree, path, |_, _| true)?;
  Ok(hash_entries(&entries))
}
