//! Path scope guard for caller-supplied extra paths.
//!
//! Every extra path copied into a build context must resolve strictly inside the
//! project root. The check runs twice: once on the lexically normalized path, and,
//! when the path exists, once more on the canonical (symlink-resolved) forms so a
//! link inside the project cannot smuggle in content from outside it.

use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Why a candidate path was rejected.
#[derive(Debug, Error)]
pub enum ScopeError {
  /// The candidate resolves to the scope root itself.
  #[error("forbidden path appears to equal the entire project: {path} ({resolved})")]
  EqualsScope { path: PathBuf, resolved: PathBuf },

  /// The candidate resolves somewhere outside the scope root.
  #[error("forbidden path appears to be outside of the build context: {path} ({resolved})")]
  OutsideScope { path: PathBuf, resolved: PathBuf },

  /// The path could not be made absolute or canonicalized.
  #[error("failed to resolve path '{path}': {source}")]
  Resolve {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Return the absolute form of `path` if and only if it lies strictly inside `scope`.
///
/// A relative `scope` is taken relative to the process working directory; a
/// relative `path` is taken relative to `scope`.
pub fn path_in_scope(path: &Path, scope: &Path) -> Result<PathBuf, ScopeError> {
  let scope_abs = absolute(scope)?;
  let resolved = normalize(&scope_abs.join(path));

  check_contained(path, &resolved, &scope_abs)?;

  // Re-check against the real filesystem layout if there is one to check.
  if resolved.exists() {
    let canonical = canonicalize(&resolved)?;
    let scope_canonical = if scope_abs.exists() {
      canonicalize(&scope_abs)?
    } else {
      scope_abs.clone()
    };
    check_contained(path, &canonical, &scope_canonical)?;
  }

  Ok(resolved)
}

fn check_contained(path: &Path, resolved: &Path, scope: &Path) -> Result<(), ScopeError> {
  if resolved == scope {
    return Err(ScopeError::EqualsScope {
      path: path.to_path_buf(),
      resolved: resolved.to_path_buf(),
    });
  }

  if !resolved.starts_with(scope) {
    return Err(ScopeError::OutsideScope {
      path: path.to_path_buf(),
      resolved: resolved.to_path_buf(),
    });
  }

  Ok(())
}

/// Absolute, lexically normalized form of `path`.
pub(crate) fn absolute(path: &Path) -> Result<PathBuf, ScopeError> {
  let abs = std::path::absolute(path).map_err(|e| ScopeError::Resolve {
    path: path.to_path_buf(),
    source: e,
  })?;
  Ok(normalize(&abs))
}

fn canonicalize(path: &Path) -> Result<PathBuf, ScopeError> {
  dunce::canonicalize(path).map_err(|e| ScopeError::Resolve {
    path: path.to_path_buf(),
    source: e,
  })
}

/// Resolve `.` and `..` without touching the filesystem. `..` never climbs above the root.
pub(crate) fn normalize(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        if !matches!(
          normalized.components().next_back(),
          None | Some(Component::RootDir) | Some(Component::Prefix(_))
        ) {
          normalized.pop();
        }
      }
      other => normalized.push(other.as_os_str()),
    }
  }
  normalized
}
