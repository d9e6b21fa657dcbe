//! Host environment probes.
//!
//! Everything here reads process-wide state. Callers that need to be testable take
//! the probe as an injected `fn() -> bool` instead of calling it directly.

use std::fs;
use std::io;
use std::path::Path;

use crate::consts::{CI_DIR_MODE, CI_ENV, DEFAULT_DIR_MODE};

/// Returns true when the `CI` environment variable is set to `true` or `1`.
pub fn is_running_in_ci() -> bool {
  matches!(std::env::var(CI_ENV).as_deref(), Ok("true") | Ok("1"))
}

/// Directory mode for freshly created handler directories.
///
/// Owner-only by default, world-writable under CI.
pub fn handler_dir_mode(ci: bool) -> u32 {
  if ci { CI_DIR_MODE } else { DEFAULT_DIR_MODE }
}

/// Recursively create `path`, then set its own mode to exactly `mode`.
///
/// Intermediate directories get `mode` filtered through the umask; the leaf is
/// chmod-ed explicitly so the umask cannot narrow it.
#[cfg(unix)]
pub fn create_dir_with_mode(path: &Path, mode: u32) -> io::Result<()> {
  use std::os::unix::fs::{DirBuilderExt, PermissionsExt};

  fs::DirBuilder::new().recursive(true).mode(mode).create(path)?;
  fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
pub fn create_dir_with_mode(path: &Path, _mode: u32) -> io::Result<()> {
  fs::create_dir_all(path)
}
