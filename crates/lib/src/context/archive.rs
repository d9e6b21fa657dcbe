//! Tar serialization of a build context.
//!
//! Layout of the archive:
//! - `context` and `context/<relative path>` for every entry of the context tree,
//!   in sorted walk order (directories header-only, symlinks as link entries)
//! - one trailing `com.openfaas.docker.config` entry holding the JSON `BuildConfig`

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tar::{EntryType, Header, HeaderMode};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{BuildConfig, ContextError};
use crate::consts::{BUILDER_CONFIG_FILE_MODE, BUILDER_CONFIG_FILE_NAME, CONTEXT_PREFIX};

/// Write `context` and `build_config` as a tar archive at `tar_path`.
///
/// The archive is staged in a temporary file next to `tar_path` and only renamed
/// into place once fully written, so a failure never leaves a truncated archive
/// behind for a later upload to pick up. When `tar_path` lies inside `context`,
/// neither the archive nor its staging file is included.
pub fn make_tar(tar_path: &Path, context: &Path, build_config: &BuildConfig) -> Result<(), ContextError> {
  let archive_err = |e: io::Error| ContextError::Archive {
    path: tar_path.to_path_buf(),
    source: e,
  };

  let config_bytes = serde_json::to_vec(build_config).map_err(ContextError::Manifest)?;

  let context = dunce::canonicalize(context).map_err(archive_err)?;
  let staging_dir = match tar_path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };
  let staging_dir = dunce::canonicalize(staging_dir).map_err(archive_err)?;
  let staged = NamedTempFile::new_in(&staging_dir).map_err(archive_err)?;

  let mut excluded = vec![staged.path().to_path_buf()];
  if let Some(name) = tar_path.file_name() {
    excluded.push(staging_dir.join(name));
  }

  let mut builder = tar::Builder::new(BufWriter::new(staged));
  builder.follow_symlinks(false);

  let entries = append_context(&mut builder, &context, &excluded).map_err(archive_err)?;
  append_manifest(&mut builder, &config_bytes).map_err(archive_err)?;

  let staged = builder
    .into_inner()
    .map_err(archive_err)?
    .into_inner()
    .map_err(|e| archive_err(e.into_error()))?;
  staged.as_file().sync_all().map_err(archive_err)?;
  staged.persist(tar_path).map_err(|e| archive_err(e.error))?;

  info!(
    archive = %tar_path.display(),
    entries,
    manifest_bytes = config_bytes.len(),
    "build archive written"
  );
  Ok(())
}

fn append_context<W: Write>(
  builder: &mut tar::Builder<W>,
  context: &Path,
  excluded: &[PathBuf],
) -> io::Result<usize> {
  let mut count = 0;

  let walk = WalkDir::new(context).sort_by_file_name().into_iter().filter_entry(|entry| {
    let skip = excluded.iter().any(|path| path == entry.path());
    if skip {
      debug!(path = %entry.path().display(), "leaving archive out of its own context");
    }
    !skip
  });

  for entry in walk {
    let entry = entry?;
    let rel = entry.path().strip_prefix(context).map_err(io::Error::other)?;
    let name = Path::new(CONTEXT_PREFIX).join(rel);

    let meta = fs::symlink_metadata(entry.path())?;
    let mut header = Header::new_gnu();
    header.set_metadata_in_mode(&meta, HeaderMode::Complete);

    let file_type = entry.file_type();
    if file_type.is_dir() {
      header.set_size(0);
      builder.append_data(&mut header, &name, io::empty())?;
    } else if file_type.is_symlink() {
      let target = fs::read_link(entry.path())?;
      header.set_size(0);
      builder.append_link(&mut header, &name, &target)?;
    } else if file_type.is_file() {
      let file = File::open(entry.path())?;
      builder.append_data(&mut header, &name, file)?;
    } else {
      debug!(path = %entry.path().display(), "skipping special file");
      continue;
    }
    count += 1;
  }

  Ok(count)
}

fn append_manifest<W: Write>(builder: &mut tar::Builder<W>, config_bytes: &[u8]) -> io::Result<()> {
  let mut header = Header::new_gnu();
  header.set_entry_type(EntryType::Regular);
  header.set_mode(BUILDER_CONFIG_FILE_MODE);
  header.set_size(config_bytes.len() as u64);
  builder.append_data(&mut header, BUILDER_CONFIG_FILE_NAME, config_bytes)
}
