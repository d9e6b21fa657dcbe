use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_BUILD_DIR, DEFAULT_TEMPLATE_DIR, DEFAULT_TEMPLATE_HANDLER};

/// Build parameters embedded in the archive as the manifest entry.
///
/// Serialized as `{"image": .., "buildArgs": {..}, "platforms": [..]}`; empty
/// build args and platforms are omitted. Build args are kept sorted so the
/// manifest bytes only depend on the values, not on insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
  /// Image reference to build and push.
  pub image: String,

  /// Extra `--build-arg` values for the Dockerfile.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub build_args: BTreeMap<String, String>,

  /// Target platforms for multi-arch builds.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub platforms: Vec<String>,
}

impl BuildConfig {
  pub fn new(image: impl Into<String>) -> Self {
    Self {
      image: image.into(),
      build_args: BTreeMap::new(),
      platforms: Vec::new(),
    }
  }

  pub fn build_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.build_args.insert(key.into(), value.into());
    self
  }

  pub fn platform(mut self, platform: impl Into<String>) -> Self {
    self.platforms.push(platform.into());
    self
  }
}

/// Where the assembler looks up templates and writes build contexts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContextConfig {
  /// Directory the build context is created in (`./build`).
  pub build_dir: PathBuf,

  /// Directory used to look up language templates (`./template`).
  pub template_dir: PathBuf,

  /// Path inside the template where the handler is overlaid (`function`).
  pub template_handler_overlay: PathBuf,
}

impl Default for BuildContextConfig {
  fn default() -> Self {
    Self {
      build_dir: PathBuf::from(DEFAULT_BUILD_DIR),
      template_dir: PathBuf::from(DEFAULT_TEMPLATE_DIR),
      template_handler_overlay: PathBuf::from(DEFAULT_TEMPLATE_HANDLER),
    }
  }
}

impl BuildContextConfig {
  pub fn with_build_dir(mut self, path: impl Into<PathBuf>) -> Self {
    self.build_dir = path.into();
    self
  }

  pub fn with_template_dir(mut self, path: impl Into<PathBuf>) -> Self {
    self.template_dir = path.into();
    self
  }

  pub fn with_handler_overlay(mut self, path: impl Into<PathBuf>) -> Self {
    self.template_handler_overlay = path.into();
    self
  }
}
