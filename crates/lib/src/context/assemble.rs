//! Build context assembly.
//!
//! Lays out `<build_dir>/<function>` from a language template, the function handler
//! and any extra project paths. Each run starts from an empty context directory,
//! so assembling the same inputs twice produces the same tree.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use super::scope::{absolute, path_in_scope};
use super::tree::{NodeType, copy_tree};
use super::{BuildContextConfig, ContextError};
use crate::consts::{DOCKERFILE_LANGUAGE, HANDLER_SKIP_LIST};
use crate::platform::{create_dir_with_mode, handler_dir_mode, is_running_in_ci};

/// Assembles build contexts for one project.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
  config: BuildContextConfig,
  project_root: Option<PathBuf>,
  ci: fn() -> bool,
}

/// An extra path that passed the scope check.
struct ExtraPath {
  source: PathBuf,
  relative: PathBuf,
}

impl ContextAssembler {
  pub fn new(config: BuildContextConfig) -> Self {
    Self {
      config,
      project_root: None,
      ci: is_running_in_ci,
    }
  }

  /// Root that extra paths are resolved against and must stay inside.
  /// Defaults to the current working directory.
  pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
    self.project_root = Some(root.into());
    self
  }

  /// Replace the CI probe that decides the handler directory mode.
  pub fn with_ci_detector(mut self, ci: fn() -> bool) -> Self {
    self.ci = ci;
    self
  }

  pub fn config(&self) -> &BuildContextConfig {
    &self.config
  }

  /// Create a build context for `function_name` and return its path.
  ///
  /// The handler is overlaid at the template's handler overlay path, or at the
  /// context root for `dockerfile` builds. Top-level `build` and `template`
  /// entries of the handler are never copied. Extra paths are copied under the
  /// handler destination at their project-relative location; one extra path outside
  /// the project root fails the whole request before anything on disk changes.
  pub fn assemble(
    &self,
    function_name: &str,
    handler: &Path,
    language: &str,
    extra_paths: &[PathBuf],
  ) -> Result<PathBuf, ContextError> {
    validate_function_name(function_name)?;
    let extras = self.resolve_extra_paths(extra_paths)?;

    let context_path = self.config.build_dir.join(function_name);
    clear_context(&context_path)?;

    let uses_template = language != DOCKERFILE_LANGUAGE;
    let handler_dst = if uses_template {
      context_path.join(&self.config.template_handler_overlay)
    } else {
      context_path.clone()
    };

    let mode = handler_dir_mode((self.ci)());
    create_dir_with_mode(&handler_dst, mode).map_err(|e| ContextError::CreateHandlerDir {
      path: handler_dst.clone(),
      source: e,
    })?;
    debug!(path = %handler_dst.display(), mode = %format!("{:o}", mode), "created handler destination");

    if uses_template {
      let template_src = self.config.template_dir.join(language);
      copy_tree(&template_src, &context_path, |_, _| true).map_err(|e| ContextError::TemplateCopy {
        template: language.to_string(),
        source: e,
      })?;
      debug!(template = language, "copied template");
    }

    copy_tree(handler, &handler_dst, is_handler_entry).map_err(|e| ContextError::HandlerCopy {
      path: handler.to_path_buf(),
      source: e,
    })?;

    for extra in &extras {
      let dest = handler_dst.join(&extra.relative);
      copy_tree(&extra.source, &dest, |_, _| true).map_err(|e| ContextError::ExtraPathCopy {
        path: extra.relative.clone(),
        source: e,
      })?;
      debug!(path = %extra.relative.display(), "copied extra path");
    }

    info!(
      function = function_name,
      language,
      context = %context_path.display(),
      extra_paths = extras.len(),
      "build context created"
    );
    Ok(context_path)
  }

  fn resolve_extra_paths(&self, extra_paths: &[PathBuf]) -> Result<Vec<ExtraPath>, ContextError> {
    if extra_paths.is_empty() {
      return Ok(Vec::new());
    }

    let scope = match &self.project_root {
      Some(root) => root.clone(),
      None => std::env::current_dir().map_err(ContextError::WorkingDir)?,
    };
    let scope_abs = absolute(&scope)?;

    extra_paths
      .iter()
      .map(|extra| {
        let source = path_in_scope(extra, &scope)?;
        // Both sides are lexically normalized absolute paths, so this cannot fail
        // for a path that passed the scope check.
        let relative = source
          .strip_prefix(&scope_abs)
          .map(Path::to_path_buf)
          .unwrap_or_else(|_| extra.clone());
        Ok(ExtraPath { source, relative })
      })
      .collect()
  }
}

/// Create a build context with the given config, resolving extra paths against the
/// current working directory.
pub fn create_build_context(
  function_name: &str,
  handler: &Path,
  language: &str,
  extra_paths: &[PathBuf],
  config: BuildContextConfig,
) -> Result<PathBuf, ContextError> {
  ContextAssembler::new(config).assemble(function_name, handler, language, extra_paths)
}

fn validate_function_name(name: &str) -> Result<(), ContextError> {
  let mut components = Path::new(name).components();
  match (components.next(), components.next()) {
    (Some(Component::Normal(_)), None) => Ok(()),
    _ => Err(ContextError::InvalidFunctionName(name.to_string())),
  }
}

fn clear_context(path: &Path) -> Result<(), ContextError> {
  let result = match fs::symlink_metadata(path) {
    Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
    Ok(_) => fs::remove_file(path),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(e),
  };
  result.map_err(|e| ContextError::ContextClear {
    path: path.to_path_buf(),
    source: e,
  })
}

/// Handler entries that belong in the context: everything except top-level build
/// output and template caches.
fn is_handler_entry(rel: &Path, _node_type: NodeType) -> bool {
  let top_level = rel.components().count() == 1;
  !(top_level && HANDLER_SKIP_LIST.iter().any(|skip| rel == Path::new(skip)))
}
