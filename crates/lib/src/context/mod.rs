//! Build context assembly and archiving.
//!
//! A build context is the self-contained directory tree a remote Builder turns into
//! an image: the language template, the function handler overlaid into it, and any
//! extra project paths the function needs.
//!
//! # Submodules
//!
//! - [`scope`] - Rejects extra paths that resolve outside the project root
//! - [`tree`] - Filtered tree walk and copy
//! - [`assemble`] - Lays out a context under `<build_dir>/<function>`
//! - [`archive`] - Serializes a context plus its `BuildConfig` into a tar file

pub mod archive;
pub mod assemble;
pub mod scope;
pub mod tree;
mod types;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use archive::make_tar;
pub use assemble::{ContextAssembler, create_build_context};
pub use scope::{ScopeError, path_in_scope};
pub use types::*;

use tree::TreeError;

/// Errors raised while assembling or archiving a build context.
#[derive(Debug, Error)]
pub enum ContextError {
  /// Function names become a directory under the build dir and must be a single path segment.
  #[error("invalid function name '{0}'")]
  InvalidFunctionName(String),

  /// The project root defaulted to the working directory, which could not be read.
  #[error("failed to determine working directory: {0}")]
  WorkingDir(#[source] io::Error),

  /// An extra path escapes the project root.
  #[error(transparent)]
  ScopeViolation(#[from] ScopeError),

  #[error("unable to clear context folder '{path}': {source}")]
  ContextClear {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("error creating function handler path '{path}': {source}")]
  CreateHandlerDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("error copying template '{template}': {source}")]
  TemplateCopy {
    template: String,
    #[source]
    source: TreeError,
  },

  #[error("error copying function handler '{path}': {source}")]
  HandlerCopy {
    path: PathBuf,
    #[source]
    source: TreeError,
  },

  #[error("error copying extra path '{path}': {source}")]
  ExtraPathCopy {
    path: PathBuf,
    #[source]
    source: TreeError,
  },

  #[error("failed to write build archive '{path}': {source}")]
  Archive {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to serialize build config: {0}")]
  Manifest(#[source] serde_json::Error),
}
