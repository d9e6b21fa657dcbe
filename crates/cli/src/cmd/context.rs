//! Implementation of the `fnbuild context` command.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use fnbuild_lib::consts::{DEFAULT_BUILD_DIR, DEFAULT_TEMPLATE_DIR, DEFAULT_TEMPLATE_HANDLER};
use fnbuild_lib::context::{BuildContextConfig, ContextAssembler};
use fnbuild_lib::util::hash::hash_context;

use crate::output::{OutputFormat, format_duration, print_json, print_stat, print_success};

/// Inputs for assembling a build context, shared with `fnbuild build`.
#[derive(Debug, Args)]
pub struct ContextArgs {
  /// Function name; the context is created at <build-dir>/<name>
  pub name: String,

  /// Directory holding the function handler
  #[arg(long)]
  pub handler: PathBuf,

  /// Template language, or `dockerfile` to build the handler's own Dockerfile
  #[arg(long = "lang")]
  pub language: String,

  /// Extra project path to copy into the handler directory (repeatable)
  #[arg(long = "copy-extra")]
  pub copy_extra: Vec<PathBuf>,

  #[arg(long, default_value = DEFAULT_BUILD_DIR)]
  pub build_dir: PathBuf,

  #[arg(long, default_value = DEFAULT_TEMPLATE_DIR)]
  pub template_dir: PathBuf,

  /// Path inside the template that the handler is copied over
  #[arg(long, default_value = DEFAULT_TEMPLATE_HANDLER)]
  pub handler_overlay: PathBuf,
}

impl ContextArgs {
  pub fn assemble(&self) -> Result<PathBuf> {
    let config = BuildContextConfig::default()
      .with_build_dir(&self.build_dir)
      .with_template_dir(&self.template_dir)
      .with_handler_overlay(&self.handler_overlay);

    ContextAssembler::new(config)
      .assemble(&self.name, &self.handler, &self.language, &self.copy_extra)
      .with_context(|| format!("Failed to create build context for '{}'", self.name))
  }
}

#[derive(Serialize)]
struct ContextSummary<'a> {
  function: &'a str,
  context: PathBuf,
  digest: String,
}

pub fn cmd_context(args: &ContextArgs, output: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let context = args.assemble()?;
  let digest = hash_context(&context).context("Failed to hash build context")?;

  if output.is_json() {
    print_json(&ContextSummary {
      function: &args.name,
      context,
      digest: digest.0,
    })?;
  } else {
    print_success("Build context created");
    print_stat("Function", &args.name);
    print_stat("Context", &context.display().to_string());
    print_stat("Digest", &digest.to_string());
    print_stat("Duration", &format_duration(start.elapsed()));
  }

  Ok(())
}
