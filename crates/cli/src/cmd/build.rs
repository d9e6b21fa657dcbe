//! Implementation of the `fnbuild build` command.
//!
//! Assembles the build context, archives it with the image manifest, signs and
//! submits the archive, then reports the Builder's verdict.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Serialize;
use tempfile::TempDir;
use tracing::info;

use fnbuild_lib::builder::{BuildResult, FunctionBuilder};
use fnbuild_lib::config::BuilderSettings;
use fnbuild_lib::context::{BuildConfig, make_tar};

use super::ContextArgs;
use crate::output::{
  OutputFormat, format_bytes, format_duration, print_build_event, print_info, print_json, print_stat, print_success,
};

const ARCHIVE_FILE_NAME: &str = "req.tar";

#[derive(Debug, Args)]
pub struct BuildArgs {
  #[command(flatten)]
  pub context: ContextArgs,

  /// Image reference the Builder should produce
  #[arg(long)]
  pub image: String,

  /// Build argument as KEY=VALUE (repeatable)
  #[arg(long = "build-arg", value_parser = parse_build_arg)]
  pub build_args: Vec<(String, String)>,

  /// Target platform such as linux/arm64 (repeatable)
  #[arg(long = "platform")]
  pub platforms: Vec<String>,

  /// Builder base URL [env: FNBUILD_BUILDER_URL]
  #[arg(long)]
  pub builder_url: Option<String>,

  /// File holding the payload signing secret [env: FNBUILD_PAYLOAD_SECRET_FILE]
  #[arg(long)]
  pub payload_secret: Option<PathBuf>,

  /// Request deadline such as 90s or 10m [env: FNBUILD_BUILD_TIMEOUT]
  #[arg(long, value_parser = humantime::parse_duration)]
  pub timeout: Option<Duration>,

  /// Print build progress as it arrives
  #[arg(long)]
  pub stream: bool,

  /// Keep the archive at this path instead of a temporary directory
  #[arg(long)]
  pub tar: Option<PathBuf>,
}

impl BuildArgs {
  fn build_config(&self) -> BuildConfig {
    let config = self
      .build_args
      .iter()
      .fold(BuildConfig::new(&self.image), |config, (key, value)| {
        config.build_arg(key, value)
      });
    self
      .platforms
      .iter()
      .fold(config, |config, platform| config.platform(platform))
  }
}

fn parse_build_arg(raw: &str) -> Result<(String, String), String> {
  match raw.split_once('=') {
    Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
    _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
  }
}

#[derive(Serialize)]
struct BuildSummary<'a> {
  function: &'a str,
  image: &'a str,
  status: &'a str,
  archive_bytes: u64,
  log: &'a [String],
}

pub fn cmd_build(args: &BuildArgs, output: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let settings = BuilderSettings::resolve(
    args.builder_url.as_deref(),
    args.payload_secret.as_deref(),
    args.timeout,
  )
  .context("Invalid builder configuration")?;
  let builder = FunctionBuilder::from_settings(&settings).context("Failed to create builder client")?;

  let context = args.context.assemble()?;

  // Holds the temporary archive until the request has been sent.
  let scratch;
  let tar_path = match &args.tar {
    Some(path) => path.clone(),
    None => {
      scratch = TempDir::new().context("Failed to create temporary directory")?;
      scratch.path().join(ARCHIVE_FILE_NAME)
    }
  };

  make_tar(&tar_path, &context, &args.build_config()).context("Failed to create build archive")?;
  let archive_bytes = archive_size(&tar_path)?;
  info!(archive = %tar_path.display(), bytes = archive_bytes, "submitting build");

  let result = if args.stream {
    builder
      .build_with_stream(&tar_path)
      .context("Build request failed")?
      .follow(|event| print_build_event(event, output))
      .context("Failed to read build progress")?
  } else {
    let result = builder.build(&tar_path).context("Build request failed")?;
    if !output.is_json() {
      print_build_event(&result, output);
    }
    result
  };

  report(args, &result, archive_bytes, start.elapsed(), output)?;

  if result.is_terminal() && !result.is_success() {
    bail!("Build of '{}' finished with status '{}'", args.context.name, result.status);
  }
  Ok(())
}

fn archive_size(path: &Path) -> Result<u64> {
  let meta = fs::metadata(path).with_context(|| format!("Failed to stat archive {}", path.display()))?;
  Ok(meta.len())
}

fn report(args: &BuildArgs, result: &BuildResult, archive_bytes: u64, elapsed: Duration, output: OutputFormat) -> Result<()> {
  if output.is_json() {
    return print_json(&BuildSummary {
      function: &args.context.name,
      image: &result.image,
      status: &result.status,
      archive_bytes,
      log: if args.stream { &[] } else { result.log.as_slice() },
    });
  }

  println!();
  if result.is_success() {
    print_success("Build complete!");
  } else if result.status.is_empty() {
    print_info("Build accepted by the builder");
  } else {
    print_info(&format!("Build finished with status '{}'", result.status));
  }
  print_stat("Function", &args.context.name);
  let image = if result.image.is_empty() { &args.image } else { &result.image };
  print_stat("Image", image);
  print_stat("Archive", &format_bytes(archive_bytes));
  print_stat("Duration", &format_duration(elapsed));
  Ok(())
}
