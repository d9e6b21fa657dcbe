mod cmd;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{BuildArgs, ContextArgs, cmd_build, cmd_context};
use output::{OutputFormat, print_error};

/// fnbuild - assemble function build contexts and submit them to a remote Builder
#[derive(Parser)]
#[command(name = "fnbuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Assemble a build context on disk and print its digest
  Context {
    #[command(flatten)]
    args: ContextArgs,

    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Assemble, archive and submit a build to the Builder
  Build {
    #[command(flatten)]
    args: BuildArgs,

    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },
}

fn init_tracing(verbose: bool) {
  let filter = if verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .without_time()
    .with_writer(std::io::stderr)
    .init();
}

fn run(cli: Cli) -> Result<()> {
  match cli.command {
    Commands::Context { args, output } => cmd_context(&args, output),
    Commands::Build { args, output } => cmd_build(&args, output),
  }
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  if let Err(err) = run(cli) {
    print_error(&format!("{:#}", err));
    std::process::exit(1);
  }
}
