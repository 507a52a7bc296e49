mod cmd;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tofino_lib::pipeline::PipelineError;

use crate::cmd::{BuildArgs, InfoArgs, UploadArgs};
use crate::output::{OutputFormat, print_error};

/// tofino - build and release orchestrator for the Tofino Electron fork
#[derive(Parser)]
#[command(name = "tofino")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format for summaries
  #[arg(long, global = true, value_enum, default_value_t)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Fetch dependencies, build the codec library and the application, and package it
  Build(BuildArgs),

  /// Upload release archives for the current commit
  Upload(UploadArgs),

  /// Show the resolved platform, arch and artifact names
  Info(InfoArgs),
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let result = match cli.command {
    Commands::Build(args) => cmd::cmd_build(args, cli.output),
    Commands::Upload(args) => cmd::cmd_upload(args, cli.output),
    Commands::Info(args) => cmd::cmd_info(args, cli.output),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{err:#}"));
      let code = exit_code(&err);
      // ExitCode only carries a u8; wider codes (Windows) go through process::exit.
      match u8::try_from(code) {
        Ok(code) => ExitCode::from(code),
        Err(_) => std::process::exit(code),
      }
    }
  }
}

/// Logs go to stderr. `RUST_LOG` overrides the verbosity flag.
fn init_tracing(verbose: bool) {
  let default = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .without_time()
    .init();
}

fn exit_code(err: &anyhow::Error) -> i32 {
  err.downcast_ref::<PipelineError>().map_or(1, PipelineError::exit_code)
}
