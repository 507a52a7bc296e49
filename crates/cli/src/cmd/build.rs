//! Implementation of the `tofino build` command.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;

use tofino_lib::config::{BuildOptions, Config, TransferKind};
use tofino_lib::consts::DEFAULT_DEPS_URL;
use tofino_lib::environment::capture_env;
use tofino_lib::pipeline::BuildPipeline;
use tofino_lib::platform::host_arch;
use tofino_lib::stage::ProcessBackend;

use crate::output::{OutputFormat, format_duration, print_json, print_stat, print_success};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum TransferArg {
  #[default]
  Http,
  Curl,
}

impl From<TransferArg> for TransferKind {
  fn from(arg: TransferArg) -> Self {
    match arg {
      TransferArg::Http => TransferKind::Http,
      TransferArg::Curl => TransferKind::Curl,
    }
  }
}

#[derive(Debug, Args)]
pub struct BuildArgs {
  /// Root of the source checkout
  #[arg(long, default_value = ".")]
  pub source_root: PathBuf,

  /// Base URL of the prebuilt dependency mirror
  #[arg(long, env = "LIBCHROMIUMCONTENT_MIRROR", default_value = DEFAULT_DEPS_URL)]
  pub deps_url: String,

  /// Pinned dependency commit
  #[arg(long, env = "LIBCHROMIUMCONTENT_COMMIT")]
  pub deps_commit: String,

  /// Interpreter for the build scripts
  #[arg(long, default_value = "python")]
  pub python: PathBuf,

  /// How dependency archives are downloaded
  #[arg(long, value_enum, default_value_t)]
  pub transfer: TransferArg,

  /// Run `npm run lint` after bootstrap
  #[arg(long)]
  pub lint: bool,

  /// Print node and npm versions before building
  #[arg(long)]
  pub log_versions: bool,
}

#[derive(Serialize)]
struct BuildSummary {
  platform: String,
  arch: String,
  duration_ms: u128,
}

/// Execute the build command.
///
/// Resolves the platform once, then runs the whole pipeline. A failing stage's
/// exit code becomes the process exit code.
pub fn cmd_build(args: BuildArgs, output: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let options = BuildOptions {
    source_root: args.source_root,
    deps_url: args.deps_url,
    deps_commit: args.deps_commit,
    python: args.python,
    transfer: args.transfer.into(),
    lint: args.lint,
    log_versions: args.log_versions,
    staging_root: None,
  };
  let config = Config::new(std::env::consts::OS, host_arch(), capture_env(), options)?;

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let pipeline = BuildPipeline::new(&config, config.transfer_backend(), ProcessBackend);
  rt.block_on(pipeline.run())?;

  let elapsed = start.elapsed();
  if output.is_json() {
    print_json(&BuildSummary {
      platform: config.platform.key.to_string(),
      arch: config.platform.arch.to_string(),
      duration_ms: elapsed.as_millis(),
    })?;
  } else {
    println!();
    print_success("Build complete!");
    print_stat("Platform", &config.platform.to_string());
    print_stat("Transfer", &config.transfer.to_string());
    print_stat("Duration", &format_duration(elapsed));
  }

  Ok(())
}
