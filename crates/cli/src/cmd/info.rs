use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use tofino_lib::config::ProjectInfo;
use tofino_lib::environment::capture_env;
use tofino_lib::platform::{Platform, host_arch};
use tofino_lib::upload::ArtifactNames;

use crate::output::{OutputFormat, print_info, print_json, print_stat, print_warning, symbols};

#[derive(Debug, Args)]
pub struct InfoArgs {
  /// Root of the source checkout
  #[arg(long, default_value = ".")]
  pub source_root: PathBuf,

  /// Override the project name from electron.gyp
  #[arg(long)]
  pub project_name: Option<String>,

  /// Override the version from electron.gyp
  #[arg(long)]
  pub release_version: Option<String>,
}

#[derive(Serialize)]
struct InfoReport {
  host: &'static str,
  platform: String,
  arch: String,
  host_arch: String,
  artifacts: Vec<String>,
}

/// Artifact names for `platform`, with project and version taken from the
/// overrides or, failing that, from the project's gyp file.
pub(crate) fn artifact_names(
  source_root: &Path,
  platform: &Platform,
  project_name: Option<String>,
  version: Option<String>,
) -> Result<ArtifactNames> {
  let (project, version) = match (project_name, version) {
    (Some(project), Some(version)) => (project, version),
    (project, version) => {
      let info = ProjectInfo::load(source_root).context("Failed to read project info")?;
      (project.unwrap_or(info.project_name), version.unwrap_or(info.version))
    }
  };

  Ok(ArtifactNames {
    project,
    version,
    platform: platform.key,
    arch: platform.arch.clone(),
  })
}

pub fn cmd_info(args: InfoArgs, output: OutputFormat) -> Result<()> {
  let platform = Platform::detect(&capture_env())?;

  let artifacts = match artifact_names(&args.source_root, &platform, args.project_name, args.release_version) {
    Ok(names) => names.kinds().into_iter().map(|kind| names.name(kind)).collect(),
    Err(err) => {
      if !output.is_json() {
        print_warning(&format!("{err:#}"));
      }
      Vec::new()
    }
  };

  if output.is_json() {
    return print_json(&InfoReport {
      host: platform.host.as_str(),
      platform: platform.key.to_string(),
      arch: platform.arch.to_string(),
      host_arch: host_arch().to_string(),
      artifacts,
    });
  }

  print_info(&format!("tofino v{}", env!("CARGO_PKG_VERSION")));
  print_stat("Host", platform.host.as_str());
  print_stat("Platform", platform.key.as_str());
  print_stat("Arch", platform.arch.as_str());
  print_stat("Host arch", host_arch().as_str());

  if !artifacts.is_empty() {
    println!();
    println!("Artifacts:");
    for name in &artifacts {
      println!("  {} {}", symbols::ARROW, name);
    }
  }

  Ok(())
}
