//! Implementation of the `tofino upload` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use tofino_lib::consts::DIST_DIR;
use tofino_lib::environment::capture_env;
use tofino_lib::platform::Platform;
use tofino_lib::upload::{ArtifactUploader, CommitId, S3Credentials, S3PutStore};

use super::info::artifact_names;
use crate::output::{OutputFormat, print_json, print_stat, print_success, print_warning};

#[derive(Debug, Args)]
pub struct UploadArgs {
  /// Root of the source checkout
  #[arg(long, default_value = ".")]
  pub source_root: PathBuf,

  /// Commit to upload under (defaults to the abbreviated HEAD)
  #[arg(long)]
  pub commit: Option<String>,

  /// Override the project name from electron.gyp
  #[arg(long)]
  pub project_name: Option<String>,

  /// Override the version from electron.gyp
  #[arg(long)]
  pub release_version: Option<String>,
}

/// Execute the upload command.
///
/// Credentials are checked before anything else, so a misconfigured run
/// never gets as far as a partial upload.
pub fn cmd_upload(args: UploadArgs, output: OutputFormat) -> Result<()> {
  let env = capture_env();
  let credentials = S3Credentials::from_env(&env)?;

  let platform = Platform::detect(&env)?;
  let names = artifact_names(&args.source_root, &platform, args.project_name, args.release_version)?;
  let paths = names.paths(&args.source_root.join(DIST_DIR));

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

  let commit = match args.commit.as_deref().and_then(CommitId::new) {
    Some(commit) => commit,
    None => rt
      .block_on(CommitId::head(&args.source_root))
      .context("Failed to determine commit")?,
  };
  info!(commit = %commit, artifacts = paths.len(), "uploading release artifacts");

  let uploader = ArtifactUploader::new(S3PutStore::new(credentials));
  let report = rt.block_on(uploader.upload(&commit, &paths))?;

  if output.is_json() {
    return print_json(&report);
  }

  for name in &report.skipped {
    print_warning(&format!("Skipped missing artifact {name}"));
  }
  print_success(&format!("Uploaded {} artifact(s)", report.uploaded.len()));
  print_stat("Remote", &report.remote_prefix);
  for name in &report.uploaded {
    print_stat("File", name);
  }

  Ok(())
}
