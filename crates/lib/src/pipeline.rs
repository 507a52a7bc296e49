//! The build pipeline.
//!
//! One run, top to bottom:
//! 1. announce the resolved platform/arch
//! 2. fetch the assembler (native Windows only)
//! 3. stage dependency archives and bootstrap from them
//! 4. build the codec library under the derived environment
//! 5. run the main build
//! 6. package the distribution
//!
//! The first failure aborts the run. The staging directory is removed on
//! every exit path.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::consts::{FFMPEG_CONFIG, FFMPEG_DIR, FFMPEG_GYP, FFMPEG_OUT, GYP_MAIN, NINJA, SCRIPT_DIR, YASM_DEST, YASM_URL};
use crate::environment::{BuildEnvironment, EnvironmentBuilder};
use crate::fetch::{FetchError, RetryingFetcher, Transfer};
use crate::stage::{StageBackend, StageError, StageRunner, StageSpec};

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error(transparent)]
  Stage(#[from] StageError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl PipelineError {
  /// Process exit status for this failure.
  ///
  /// A failed stage's own non-zero code is passed through unchanged;
  /// everything else maps to 1.
  pub fn exit_code(&self) -> i32 {
    match self {
      PipelineError::Stage(StageError::Failed { code: Some(code), .. }) if *code != 0 => *code,
      _ => 1,
    }
  }
}

pub struct BuildPipeline<'a, T, B> {
  config: &'a Config,
  fetcher: RetryingFetcher<T>,
  runner: StageRunner<B>,
}

impl<'a, T: Transfer, B: StageBackend> BuildPipeline<'a, T, B> {
  pub fn new(config: &'a Config, transfer: T, backend: B) -> Self {
    Self {
      config,
      fetcher: RetryingFetcher::new(transfer),
      runner: StageRunner::new(backend),
    }
  }

  pub fn runner(&self) -> &StageRunner<B> {
    &self.runner
  }

  pub fn fetcher(&self) -> &RetryingFetcher<T> {
    &self.fetcher
  }

  pub async fn run(&self) -> Result<(), PipelineError> {
    let config = self.config;
    let host = config.platform.host;

    info!(platform = %config.platform.key, "Building for {}", config.platform.arch);

    if config.log_versions {
      for stage in self.version_stages() {
        self.runner.run_best_effort(&stage).await;
      }
    }

    if host.is_native_windows() {
      info!("Downloading yasm");
      self.fetcher.fetch_file(YASM_URL, &config.source_root.join(YASM_DEST)).await?;
    }

    self.bootstrap().await?;

    if config.lint && !host.is_native_windows() {
      self.runner.run_one(&self.lint_stage()).await?;
    }

    let env = EnvironmentBuilder::new(&config.source_root, &config.python).build(
      &config.platform,
      &config.host_arch,
      &config.env,
    );
    self.runner.run(&self.codec_stages(&env)).await?;

    self.runner.run_one(&self.script_stage("build.py", ["-c", "R"])).await?;
    self.runner.run_one(&self.script_stage("create-dist.py", [] as [&str; 0])).await?;

    info!("build complete");
    Ok(())
  }

  /// Fetch dependency archives into a fresh staging directory and run the
  /// bootstrap script against it.
  async fn bootstrap(&self) -> Result<(), PipelineError> {
    let deps = &self.config.dependencies;

    std::fs::create_dir_all(&self.config.staging_root)?;
    // Dropping the TempDir removes it, so early returns clean up too.
    let staging = tempfile::Builder::new()
      .prefix("tofino-deps-")
      .tempdir_in(&self.config.staging_root)?;
    info!(path = %staging.path().display(), pin = %deps.pin, "staging dependencies");

    self.fetcher.fetch(&deps.base_url, &deps.filenames(), staging.path()).await?;

    let result = self.runner.run_one(&self.bootstrap_stage(staging.path())).await;

    let path = staging.path().to_path_buf();
    if let Err(err) = staging.close() {
      warn!(path = %path.display(), error = %err, "failed to remove staging directory");
    }

    result?;
    Ok(())
  }

  /// `<python> script/<name> <args>` run from the source root.
  pub fn script_stage<I, S>(&self, name: &str, args: I) -> StageSpec
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let script = self.config.source_root.join(SCRIPT_DIR).join(name);
    StageSpec::new(name, &self.config.python)
      .arg(script.to_string_lossy())
      .args(args)
      .cwd(&self.config.source_root)
  }

  pub fn bootstrap_stage(&self, staging: &Path) -> StageSpec {
    self.script_stage(
      "bootstrap.py",
      [
        "-y".to_string(),
        format!("--target_arch={}", self.config.platform.arch),
        format!("--libcc_source_path={}", staging.display()),
      ],
    )
  }

  /// Gyp generation followed by ninja, both under `env`.
  pub fn codec_stages(&self, env: &BuildEnvironment) -> Vec<StageSpec> {
    let root = &self.config.source_root;
    let exe = self.config.platform.host.exe_suffix();

    let gyp = StageSpec::new("gyp", &env.interpreter)
      .args([
        GYP_MAIN.to_string(),
        "-f".to_string(),
        "ninja".to_string(),
        "--no-parallel".to_string(),
        "--depth".to_string(),
        FFMPEG_DIR.to_string(),
        FFMPEG_GYP.to_string(),
        format!("-I{FFMPEG_CONFIG}"),
        format!("-Dtarget_arch={}", self.config.platform.arch),
        format!("-Dhost_arch={}", self.config.host_arch),
      ])
      .cwd(root)
      .env(env.vars.clone());

    let ninja = StageSpec::new("ninja", root.join(format!("{NINJA}{exe}")))
      .args(["-v", "-C", FFMPEG_OUT])
      .cwd(root)
      .env(env.vars.clone());

    vec![gyp, ninja]
  }

  fn lint_stage(&self) -> StageSpec {
    StageSpec::new("npm run lint", self.npm())
      .args(["run", "lint"])
      .cwd(&self.config.source_root)
  }

  fn version_stages(&self) -> Vec<StageSpec> {
    vec![
      StageSpec::new("node --version", "node").arg("--version"),
      StageSpec::new("npm --version", self.npm()).arg("--version"),
    ]
  }

  fn npm(&self) -> PathBuf {
    if self.config.platform.host.is_native_windows() {
      PathBuf::from("npm.cmd")
    } else {
      PathBuf::from("npm")
    }
  }
}
