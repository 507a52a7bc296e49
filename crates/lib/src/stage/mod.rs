//! Ordered, fail-fast execution of external build stages.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::environment::EnvMap;

#[derive(Debug, Error)]
pub enum StageError {
  /// The stage ran and exited unsuccessfully. `code` is `None` when it was
  /// terminated by a signal.
  #[error("stage {stage} failed with exit code {code:?}")]
  Failed { stage: String, code: Option<i32> },

  #[error("failed to launch stage {stage}: {source}")]
  Spawn {
    stage: String,
    #[source]
    source: std::io::Error,
  },
}

/// One external build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
  /// Display name used in banners and errors.
  pub name: String,
  pub program: PathBuf,
  pub args: Vec<String>,
  pub cwd: Option<PathBuf>,
  /// When set, replaces the child's environment entirely.
  /// When `None`, the child inherits the parent environment.
  pub env: Option<EnvMap>,
}

impl StageSpec {
  pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
    Self {
      name: name.into(),
      program: program.into(),
      args: Vec::new(),
      cwd: None,
      env: None,
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
    self.cwd = Some(cwd.as_ref().to_path_buf());
    self
  }

  pub fn env(mut self, env: EnvMap) -> Self {
    self.env = Some(env);
    self
  }
}

impl fmt::Display for StageSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program.display())?;
    for arg in &self.args {
      write!(f, " {arg}")?;
    }
    Ok(())
  }
}

/// How a stage process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageExit {
  pub code: Option<i32>,
}

impl StageExit {
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }
}

/// Launches a stage and waits for it to exit.
pub trait StageBackend {
  fn launch(&self, stage: &StageSpec) -> impl Future<Output = std::io::Result<StageExit>> + Send;
}

/// Runs stages as child processes with inherited stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessBackend;

impl StageBackend for ProcessBackend {
  async fn launch(&self, stage: &StageSpec) -> std::io::Result<StageExit> {
    let mut command = Command::new(&stage.program);
    command.args(&stage.args);

    if let Some(cwd) = &stage.cwd {
      command.current_dir(cwd);
    }

    if let Some(env) = &stage.env {
      command.env_clear().envs(env);
    }

    debug!(command = %stage, cwd = ?stage.cwd, hermetic = stage.env.is_some(), "spawning process");

    let status = command.status().await?;
    Ok(StageExit { code: status.code() })
  }
}

/// Executes stages strictly in order, stopping at the first failure.
#[derive(Debug, Clone, Default)]
pub struct StageRunner<B> {
  backend: B,
}

impl<B: StageBackend> StageRunner<B> {
  pub fn new(backend: B) -> Self {
    Self { backend }
  }

  pub fn backend(&self) -> &B {
    &self.backend
  }

  pub async fn run(&self, stages: &[StageSpec]) -> Result<(), StageError> {
    for stage in stages {
      self.run_one(stage).await?;
    }
    Ok(())
  }

  pub async fn run_one(&self, stage: &StageSpec) -> Result<(), StageError> {
    info!("Running {}", stage.name);

    let exit = self.backend.launch(stage).await.map_err(|source| StageError::Spawn {
      stage: stage.name.clone(),
      source,
    })?;

    if exit.success() {
      Ok(())
    } else {
      Err(StageError::Failed {
        stage: stage.name.clone(),
        code: exit.code,
      })
    }
  }

  /// Run a stage whose failure must not abort the pipeline.
  pub async fn run_best_effort(&self, stage: &StageSpec) {
    if let Err(err) = self.run_one(stage).await {
      warn!(error = %err, "ignoring failed diagnostic stage");
    }
  }
}
