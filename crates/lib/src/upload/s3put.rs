//! Object store backed by the `s3put` helper.

use std::fmt;
use std::path::PathBuf;

use tokio::process::Command;
use tracing::debug;

use super::{ObjectStore, UploadError, UploadRequest};
use crate::consts::{S3_ACCESS_KEY_ENV, S3_BUCKET_ENV, S3_SECRET_KEY_ENV};
use crate::environment::EnvMap;

#[derive(Clone, PartialEq, Eq)]
pub struct S3Credentials {
  pub bucket: String,
  pub access_key: String,
  pub secret_key: String,
}

impl S3Credentials {
  pub fn from_env(env: &EnvMap) -> Result<Self, UploadError> {
    let get = |name: &'static str| {
      env
        .get(name)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or(UploadError::MissingCredentials(name))
    };

    Ok(Self {
      bucket: get(S3_BUCKET_ENV)?,
      access_key: get(S3_ACCESS_KEY_ENV)?,
      secret_key: get(S3_SECRET_KEY_ENV)?,
    })
  }
}

// Keep the secret out of logs.
impl fmt::Debug for S3Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("S3Credentials")
      .field("bucket", &self.bucket)
      .field("access_key", &self.access_key)
      .field("secret_key", &"<redacted>")
      .finish()
  }
}

#[derive(Debug, Clone)]
pub struct S3PutStore {
  program: PathBuf,
  credentials: S3Credentials,
}

impl S3PutStore {
  pub fn new(credentials: S3Credentials) -> Self {
    Self {
      program: PathBuf::from("s3put"),
      credentials,
    }
  }

  pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
    self.program = program.into();
    self
  }

  pub fn args(&self, request: &UploadRequest) -> Vec<String> {
    let mut args = vec![
      "--bucket".to_string(),
      self.credentials.bucket.clone(),
      "--access_key".to_string(),
      self.credentials.access_key.clone(),
      "--secret_key".to_string(),
      self.credentials.secret_key.clone(),
      "--prefix".to_string(),
      request.local_dir.to_string_lossy().into_owned(),
      "--key_prefix".to_string(),
      request.remote_prefix.clone(),
      "--grant".to_string(),
      "public-read".to_string(),
    ];
    args.extend(request.files.iter().map(|f| f.to_string_lossy().into_owned()));
    args
  }
}

impl ObjectStore for S3PutStore {
  async fn put(&self, request: &UploadRequest) -> Result<(), UploadError> {
    debug!(program = %self.program.display(), files = ?request.files, "invoking upload helper");

    let status = Command::new(&self.program).args(self.args(request)).status().await?;
    if status.success() {
      return Ok(());
    }

    Err(UploadError::UploadFailed {
      file: request
        .files
        .iter()
        .map(|f| f.display().to_string())
        .collect::<Vec<_>>()
        .join(", "),
      code: status.code(),
    })
  }
}
