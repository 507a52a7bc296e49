//! Release artifact naming and upload.
//!
//! Names are a pure function of project, version, platform and arch, so an
//! upload can be re-run later against the same dist directory.

pub mod s3put;

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

use crate::consts::{COMMIT_ABBREV, UPLOAD_NAMESPACE};
use crate::platform::{PlatformKey, TargetArch};

pub use s3put::{S3Credentials, S3PutStore};

#[derive(Debug, Error)]
pub enum UploadError {
  #[error("upload of {file} failed with exit code {code:?}")]
  UploadFailed { file: String, code: Option<i32> },

  #[error("missing upload credential: {0} is not set")]
  MissingCredentials(&'static str),

  #[error("could not determine commit: {0}")]
  Commit(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Kinds of archive produced per platform/arch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
  Main,
  Symbols,
  DebugSymbols,
}

impl ArtifactKind {
  fn suffix(self) -> &'static str {
    match self {
      ArtifactKind::Main => "",
      ArtifactKind::Symbols => "-symbols",
      ArtifactKind::DebugSymbols => "-dsym",
    }
  }
}

/// Deterministic release archive names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
  pub project: String,
  pub version: String,
  pub platform: PlatformKey,
  pub arch: TargetArch,
}

impl ArtifactNames {
  /// `{project}-{version}-{platform}-{arch}[-symbols|-dsym].zip`
  pub fn name(&self, kind: ArtifactKind) -> String {
    format!(
      "{}-{}-{}-{}{}.zip",
      self.project,
      self.version,
      self.platform,
      self.arch,
      kind.suffix()
    )
  }

  /// Artifact kinds built for this platform. Debug symbols only exist on macOS.
  pub fn kinds(&self) -> Vec<ArtifactKind> {
    match self.platform {
      PlatformKey::MacOs => vec![ArtifactKind::Main, ArtifactKind::Symbols, ArtifactKind::DebugSymbols],
      PlatformKey::Linux | PlatformKey::Windows => vec![ArtifactKind::Main, ArtifactKind::Symbols],
    }
  }

  /// Local paths of this platform's artifacts inside `dist_dir`.
  pub fn paths(&self, dist_dir: &Path) -> Vec<PathBuf> {
    self.kinds().into_iter().map(|kind| dist_dir.join(self.name(kind))).collect()
  }
}

/// An abbreviated commit hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitId(String);

impl CommitId {
  pub fn new(id: impl AsRef<str>) -> Option<Self> {
    let id = id.as_ref().trim();
    (!id.is_empty()).then(|| Self(id.to_string()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Read the abbreviated HEAD commit of the repository at `repo`.
  pub async fn head(repo: &Path) -> Result<Self, UploadError> {
    let output = Command::new("git")
      .args(["show", "--format=%h", "-s"])
      .arg(format!("--abbrev={COMMIT_ABBREV}"))
      .arg("HEAD")
      .current_dir(repo)
      .output()
      .await?;

    if !output.status.success() {
      return Err(UploadError::Commit(
        String::from_utf8_lossy(&output.stderr).trim().to_string(),
      ));
    }

    Self::new(String::from_utf8_lossy(&output.stdout))
      .ok_or_else(|| UploadError::Commit("git printed no commit".to_string()))
  }
}

impl fmt::Display for CommitId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Remote location all artifacts of a commit are stored under.
pub fn remote_prefix(commit: &CommitId) -> String {
  format!("{UPLOAD_NAMESPACE}/{commit}")
}

/// One upload call: local files from one directory to one remote prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
  pub local_dir: PathBuf,
  pub remote_prefix: String,
  pub files: Vec<PathBuf>,
}

/// Remote object store.
pub trait ObjectStore {
  fn put(&self, request: &UploadRequest) -> impl Future<Output = Result<(), UploadError>> + Send;
}

/// What an upload run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
  pub remote_prefix: String,
  pub uploaded: Vec<String>,
  pub skipped: Vec<String>,
}

/// Uploads release artifacts; failures are not retried.
#[derive(Debug)]
pub struct ArtifactUploader<S> {
  store: S,
}

impl<S: ObjectStore> ArtifactUploader<S> {
  pub fn new(store: S) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  /// Upload each existing artifact under the commit's remote prefix.
  ///
  /// Missing local files are skipped. The first failed upload aborts.
  pub async fn upload(&self, commit: &CommitId, artifacts: &[PathBuf]) -> Result<UploadReport, UploadError> {
    let prefix = remote_prefix(commit);
    let mut report = UploadReport {
      remote_prefix: prefix.clone(),
      ..Default::default()
    };

    for path in artifacts {
      let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

      if !path.is_file() {
        warn!(path = %path.display(), "artifact not found, skipping");
        report.skipped.push(name);
        continue;
      }

      let request = UploadRequest {
        local_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        remote_prefix: prefix.clone(),
        files: vec![path.clone()],
      };

      info!(file = %name, prefix = %prefix, "uploading");
      self.store.put(&request).await?;
      report.uploaded.push(name);
    }

    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Mutex;
  use tempfile::TempDir;

  #[derive(Debug, Default)]
  struct RecordingStore {
    fail_on: Option<String>,
    requests: Mutex<Vec<UploadRequest>>,
  }

  impl ObjectStore for RecordingStore {
    async fn put(&self, request: &UploadRequest) -> Result<(), UploadError> {
      self.requests.lock().unwrap().push(request.clone());
      let file = request.files[0].file_name().unwrap().to_string_lossy().into_owned();
      if self.fail_on.as_deref() == Some(file.as_str()) {
        return Err(UploadError::UploadFailed { file, code: Some(1) });
      }
      Ok(())
    }
  }

  fn names(platform: PlatformKey) -> ArtifactNames {
    ArtifactNames {
      project: "electron".to_string(),
      version: "10.0.0".to_string(),
      platform,
      arch: TargetArch::x64(),
    }
  }

  fn touch_all(dir: &Path, paths: &[PathBuf]) {
    for path in paths {
      std::fs::write(dir.join(path.file_name().unwrap()), b"zip").unwrap();
    }
  }

  #[test]
  fn prefix_and_names_follow_release_layout() {
    let commit = CommitId::new("abc123def456").unwrap();
    assert_eq!(remote_prefix(&commit), "mozilla/tofino-electron/abc123def456");

    let names = names(PlatformKey::Linux);
    assert_eq!(names.name(ArtifactKind::Main), "electron-10.0.0-linux-x64.zip");
    assert_eq!(names.name(ArtifactKind::Symbols), "electron-10.0.0-linux-x64-symbols.zip");
    assert_eq!(names.name(ArtifactKind::DebugSymbols), "electron-10.0.0-linux-x64-dsym.zip");
  }

  #[test]
  fn names_are_reproducible() {
    assert_eq!(
      names(PlatformKey::MacOs).paths(Path::new("dist")),
      names(PlatformKey::MacOs).paths(Path::new("dist"))
    );
  }

  #[test]
  fn debug_symbols_only_on_macos() {
    assert!(!names(PlatformKey::Linux).kinds().contains(&ArtifactKind::DebugSymbols));
    assert!(!names(PlatformKey::Windows).kinds().contains(&ArtifactKind::DebugSymbols));
    assert!(names(PlatformKey::MacOs).kinds().contains(&ArtifactKind::DebugSymbols));
  }

  #[test]
  fn blank_commit_is_rejected() {
    assert_eq!(CommitId::new("  \n"), None);
    assert_eq!(CommitId::new("abc123def456\n").unwrap().as_str(), "abc123def456");
  }

  #[tokio::test]
  async fn uploads_each_existing_artifact() {
    let dist = TempDir::new().unwrap();
    let paths = names(PlatformKey::Linux).paths(dist.path());
    touch_all(dist.path(), &paths);

    let uploader = ArtifactUploader::new(RecordingStore::default());
    let report = uploader
      .upload(&CommitId::new("abc123def456").unwrap(), &paths)
      .await
      .unwrap();

    assert_eq!(
      report.uploaded,
      vec!["electron-10.0.0-linux-x64.zip", "electron-10.0.0-linux-x64-symbols.zip"]
    );
    let requests = uploader.store().requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.remote_prefix == "mozilla/tofino-electron/abc123def456"));
    assert!(requests.iter().all(|r| r.local_dir == dist.path()));
    assert!(
      requests
        .iter()
        .all(|r| !r.files[0].to_string_lossy().ends_with("-dsym.zip"))
    );
  }

  #[tokio::test]
  async fn missing_artifacts_are_skipped() {
    let dist = TempDir::new().unwrap();
    let paths = names(PlatformKey::MacOs).paths(dist.path());
    touch_all(dist.path(), &paths[..1]);

    let uploader = ArtifactUploader::new(RecordingStore::default());
    let report = uploader.upload(&CommitId::new("abc").unwrap(), &paths).await.unwrap();

    assert_eq!(report.uploaded, vec!["electron-10.0.0-darwin-x64.zip"]);
    assert_eq!(
      report.skipped,
      vec!["electron-10.0.0-darwin-x64-symbols.zip", "electron-10.0.0-darwin-x64-dsym.zip"]
    );
  }

  #[tokio::test]
  async fn first_failed_upload_aborts() {
    let dist = TempDir::new().unwrap();
    let paths = names(PlatformKey::MacOs).paths(dist.path());
    touch_all(dist.path(), &paths);

    let uploader = ArtifactUploader::new(RecordingStore {
      fail_on: Some("electron-10.0.0-darwin-x64-symbols.zip".to_string()),
      ..Default::default()
    });
    let err = uploader.upload(&CommitId::new("abc").unwrap(), &paths).await.unwrap_err();

    assert!(matches!(err, UploadError::UploadFailed { .. }));
    // no retry and no dsym attempt after the failure
    assert_eq!(uploader.store().requests.lock().unwrap().len(), 2);
  }
}
