//! Single-attempt transfer backends.

use std::future::Future;
use std::path::{Path, PathBuf};

use reqwest::StatusCode;
use reqwest::header::{CONTENT_RANGE, HeaderMap, RANGE};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::AttemptMode;

#[derive(Debug, Error)]
pub enum TransferError {
  #[error("request to {url} failed: {message}")]
  Request { url: String, message: String },

  #[error("HTTP {status} from {url}")]
  Status { url: String, status: u16 },

  /// A partial response that does not continue where the file on disk ends.
  #[error("{url} answered a resume at byte {expected} with range start {got:?}")]
  RangeMismatch { url: String, expected: u64, got: Option<u64> },

  /// The transfer tool exited unsuccessfully.
  #[error("transfer tool exited with code {code:?}")]
  Exit { code: Option<i32> },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Moves one remote file to a local path in a single attempt.
pub trait Transfer {
  fn transfer(&self, url: &str, dest: &Path, mode: AttemptMode) -> impl Future<Output = Result<(), TransferError>> + Send;
}

/// Native HTTP(S) transfer with byte-range resume.
#[derive(Debug, Clone, Default)]
pub struct HttpTransfer {
  client: reqwest::Client,
}

impl HttpTransfer {
  pub fn new() -> Self {
    Self::default()
  }
}

impl Transfer for HttpTransfer {
  async fn transfer(&self, url: &str, dest: &Path, mode: AttemptMode) -> Result<(), TransferError> {
    let offset = match mode {
      AttemptMode::Fresh => 0,
      AttemptMode::Resume => tokio::fs::metadata(dest).await.map(|m| m.len()).unwrap_or(0),
    };

    let mut request = self.client.get(url);
    if offset > 0 {
      request = request.header(RANGE, format!("bytes={offset}-"));
    }

    let request_err = |e: reqwest::Error| TransferError::Request {
      url: url.to_string(),
      message: e.to_string(),
    };

    let mut response = request.send().await.map_err(request_err)?;
    let status = response.status();

    // The server has nothing past our offset: the file is already whole.
    if offset > 0 && status == StatusCode::RANGE_NOT_SATISFIABLE {
      debug!(path = %dest.display(), offset, "file already complete");
      return Ok(());
    }

    if !status.is_success() {
      return Err(TransferError::Status {
        url: url.to_string(),
        status: status.as_u16(),
      });
    }

    let mut file = if offset > 0 && status == StatusCode::PARTIAL_CONTENT {
      match content_range_start(response.headers()) {
        Some(start) if start == offset => {
          debug!(path = %dest.display(), offset, "resuming download");
          OpenOptions::new().append(true).open(dest).await?
        }
        Some(0) => {
          debug!(path = %dest.display(), offset, "server restarted range at zero, rewriting");
          File::create(dest).await?
        }
        got => {
          return Err(TransferError::RangeMismatch {
            url: url.to_string(),
            expected: offset,
            got,
          });
        }
      }
    } else {
      File::create(dest).await?
    };

    while let Some(chunk) = response.chunk().await.map_err(request_err)? {
      file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok(())
  }
}

/// First byte position of a `Content-Range: bytes <start>-<end>/<len>` header.
fn content_range_start(headers: &HeaderMap) -> Option<u64> {
  let value = headers.get(CONTENT_RANGE)?.to_str().ok()?;
  let range = value.trim().strip_prefix("bytes ")?;
  range.split('-').next()?.trim().parse().ok()
}

/// Transfer delegated to a `curl` binary.
#[derive(Debug, Clone)]
pub struct CurlTransfer {
  program: PathBuf,
}

impl Default for CurlTransfer {
  fn default() -> Self {
    Self {
      program: PathBuf::from("curl"),
    }
  }
}

impl CurlTransfer {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
    }
  }
}

/// Arguments for one curl attempt. Resume attempts add `-C -`.
pub fn curl_args(url: &str, dest: &Path, mode: AttemptMode) -> Vec<String> {
  let mut args = vec![
    "-f".to_string(),
    "-L".to_string(),
    "-sS".to_string(),
    "-o".to_string(),
    dest.to_string_lossy().into_owned(),
  ];
  if mode == AttemptMode::Resume {
    args.push("-C".to_string());
    args.push("-".to_string());
  }
  args.push(url.to_string());
  args
}

impl Transfer for CurlTransfer {
  async fn transfer(&self, url: &str, dest: &Path, mode: AttemptMode) -> Result<(), TransferError> {
    let args = curl_args(url, dest, mode);
    debug!(program = %self.program.display(), args = ?args, "spawning transfer");

    let status = Command::new(&self.program).args(&args).status().await?;
    if status.success() {
      Ok(())
    } else {
      Err(TransferError::Exit { code: status.code() })
    }
  }
}

/// Runtime-selected transfer backend.
#[derive(Debug, Clone)]
pub enum TransferBackend {
  Http(HttpTransfer),
  Curl(CurlTransfer),
}

impl Transfer for TransferBackend {
  async fn transfer(&self, url: &str, dest: &Path, mode: AttemptMode) -> Result<(), TransferError> {
    match self {
      TransferBackend::Http(http) => http.transfer(url, dest, mode).await,
      TransferBackend::Curl(curl) => curl.transfer(url, dest, mode).await,
    }
  }
}
