//! Resumable, retrying download of large dependency archives.
//!
//! Each file gets a fixed attempt budget. The first attempt starts from
//! scratch; every later attempt resumes from whatever bytes are on disk.

pub mod deps;
pub mod transfer;

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::consts::DOWNLOAD_ATTEMPTS;

pub use deps::DependencyDescriptor;
pub use transfer::{CurlTransfer, HttpTransfer, Transfer, TransferBackend, TransferError};

#[derive(Debug, Error)]
pub enum FetchError {
  /// Every attempt for a file failed.
  #[error("download of {file} failed after {attempts} attempts")]
  DownloadExhausted { file: String, attempts: u32 },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// How a single transfer attempt treats bytes already on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptMode {
  /// Start from byte zero, discarding any existing file.
  Fresh,
  /// Continue from the current length of the destination file.
  Resume,
}

impl fmt::Display for AttemptMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AttemptMode::Fresh => write!(f, "fresh"),
      AttemptMode::Resume => write!(f, "resume"),
    }
  }
}

/// Mode for a zero-based attempt index.
pub fn attempt_mode(attempt: u32) -> AttemptMode {
  if attempt == 0 { AttemptMode::Fresh } else { AttemptMode::Resume }
}

/// Downloads files through a [`Transfer`] with a bounded retry budget.
#[derive(Debug)]
pub struct RetryingFetcher<T> {
  transfer: T,
  attempts: u32,
}

impl<T: Transfer> RetryingFetcher<T> {
  pub fn new(transfer: T) -> Self {
    Self {
      transfer,
      attempts: DOWNLOAD_ATTEMPTS,
    }
  }

  pub fn transfer(&self) -> &T {
    &self.transfer
  }

  /// Fetch `base_url/<name>` into `target_dir/<name>` for every name, in order.
  ///
  /// The first file that exhausts its budget aborts the whole fetch.
  /// Returns the destination paths.
  pub async fn fetch(&self, base_url: &str, filenames: &[String], target_dir: &Path) -> Result<Vec<PathBuf>, FetchError> {
    tokio::fs::create_dir_all(target_dir).await?;

    let base = base_url.trim_end_matches('/');
    let mut fetched = Vec::with_capacity(filenames.len());

    for name in filenames {
      let url = format!("{base}/{name}");
      let dest = target_dir.join(name);
      self.fetch_named(name, &url, &dest).await?;
      fetched.push(dest);
    }

    Ok(fetched)
  }

  /// Fetch a single URL to `dest`, creating parent directories as needed.
  pub async fn fetch_file(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
    self.fetch_named(url, url, dest).await
  }

  /// `name` identifies the file in the exhaustion error.
  async fn fetch_named(&self, name: &str, url: &str, dest: &Path) -> Result<(), FetchError> {
    if let Some(parent) = dest.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }

    for attempt in 0..self.attempts {
      let mode = attempt_mode(attempt);
      info!(url = %url, attempt = attempt + 1, of = self.attempts, mode = %mode, "downloading");

      match self.transfer.transfer(url, dest, mode).await {
        Ok(()) => {
          info!(path = %dest.display(), "download complete");
          return Ok(());
        }
        Err(err) => warn!(url = %url, attempt = attempt + 1, error = %err, "download attempt failed"),
      }
    }

    Err(FetchError::DownloadExhausted {
      file: name.to_string(),
      attempts: self.attempts,
    })
  }
}
