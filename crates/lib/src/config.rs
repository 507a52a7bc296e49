//! Run configuration.
//!
//! A [`Config`] is assembled once at process start and handed to every
//! component by reference. Nothing downstream reads process-global state.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::consts::PROJECT_GYP;
use crate::environment::EnvMap;
use crate::fetch::{CurlTransfer, DependencyDescriptor, HttpTransfer, TransferBackend};
use crate::platform::{Platform, PlatformError, TargetArch};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("variable '{key}%' not found in {path}")]
  MissingVariable { key: String, path: PathBuf },
}

/// Which tool moves dependency archives over the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransferKind {
  #[default]
  Http,
  Curl,
}

impl fmt::Display for TransferKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TransferKind::Http => write!(f, "http"),
      TransferKind::Curl => write!(f, "curl"),
    }
  }
}

/// User-supplied knobs for a build run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
  pub source_root: PathBuf,
  pub deps_url: String,
  pub deps_commit: String,
  /// Interpreter for the build scripts.
  pub python: PathBuf,
  pub transfer: TransferKind,
  /// Run `npm run lint` after bootstrap (skipped on native Windows).
  pub lint: bool,
  /// Print node/npm versions before building.
  pub log_versions: bool,
  /// Parent of the per-run staging directory. Defaults to the system temp dir.
  pub staging_root: Option<PathBuf>,
}

/// Everything a pipeline run needs, resolved once.
#[derive(Debug, Clone)]
pub struct Config {
  pub source_root: PathBuf,
  pub platform: Platform,
  pub host_arch: TargetArch,
  pub python: PathBuf,
  pub dependencies: DependencyDescriptor,
  pub transfer: TransferKind,
  pub lint: bool,
  pub log_versions: bool,
  pub staging_root: PathBuf,
  /// Environment captured at startup; the base for derived environments.
  pub env: EnvMap,
}

impl Config {
  pub fn new(host_id: &str, host_arch: TargetArch, env: EnvMap, options: BuildOptions) -> Result<Self, PlatformError> {
    let platform = Platform::resolve(host_id, &env)?;

    let dependencies = DependencyDescriptor {
      base_url: options.deps_url,
      platform: platform.key,
      arch: platform.arch.clone(),
      pin: options.deps_commit,
    };

    Ok(Self {
      source_root: options.source_root,
      platform,
      host_arch,
      python: options.python,
      dependencies,
      transfer: options.transfer,
      lint: options.lint,
      log_versions: options.log_versions,
      staging_root: options.staging_root.unwrap_or_else(std::env::temp_dir),
      env,
    })
  }

  pub fn transfer_backend(&self) -> TransferBackend {
    match self.transfer {
      TransferKind::Http => TransferBackend::Http(HttpTransfer::new()),
      TransferKind::Curl => TransferBackend::Curl(CurlTransfer::default()),
    }
  }
}

/// Project metadata declared in the project's gyp file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
  pub project_name: String,
  pub product_name: String,
  pub version: String,
}

impl ProjectInfo {
  /// Load from `<source_root>/electron.gyp`.
  pub fn load(source_root: &Path) -> Result<Self, ConfigError> {
    let path = source_root.join(PROJECT_GYP);
    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
      path: path.clone(),
      source,
    })?;
    Self::parse(&content, &path)
  }

  pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
    let get = |key: &str| {
      gyp_variable(content, key).ok_or_else(|| ConfigError::MissingVariable {
        key: key.to_string(),
        path: path.to_path_buf(),
      })
    };

    Ok(Self {
      project_name: get("project_name")?,
      product_name: get("product_name")?,
      version: get("version")?,
    })
  }
}

/// Find a `'key%': 'value'` entry in a gyp variables block.
fn gyp_variable(content: &str, key: &str) -> Option<String> {
  let single = format!("'{key}%'");
  let double = format!("\"{key}%\"");

  content.lines().find_map(|line| {
    let line = line.trim();
    let rest = line.strip_prefix(&single).or_else(|| line.strip_prefix(&double))?;
    let value = rest.trim_start().strip_prefix(':')?.trim().trim_end_matches(',').trim();
    let value = value.trim_matches(|c| c == '\'' || c == '"');
    (!value.is_empty()).then(|| value.to_string())
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  const GYP: &str = r#"{
  'variables': {
    'project_name%': 'electron',
    'product_name%': 'Electron',
    'company_name%': 'GitHub, Inc',
    "version%": "1.2.3",
  },
  'includes': [
    'filenames.gypi',
  ],
}"#;

  #[test]
  fn parses_project_variables() {
    let info = ProjectInfo::parse(GYP, Path::new("electron.gyp")).unwrap();
    assert_eq!(
      info,
      ProjectInfo {
        project_name: "electron".to_string(),
        product_name: "Electron".to_string(),
        version: "1.2.3".to_string(),
      }
    );
  }

  #[test]
  fn missing_variable_is_reported() {
    let err = ProjectInfo::parse("{ 'variables': {} }", Path::new("electron.gyp")).unwrap_err();
    assert!(matches!(err, ConfigError::MissingVariable { ref key, .. } if key == "project_name"));
  }

  #[test]
  fn load_reads_from_source_root() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join(PROJECT_GYP), GYP).unwrap();
    assert_eq!(ProjectInfo::load(temp.path()).unwrap().version, "1.2.3");
  }

  #[test]
  fn load_without_gyp_fails() {
    let temp = TempDir::new().unwrap();
    assert!(matches!(ProjectInfo::load(temp.path()), Err(ConfigError::Read { .. })));
  }

  #[test]
  fn config_derives_dependency_descriptor_from_platform() {
    let mut env = EnvMap::new();
    env.insert("TARGET_ARCH".to_string(), "arm".to_string());

    let config = Config::new(
      "linux",
      TargetArch::x64(),
      env,
      BuildOptions {
        source_root: PathBuf::from("/src"),
        deps_url: "https://deps.example".to_string(),
        deps_commit: "cafe".to_string(),
        python: PathBuf::from("python"),
        transfer: TransferKind::Curl,
        lint: false,
        log_versions: false,
        staging_root: None,
      },
    )
    .unwrap();

    assert_eq!(config.dependencies.arch.as_str(), "arm");
    assert_eq!(config.dependencies.filenames()[0], "linux/arm/cafe/libchromiumcontent.zip");
    assert!(matches!(config.transfer_backend(), TransferBackend::Curl(_)));
  }
}
