//! Platform and architecture resolution.
//!
//! Resolution is a pure function of a host identifier and an environment
//! snapshot, so it can be driven with synthetic inputs in tests.

pub mod arch;
pub mod os;

use std::fmt;

use thiserror::Error;
use tracing::debug;

pub use arch::{TargetArch, host_arch};
pub use os::{HostOs, PlatformKey};

use crate::consts::{PLATFORM_ENV, TARGET_ARCH_ENV};
use crate::environment::{EnvMap, lookup};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlatformError {
  #[error("unsupported platform: {0}")]
  UnsupportedPlatform(String),
}

/// The resolved build target for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
  pub host: HostOs,
  pub key: PlatformKey,
  pub arch: TargetArch,
}

impl Platform {
  /// Resolve the platform key and target arch.
  ///
  /// Arch precedence, first match wins:
  /// 1. `TARGET_ARCH`
  /// 2. `Platform`, lower-cased (native Windows hosts only)
  /// 3. `ia32` on native Windows, `x64` elsewhere
  pub fn resolve(host_id: &str, env: &EnvMap) -> Result<Self, PlatformError> {
    let host = HostOs::from_identifier(host_id).ok_or_else(|| PlatformError::UnsupportedPlatform(host_id.to_string()))?;

    let arch = if let Some(arch) = lookup(env, host, TARGET_ARCH_ENV).and_then(TargetArch::new) {
      arch
    } else if host.is_native_windows() {
      lookup(env, host, PLATFORM_ENV)
        .and_then(|p| TargetArch::new(p.to_lowercase()))
        .unwrap_or_else(TargetArch::ia32)
    } else {
      TargetArch::x64()
    };

    debug!(host = %host, arch = %arch, "resolved platform");

    Ok(Self {
      host,
      key: host.platform_key(),
      arch,
    })
  }

  /// Resolve against the host this process runs on.
  pub fn detect(env: &EnvMap) -> Result<Self, PlatformError> {
    Self::resolve(std::env::consts::OS, env)
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.key, self.arch)
  }
}
