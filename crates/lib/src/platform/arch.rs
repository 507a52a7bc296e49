use std::fmt;

use serde::Serialize;

/// CPU architecture token a build targets (e.g. "x64", "ia32", "arm64").
///
/// Always non-empty: constructors reject blank input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TargetArch(String);

impl TargetArch {
  /// Wrap a token, trimming whitespace. Returns `None` for blank input.
  pub fn new(token: impl AsRef<str>) -> Option<Self> {
    let token = token.as_ref().trim();
    if token.is_empty() {
      None
    } else {
      Some(Self(token.to_string()))
    }
  }

  pub fn x64() -> Self {
    Self("x64".to_string())
  }

  pub fn ia32() -> Self {
    Self("ia32".to_string())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for TargetArch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl PartialEq<str> for TargetArch {
  fn eq(&self, other: &str) -> bool {
    self.0 == other
  }
}

/// Map a Rust architecture name to the build system's naming.
pub fn arch_token(rust_arch: &str) -> &str {
  match rust_arch {
    "x86_64" => "x64",
    "x86" => "ia32",
    "aarch64" => "arm64",
    "arm" => "arm",
    other => other,
  }
}

/// Returns the architecture of the machine running the pipeline.
pub fn host_arch() -> TargetArch {
  TargetArch(arch_token(std::env::consts::ARCH).to_string())
}
