use std::fmt;

use serde::Serialize;

/// Host operating systems the pipeline knows how to drive.
///
/// `Cygwin` is tracked separately from `Windows`: it shares the windows
/// platform key, but arch defaults and binary suffixes follow the POSIX layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOs {
  Linux,
  MacOs,
  Windows,
  Cygwin,
}

impl HostOs {
  /// Parse a host identifier.
  ///
  /// Accepts both Rust's `std::env::consts::OS` names and the identifiers
  /// CI scripts traditionally report (`win32`, `darwin`, `linux2`).
  pub fn from_identifier(id: &str) -> Option<Self> {
    match id {
      "linux" | "linux2" => Some(Self::Linux),
      "macos" | "darwin" => Some(Self::MacOs),
      "windows" | "win32" => Some(Self::Windows),
      "cygwin" => Some(Self::Cygwin),
      _ => None,
    }
  }

  /// The canonical platform key builds for this host are tagged with.
  pub fn platform_key(self) -> PlatformKey {
    match self {
      Self::Linux => PlatformKey::Linux,
      Self::MacOs => PlatformKey::MacOs,
      Self::Windows | Self::Cygwin => PlatformKey::Windows,
    }
  }

  /// True only for native Windows, not the Cygwin layer.
  pub fn is_native_windows(self) -> bool {
    matches!(self, Self::Windows)
  }

  /// Native Windows treats environment variable names case-insensitively.
  pub fn env_names_ignore_case(self) -> bool {
    self.is_native_windows()
  }

  /// Separator for search-path style variables (`PATH`, `PYTHONPATH`).
  pub fn path_list_separator(self) -> &'static str {
    match self {
      Self::Windows => ";",
      Self::Linux | Self::MacOs | Self::Cygwin => ":",
    }
  }

  /// Suffix appended to native executables.
  pub fn exe_suffix(self) -> &'static str {
    if self.is_native_windows() { ".exe" } else { "" }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::MacOs => "macos",
      Self::Windows => "windows",
      Self::Cygwin => "cygwin",
    }
  }
}

impl fmt::Display for HostOs {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Canonical OS category used to branch build behavior and name artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum PlatformKey {
  Windows,
  MacOs,
  Linux,
}

impl PlatformKey {
  /// Returns the identifier used in artifact names and dependency URLs.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Windows => "win32",
      Self::MacOs => "darwin",
      Self::Linux => "linux",
    }
  }
}

impl fmt::Display for PlatformKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl From<PlatformKey> for String {
  fn from(key: PlatformKey) -> Self {
    key.as_str().to_string()
  }
}
