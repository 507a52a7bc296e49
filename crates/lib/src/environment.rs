//! Hermetic environment for the codec build.
//!
//! Overlays are applied to a copy of the inherited environment; the parent
//! process environment is never touched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::consts::{CROSSCOMPILE_ENV, CYGWIN_PYTHON, GYP_PYLIB, MSVS_VERSION, MSVS_VERSION_ENV, PYTHONPATH_ENV};
use crate::platform::{HostOs, Platform, PlatformKey, TargetArch};

/// Environment variables as a sorted key/value map.
pub type EnvMap = BTreeMap<String, String>;

/// Snapshot the current process environment.
///
/// Variables whose name or value is not valid UTF-8 are dropped with a
/// warning; hermetic stages will not see them.
pub fn capture_env() -> EnvMap {
  let mut env = EnvMap::new();
  for (name, value) in std::env::vars_os() {
    match (name.into_string(), value.into_string()) {
      (Ok(name), Ok(value)) => {
        env.insert(name, value);
      }
      (Ok(name), Err(_)) => warn!(name = %name, "dropping environment variable with non-UTF-8 value"),
      (Err(name), _) => warn!(name = %name.to_string_lossy(), "dropping environment variable with non-UTF-8 name"),
    }
  }
  env
}

/// Look up `name` the way `host` resolves variable names.
///
/// Native Windows matches names without regard to ASCII case.
pub fn lookup<'m>(env: &'m EnvMap, host: HostOs, name: &str) -> Option<&'m String> {
  if host.env_names_ignore_case() {
    env
      .iter()
      .find(|(key, _)| key.eq_ignore_ascii_case(name))
      .map(|(_, value)| value)
  } else {
    env.get(name)
  }
}

/// Set `name`, replacing an existing variable that `host` considers the same
/// name. The existing spelling of the key is kept.
pub fn set_var(env: &mut EnvMap, host: HostOs, name: &str, value: String) {
  let existing = host
    .env_names_ignore_case()
    .then(|| env.keys().find(|key| key.eq_ignore_ascii_case(name)).cloned())
    .flatten();
  env.insert(existing.unwrap_or_else(|| name.to_string()), value);
}

/// The environment and interpreter used to run the codec build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnvironment {
  pub vars: EnvMap,
  /// Executable that runs the gyp generator script.
  pub interpreter: PathBuf,
}

/// Derives a [`BuildEnvironment`] per platform/arch combination.
#[derive(Debug, Clone)]
pub struct EnvironmentBuilder<'a> {
  source_root: &'a Path,
  interpreter: &'a Path,
}

impl<'a> EnvironmentBuilder<'a> {
  /// `interpreter` is the ambient script interpreter; it is replaced only
  /// where the host cannot run the generator with it.
  pub fn new(source_root: &'a Path, interpreter: &'a Path) -> Self {
    Self {
      source_root,
      interpreter,
    }
  }

  pub fn build(&self, platform: &Platform, host_arch: &TargetArch, base: &EnvMap) -> BuildEnvironment {
    let host = platform.host;
    let mut vars = base.clone();

    match platform.key {
      PlatformKey::Linux if platform.arch != *host_arch => {
        set_var(&mut vars, host, CROSSCOMPILE_ENV, "1".to_string());
      }
      PlatformKey::Windows => {
        set_var(&mut vars, host, MSVS_VERSION_ENV, MSVS_VERSION.to_string());
      }
      PlatformKey::Linux | PlatformKey::MacOs => {}
    }

    // The bundled gyp pylib must win over any system-wide gyp install.
    let pylib = self.source_root.join(GYP_PYLIB).to_string_lossy().into_owned();
    let python_path = match lookup(base, host, PYTHONPATH_ENV).filter(|p| !p.is_empty()) {
      Some(inherited) => format!("{pylib}{}{inherited}", host.path_list_separator()),
      None => pylib,
    };
    set_var(&mut vars, host, PYTHONPATH_ENV, python_path);

    let interpreter = match host {
      // Cygwin's python cannot run gyp_main.py correctly.
      HostOs::Cygwin => self.source_root.join(CYGWIN_PYTHON),
      HostOs::Linux | HostOs::MacOs | HostOs::Windows => self.interpreter.to_path_buf(),
    };

    debug!(
      platform = %platform,
      interpreter = %interpreter.display(),
      pythonpath = ?lookup(&vars, host, PYTHONPATH_ENV),
      "derived build environment"
    );

    BuildEnvironment { vars, interpreter }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use tracing_test::traced_test;

  fn platform(host: HostOs, arch: &str) -> Platform {
    Platform {
      host,
      key: host.platform_key(),
      arch: TargetArch::new(arch).unwrap(),
    }
  }

  fn base_env() -> EnvMap {
    let mut env = EnvMap::new();
    env.insert("PYTHONPATH".to_string(), "/usr/lib/python-site".to_string());
    env.insert("HOME".to_string(), "/home/builder".to_string());
    env
  }

  fn builder() -> EnvironmentBuilder<'static> {
    EnvironmentBuilder::new(Path::new("/src"), Path::new("python"))
  }

  #[test]
  fn linux_cross_compile_sets_marker() {
    let env = builder().build(&platform(HostOs::Linux, "arm64"), &TargetArch::x64(), &base_env());
    assert_eq!(env.vars.get(CROSSCOMPILE_ENV).map(String::as_str), Some("1"));
    assert!(!env.vars.contains_key(MSVS_VERSION_ENV));
  }

  #[test]
  fn linux_native_build_has_no_marker() {
    let env = builder().build(&platform(HostOs::Linux, "x64"), &TargetArch::x64(), &base_env());
    assert!(!env.vars.contains_key(CROSSCOMPILE_ENV));
  }

  #[test]
  fn windows_pins_msvs_version() {
    let env = builder().build(&platform(HostOs::Windows, "ia32"), &TargetArch::x64(), &base_env());
    assert_eq!(env.vars.get(MSVS_VERSION_ENV).map(String::as_str), Some(MSVS_VERSION));
    // arch mismatch alone never marks a non-linux build as cross
    assert!(!env.vars.contains_key(CROSSCOMPILE_ENV));
  }

  #[test]
  fn macos_gets_neither_marker() {
    let env = builder().build(&platform(HostOs::MacOs, "arm64"), &TargetArch::x64(), &base_env());
    assert!(!env.vars.contains_key(CROSSCOMPILE_ENV));
    assert!(!env.vars.contains_key(MSVS_VERSION_ENV));
  }

  #[test]
  fn pylib_is_prepended_and_inherited_path_kept() {
    for host in [HostOs::Linux, HostOs::MacOs, HostOs::Windows, HostOs::Cygwin] {
      let env = builder().build(&platform(host, "x64"), &TargetArch::x64(), &base_env());
      let value = &env.vars[PYTHONPATH_ENV];
      let pylib = Path::new("/src").join(GYP_PYLIB).to_string_lossy().into_owned();
      let expected = format!("{pylib}{}/usr/lib/python-site", host.path_list_separator());
      assert_eq!(value, &expected, "host {host}");
    }
  }

  #[test]
  fn missing_pythonpath_yields_only_pylib() {
    let env = builder().build(&platform(HostOs::Linux, "x64"), &TargetArch::x64(), &EnvMap::new());
    assert_eq!(
      env.vars[PYTHONPATH_ENV],
      Path::new("/src").join(GYP_PYLIB).to_string_lossy()
    );
  }

  #[test]
  fn base_env_is_not_mutated() {
    let base = base_env();
    let before = base.clone();
    let env = builder().build(&platform(HostOs::Linux, "arm"), &TargetArch::x64(), &base);
    assert_eq!(base, before);
    assert_eq!(env.vars.get("HOME"), before.get("HOME"));
  }

  #[test]
  fn cygwin_forces_pinned_interpreter() {
    let env = builder().build(&platform(HostOs::Cygwin, "x64"), &TargetArch::x64(), &base_env());
    assert_eq!(env.interpreter, Path::new("/src").join(CYGWIN_PYTHON));

    let env = builder().build(&platform(HostOs::Windows, "x64"), &TargetArch::x64(), &base_env());
    assert_eq!(env.interpreter, PathBuf::from("python"));
  }

  #[test]
  fn windows_prepends_to_inherited_path_of_any_case() {
    let mut base = EnvMap::new();
    base.insert("PythonPath".to_string(), r"C:\sys\gyp".to_string());

    let env = builder().build(&platform(HostOs::Windows, "x64"), &TargetArch::x64(), &base);

    let matching: Vec<_> = env
      .vars
      .keys()
      .filter(|k| k.eq_ignore_ascii_case(PYTHONPATH_ENV))
      .collect();
    assert_eq!(matching, vec!["PythonPath"]);

    let pylib = Path::new("/src").join(GYP_PYLIB).to_string_lossy().into_owned();
    assert_eq!(env.vars["PythonPath"], format!(r"{pylib};C:\sys\gyp"));
  }

  #[test]
  fn windows_replaces_msvs_pin_of_any_case() {
    let mut base = EnvMap::new();
    base.insert("gyp_msvs_version".to_string(), "2013".to_string());

    let env = builder().build(&platform(HostOs::Windows, "ia32"), &TargetArch::x64(), &base);

    assert_eq!(env.vars.get("gyp_msvs_version").map(String::as_str), Some(MSVS_VERSION));
    assert!(!env.vars.contains_key(MSVS_VERSION_ENV));
  }

  #[test]
  fn posix_hosts_keep_names_case_sensitive() {
    let mut base = EnvMap::new();
    base.insert("PythonPath".to_string(), "/elsewhere".to_string());

    let env = builder().build(&platform(HostOs::Linux, "x64"), &TargetArch::x64(), &base);

    assert_eq!(env.vars["PythonPath"], "/elsewhere");
    assert_eq!(
      env.vars[PYTHONPATH_ENV],
      Path::new("/src").join(GYP_PYLIB).to_string_lossy()
    );
  }

  #[test]
  fn lookup_ignores_case_only_on_windows() {
    let mut env = EnvMap::new();
    env.insert("Platform".to_string(), "x64".to_string());

    assert_eq!(lookup(&env, HostOs::Windows, "PLATFORM").map(String::as_str), Some("x64"));
    assert_eq!(lookup(&env, HostOs::Linux, "PLATFORM"), None);
    assert_eq!(lookup(&env, HostOs::Cygwin, "PLATFORM"), None);
  }

  #[test]
  #[serial]
  fn capture_env_sees_process_vars() {
    temp_env::with_var("TOFINO_CAPTURE_TEST", Some("yes"), || {
      assert_eq!(capture_env().get("TOFINO_CAPTURE_TEST").map(String::as_str), Some("yes"));
    });
  }

  #[test]
  #[serial]
  #[cfg(unix)]
  #[traced_test]
  fn capture_env_warns_on_non_utf8_values() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    temp_env::with_var("TOFINO_NON_UTF8", Some(OsStr::from_bytes(b"\xff\xfe")), || {
      assert!(!capture_env().contains_key("TOFINO_NON_UTF8"));
    });
    assert!(logs_contain("TOFINO_NON_UTF8"));
  }
}
