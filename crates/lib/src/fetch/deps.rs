use crate::consts::DEPENDENCY_ARCHIVES;
use crate::platform::{PlatformKey, TargetArch};

/// Identifies one prebuilt dependency drop.
///
/// The pin is an opaque commit identifier. It is part of every archive's
/// relative path, so a new pin yields new URLs and new staged paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDescriptor {
  pub base_url: String,
  pub platform: PlatformKey,
  pub arch: TargetArch,
  pub pin: String,
}

impl DependencyDescriptor {
  /// Archive paths relative to `base_url`, e.g. `linux/x64/<pin>/libchromiumcontent.zip`.
  pub fn filenames(&self) -> Vec<String> {
    DEPENDENCY_ARCHIVES
      .iter()
      .map(|archive| format!("{}/{}/{}/{archive}", self.platform, self.arch, self.pin))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn descriptor(pin: &str) -> DependencyDescriptor {
    DependencyDescriptor {
      base_url: "https://deps.example".to_string(),
      platform: PlatformKey::Linux,
      arch: TargetArch::x64(),
      pin: pin.to_string(),
    }
  }

  #[test]
  fn filenames_are_qualified_by_platform_arch_and_pin() {
    assert_eq!(
      descriptor("0123abcd").filenames(),
      vec![
        "linux/x64/0123abcd/libchromiumcontent.zip",
        "linux/x64/0123abcd/libchromiumcontent-static.zip",
      ]
    );
  }

  #[test]
  fn changing_pin_changes_every_filename() {
    let old = descriptor("aaaa").filenames();
    let new = descriptor("bbbb").filenames();
    assert!(old.iter().all(|f| !new.contains(f)));
  }
}
