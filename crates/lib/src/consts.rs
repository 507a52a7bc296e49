//! Fixed names, paths and pins shared across the pipeline.

/// Environment variable overriding the target architecture.
pub const TARGET_ARCH_ENV: &str = "TARGET_ARCH";

/// Platform name exported by Visual Studio developer shells.
pub const PLATFORM_ENV: &str = "Platform";

/// Marker telling gyp to generate a cross-compiling build.
pub const CROSSCOMPILE_ENV: &str = "GYP_CROSSCOMPILE";

/// Marker pinning the MSVC generation gyp generates projects for.
pub const MSVS_VERSION_ENV: &str = "GYP_MSVS_VERSION";

/// Supported MSVC generation.
pub const MSVS_VERSION: &str = "2015";

/// Search path variable for the generator's python support libraries.
pub const PYTHONPATH_ENV: &str = "PYTHONPATH";

/// Attempts per file before a download is abandoned.
pub const DOWNLOAD_ATTEMPTS: u32 = 10;

pub const DEFAULT_DEPS_URL: &str = "https://s3.amazonaws.com/github-janky-artifacts/libchromiumcontent";

/// Archives making up one dependency drop.
pub const DEPENDENCY_ARCHIVES: &[&str] = &["libchromiumcontent.zip", "libchromiumcontent-static.zip"];

pub const YASM_URL: &str = "http://www.tortall.net/projects/yasm/releases/yasm-1.3.0-win64.exe";
pub const YASM_DEST: &str = "vendor/ffmpeg/yasm/yasm.exe";

/// Interpreter forced on Cygwin, relative to the source root.
pub const CYGWIN_PYTHON: &str = "vendor/python_26/python.exe";

pub const GYP_MAIN: &str = "vendor/brightray/vendor/gyp/gyp_main.py";
pub const GYP_PYLIB: &str = "vendor/brightray/vendor/gyp/pylib";
pub const FFMPEG_DIR: &str = "vendor/ffmpeg";
pub const FFMPEG_GYP: &str = "vendor/ffmpeg/ffmpeg/ffmpeg.gyp";
pub const FFMPEG_CONFIG: &str = "vendor/ffmpeg/config.gypi";
pub const FFMPEG_OUT: &str = "vendor/ffmpeg/out/Default";
pub const NINJA: &str = "vendor/depot_tools/ninja";

/// Directory holding the build scripts, relative to the source root.
pub const SCRIPT_DIR: &str = "script";

/// Directory `create-dist.py` writes release archives to.
pub const DIST_DIR: &str = "dist";

/// Gyp file carrying project name and version variables.
pub const PROJECT_GYP: &str = "electron.gyp";

/// Remote namespace uploads are stored under.
pub const UPLOAD_NAMESPACE: &str = "mozilla/tofino-electron";

pub const S3_BUCKET_ENV: &str = "ATOM_SHELL_S3_BUCKET";
pub const S3_ACCESS_KEY_ENV: &str = "ATOM_SHELL_S3_ACCESS_KEY";
pub const S3_SECRET_KEY_ENV: &str = "ATOM_SHELL_S3_SECRET_KEY";

/// Abbreviated commit length used in upload paths.
pub const COMMIT_ABBREV: usize = 12;
