//! tofino-lib: build and release orchestration for the Tofino Electron fork
//!
//! This crate sequences the external tools that turn a source checkout into
//! release archives:
//! - `platform`: resolve the platform key and target arch for a run
//! - `fetch`: resumable, retrying download of prebuilt dependency archives
//! - `environment`: hermetic environment for the codec library build
//! - `stage`: ordered, fail-fast execution of external build stages
//! - `pipeline`: the end-to-end build
//! - `upload`: artifact naming and upload to the release bucket

pub mod config;
pub mod consts;
pub mod environment;
pub mod fetch;
pub mod pipeline;
pub mod platform;
pub mod stage;
pub mod upload;
pub mod util;
