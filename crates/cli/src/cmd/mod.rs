mod build;
mod info;
mod upload;

pub use build::{BuildArgs, cmd_build};
pub use info::{InfoArgs, cmd_info};
pub use upload::{UploadArgs, cmd_upload};
