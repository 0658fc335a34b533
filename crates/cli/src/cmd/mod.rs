mod info;
mod package;

pub use info::cmd_info;
pub use package::{PackageArgs, cmd_package};
