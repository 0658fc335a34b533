/// Application name, used for config and cache directories.
pub const APP_NAME: &str = "podpack";

/// Spec source used when none is given on the command line.
pub const DEFAULT_SPEC_SOURCE: &str = "https://github.com/CocoaPods/Specs.git";

/// Build configuration requested from the native builder by default.
pub const DEFAULT_CONFIGURATION: &str = "Release";

/// Sandbox root, relative to the installation root.
pub const SANDBOX_DIR: &str = "Pods";

/// Lock file the dependency installer leaves at the installation root.
pub const LOCKFILE_NAME: &str = "Podfile.lock";

/// Prefix of per-invocation working directories under the system temp root.
pub const WORK_DIR_PREFIX: &str = "podpack-";
