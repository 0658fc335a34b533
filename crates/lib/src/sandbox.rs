//! Dependency installation sandboxes.
//!
//! A sandbox is an isolated root holding one installation's sources, headers
//! and generated project. Sandboxes are plain values; the installer creates
//! the directories. [`SandboxGuard`] removes the whole sandbox root when a
//! platform's build ends, however it ends.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::consts::{LOCKFILE_NAME, SANDBOX_DIR};
use crate::util::fs::remove_path;

/// Subdirectory of the sandbox root used for the static sandbox when a dynamic one also exists.
pub const STATIC_SANDBOX_DIR: &str = "Static";
/// Subdirectory of the sandbox root used for the dynamic sandbox.
pub const DYNAMIC_SANDBOX_DIR: &str = "Dynamic";
/// Name of the generated native project inside a sandbox.
pub const PROJECT_DIR: &str = "Pods.xcodeproj";

/// Where installations happen for one platform build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
  /// Directory the installer runs in (the working directory).
  pub installation_root: PathBuf,
  /// Sandbox root, relative to `installation_root`.
  pub sandbox_root: PathBuf,
}

impl BuildConfig {
  pub fn new(installation_root: impl Into<PathBuf>) -> Self {
    Self {
      installation_root: installation_root.into(),
      sandbox_root: PathBuf::from(SANDBOX_DIR),
    }
  }

  pub fn sandbox_root_path(&self) -> PathBuf {
    self.installation_root.join(&self.sandbox_root)
  }

  pub fn lockfile_path(&self) -> PathBuf {
    self.installation_root.join(LOCKFILE_NAME)
  }

  /// Express an absolute path inside the installation root relative to it.
  pub fn relative(&self, path: &Path) -> PathBuf {
    path
      .strip_prefix(&self.installation_root)
      .map(Path::to_path_buf)
      .unwrap_or_else(|_| path.to_path_buf())
  }
}

/// A pod installed from a local directory rather than a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPod {
  pub path: PathBuf,
  pub was_absolute: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
  root: PathBuf,
  local_pods: BTreeMap<String, LocalPod>,
}

impl Sandbox {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      local_pods: BTreeMap::new(),
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Directory holding a pod's resolved sources.
  pub fn pod_dir(&self, name: &str) -> PathBuf {
    match self.local_pods.get(name) {
      Some(local) => local.path.clone(),
      None => self.root.join(name),
    }
  }

  pub fn headers_root(&self) -> PathBuf {
    self.root.join("Headers")
  }

  pub fn public_headers_root(&self) -> PathBuf {
    self.headers_root().join("Public")
  }

  pub fn project_path(&self) -> PathBuf {
    self.root.join(PROJECT_DIR)
  }

  /// Record that a pod is served from a local directory.
  pub fn store_local_path(&mut self, name: &str, path: impl Into<PathBuf>, was_absolute: bool) {
    self.local_pods.insert(
      name.to_string(),
      LocalPod {
        path: path.into(),
        was_absolute,
      },
    );
  }

  pub fn is_local(&self, name: &str) -> bool {
    self.local_pods.contains_key(name)
  }

  pub fn local_path_was_absolute(&self, name: &str) -> bool {
    self.local_pods.get(name).is_some_and(|local| local.was_absolute)
  }
}

/// Sandbox for the full static installation.
///
/// Nested under `Static` when a dynamic sandbox will sit next to it.
pub fn build_static_sandbox(config: &BuildConfig, dynamic: bool) -> Sandbox {
  let root = config.sandbox_root_path();
  if dynamic {
    Sandbox::new(root.join(STATIC_SANDBOX_DIR))
  } else {
    Sandbox::new(root)
  }
}

/// Sandbox holding only the packaged spec, for dynamic linking.
pub fn build_dynamic_sandbox(config: &BuildConfig) -> Sandbox {
  Sandbox::new(config.sandbox_root_path().join(DYNAMIC_SANDBOX_DIR))
}

/// Removes the sandbox root and the installer lock file when dropped.
pub struct SandboxGuard {
  sandbox_root: PathBuf,
  lockfile: PathBuf,
}

impl SandboxGuard {
  pub fn new(config: &BuildConfig) -> Self {
    Self {
      sandbox_root: config.sandbox_root_path(),
      lockfile: config.lockfile_path(),
    }
  }
}

impl Drop for SandboxGuard {
  fn drop(&mut self) {
    debug!(path = %self.sandbox_root.display(), "cleaning up sandbox");
    for path in [&self.sandbox_root, &self.lockfile] {
      if let Err(e) = remove_path(path) {
        warn!(path = %path.display(), error = %e, "failed to clean up sandbox");
      }
    }
  }
}
