//! Output and working directory lifecycle.
//!
//! Every build happens inside a fresh temporary working directory. The finished
//! tree is moved to `<caller-cwd>/<name>-<version>` as the last step, so the
//! output path never shows a partial build.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consts::WORK_DIR_PREFIX;
use crate::spec::Spec;
use crate::util::fs::{CopyError, copy_dir_recursive, remove_path};

#[derive(Debug, Error)]
pub enum WorkDirError {
  #[error("failed to remove existing target directory {}: {source}", path.display())]
  RemoveTarget { path: PathBuf, source: io::Error },

  #[error("failed to create working directory: {0}")]
  Create(#[source] io::Error),

  #[error("failed to read current directory: {0}")]
  CurrentDir(#[source] io::Error),

  #[error("failed to enter directory {}: {source}", path.display())]
  Enter { path: PathBuf, source: io::Error },

  #[error("failed to move {} to {}: {source}", from.display(), to.display())]
  Publish {
    from: PathBuf,
    to: PathBuf,
    source: io::Error,
  },

  #[error("failed to stage {} for publishing: {source}", to.display())]
  Stage {
    to: PathBuf,
    #[source]
    source: CopyError,
  },
}

/// Final output directory for a spec: `<source_dir>/<name>-<version>`.
pub fn target_dir_for(source_dir: &Path, spec: &Spec) -> PathBuf {
  source_dir.join(format!("{}-{}", spec.name, spec.version))
}

/// Compute the output directory and make sure it is free.
///
/// Returns `Ok(None)` when the directory exists and `force` is off; nothing is
/// touched in that case. With `force`, the existing directory is removed.
pub fn prepare_output_location(source_dir: &Path, spec: &Spec, force: bool) -> Result<Option<PathBuf>, WorkDirError> {
  let target_dir = target_dir_for(source_dir, spec);

  if target_dir.exists() {
    if !force {
      warn!(path = %target_dir.display(), "target directory already exists");
      return Ok(None);
    }
    info!(path = %target_dir.display(), "removing existing target directory");
    remove_path(&target_dir).map_err(|source| WorkDirError::RemoveTarget {
      path: target_dir.clone(),
      source,
    })?;
  }

  Ok(Some(target_dir))
}

/// Restores the process working directory when dropped.
pub struct CwdGuard {
  original: PathBuf,
}

impl CwdGuard {
  /// Record the current directory and change into `dir`.
  pub fn enter(dir: &Path) -> Result<Self, WorkDirError> {
    let original = std::env::current_dir().map_err(WorkDirError::CurrentDir)?;
    std::env::set_current_dir(dir).map_err(|source| WorkDirError::Enter {
      path: dir.to_path_buf(),
      source,
    })?;
    debug!(from = %original.display(), to = %dir.display(), "changed directory");
    Ok(Self { original })
  }

  /// The directory that will be restored.
  pub fn original(&self) -> &Path {
    &self.original
  }
}

impl Drop for CwdGuard {
  fn drop(&mut self) {
    if let Err(e) = std::env::set_current_dir(&self.original) {
      warn!(path = %self.original.display(), error = %e, "failed to restore working directory");
    }
  }
}

/// A uniquely named scratch directory under the system temp root.
///
/// Removed on drop unless it has been published.
#[derive(Debug)]
pub struct WorkDir {
  path: PathBuf,
}

impl WorkDir {
  /// Create a new working directory with a random name.
  pub fn allocate() -> Result<Self, WorkDirError> {
    let dir = tempfile::Builder::new()
      .prefix(WORK_DIR_PREFIX)
      .rand_bytes(8)
      .tempdir()
      .map_err(WorkDirError::Create)?;
    let path = dir.keep();
    let path = dunce::canonicalize(&path).unwrap_or(path);
    debug!(path = %path.display(), "allocated working directory");
    Ok(Self { path })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Make this directory the process working directory until the guard drops.
  pub fn enter(&self) -> Result<CwdGuard, WorkDirError> {
    CwdGuard::enter(&self.path)
  }
}

impl Drop for WorkDir {
  fn drop(&mut self) {
    if self.path.exists() {
      debug!(path = %self.path.display(), "removing working directory");
      if let Err(e) = fs::remove_dir_all(&self.path) {
        warn!(path = %self.path.display(), error = %e, "failed to remove working directory");
      }
    }
  }
}

/// Move the working directory to its final location.
///
/// A plain rename is used when possible. If the temp root lives on another
/// filesystem, the tree is copied to a hidden sibling of the target first and
/// renamed from there, so the target path still appears in one step.
pub fn publish(work_dir: WorkDir, target_dir: &Path) -> Result<(), WorkDirError> {
  let from = work_dir.path().to_path_buf();
  let publish_err = |source| WorkDirError::Publish {
    from: from.clone(),
    to: target_dir.to_path_buf(),
    source,
  };

  match fs::rename(&from, target_dir) {
    Ok(()) => {}
    Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
      debug!(from = %from.display(), "work directory is on another filesystem, staging copy");
      let staging = stage_copy(&from, target_dir)?;
      fs::rename(&staging, target_dir).map_err(|e| {
        let _ = fs::remove_dir_all(&staging);
        publish_err(e)
      })?;
    }
    Err(e) => return Err(publish_err(e)),
  }

  info!(path = %target_dir.display(), "published package");
  // Drop removes whatever is left of the work directory after a staged copy
  drop(work_dir);
  Ok(())
}

fn stage_copy(from: &Path, target_dir: &Path) -> Result<PathBuf, WorkDirError> {
  let parent = target_dir.parent().unwrap_or(Path::new("."));
  let name = target_dir
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_default();

  let staging = tempfile::Builder::new()
    .prefix(&format!(".{}.partial-", name))
    .rand_bytes(8)
    .tempdir_in(parent)
    .map_err(WorkDirError::Create)?
    .keep();

  copy_dir_recursive(from, &staging).map_err(|source| {
    let _ = fs::remove_dir_all(&staging);
    WorkDirError::Stage {
      to: target_dir.to_path_buf(),
      source,
    }
  })?;
  Ok(staging)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::spec_from_json;
  use serial_test::serial;
  use tempfile::TempDir;

  fn bar_spec() -> Spec {
    spec_from_json(r#"{ "name": "Bar", "version": "2.0.0" }"#)
  }

  #[test]
  fn existing_target_without_force_is_untouched() {
    let temp = TempDir::new().unwrap();
    let existing = temp.path().join("Bar-2.0.0");
    fs::create_dir_all(&existing).unwrap();
    fs::write(existing.join("keep.txt"), "old").unwrap();

    let result = prepare_output_location(temp.path(), &bar_spec(), false).unwrap();

    assert!(result.is_none());
    assert_eq!(fs::read_to_string(existing.join("keep.txt")).unwrap(), "old");
  }

  #[test]
  fn existing_target_with_force_is_removed() {
    let temp = TempDir::new().unwrap();
    let existing = temp.path().join("Bar-2.0.0");
    fs::create_dir_all(&existing).unwrap();

    let result = prepare_output_location(temp.path(), &bar_spec(), true).unwrap();

    assert_eq!(result, Some(existing.clone()));
    assert!(!existing.exists());
  }

  #[test]
  #[serial]
  fn cwd_guard_restores_directory() {
    let temp = TempDir::new().unwrap();
    let before = std::env::current_dir().unwrap();
    {
      let guard = CwdGuard::enter(temp.path()).unwrap();
      assert_eq!(guard.original(), before);
      assert_eq!(
        dunce::canonicalize(std::env::current_dir().unwrap()).unwrap(),
        dunce::canonicalize(temp.path()).unwrap()
      );
    }
    assert_eq!(std::env::current_dir().unwrap(), before);
  }

  #[test]
  #[serial]
  fn work_dirs_are_unique_and_removed_on_drop() {
    let temp = TempDir::new().unwrap();
    temp_env::with_var("TMPDIR", Some(temp.path()), || {
      let first = WorkDir::allocate().unwrap();
      let second = WorkDir::allocate().unwrap();
      assert_ne!(first.path(), second.path());
      assert!(
        first
          .path()
          .file_name()
          .unwrap()
          .to_string_lossy()
          .starts_with(WORK_DIR_PREFIX)
      );

      let path = first.path().to_path_buf();
      drop(first);
      assert!(!path.exists());
    });
  }

  #[test]
  #[serial]
  fn publish_moves_tree() {
    let temp = TempDir::new().unwrap();
    temp_env::with_var("TMPDIR", Some(temp.path()), || {
      let work_dir = WorkDir::allocate().unwrap();
      fs::create_dir_all(work_dir.path().join("ios")).unwrap();
      fs::write(work_dir.path().join("Bar.podspec"), "spec").unwrap();
      let work_path = work_dir.path().to_path_buf();

      let target = temp.path().join("out").join("Bar-2.0.0");
      fs::create_dir_all(target.parent().unwrap()).unwrap();
      publish(work_dir, &target).unwrap();

      assert!(!work_path.exists());
      assert!(target.join("ios").is_dir());
      assert_eq!(fs::read_to_string(target.join("Bar.podspec")).unwrap(), "spec");
    });
  }
}
