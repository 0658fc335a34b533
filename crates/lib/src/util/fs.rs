//! Filesystem helpers.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum CopyError {
  #[error("failed to walk {}: {source}", path.display())]
  Walk { path: PathBuf, source: walkdir::Error },

  #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
  Io {
    from: PathBuf,
    to: PathBuf,
    source: io::Error,
  },
}

/// Recursively copy `src` to `dst`, preserving permissions and symlinks.
///
/// `dst` is created if missing; existing files are overwritten.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<(), CopyError> {
  for entry in WalkDir::new(src).follow_links(false) {
    let entry = entry.map_err(|source| CopyError::Walk {
      path: src.to_path_buf(),
      source,
    })?;

    // WalkDir only yields paths below `src`
    let rel_path = entry.path().strip_prefix(src).unwrap_or(entry.path());
    let dst_path = dst.join(rel_path);
    let io_err = |source| CopyError::Io {
      from: entry.path().to_path_buf(),
      to: dst_path.clone(),
      source,
    };

    let file_type = entry.file_type();
    if file_type.is_dir() {
      fs::create_dir_all(&dst_path).map_err(io_err)?;
      let permissions = entry.metadata().map_err(|e| io_err(e.into()))?.permissions();
      fs::set_permissions(&dst_path, permissions).map_err(io_err)?;
    } else if file_type.is_symlink() {
      let target = fs::read_link(entry.path()).map_err(io_err)?;
      if dst_path.symlink_metadata().is_ok() {
        fs::remove_file(&dst_path).map_err(io_err)?;
      }
      symlink(&target, &dst_path).map_err(io_err)?;
    } else {
      // fs::copy carries the permission bits over
      fs::copy(entry.path(), &dst_path).map_err(io_err)?;
    }
  }

  Ok(())
}

/// Remove a file or directory tree, treating a missing path as success.
pub fn remove_path(path: &Path) -> io::Result<()> {
  match path.symlink_metadata() {
    Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
    Ok(_) => fs::remove_file(path),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(e),
  }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
  std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
  std::os::windows::fs::symlink_file(target, link)
}
