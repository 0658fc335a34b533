//! Spec loading and resolution.
//!
//! A packaging target is given either as a path to a spec file or as a spec
//! name. Paths are tried first; names are looked up in a [`SpecRepository`].

pub mod platform;
pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

pub use platform::{Platform, PlatformName};
pub use types::{PlatformAttributes, Spec, SpecConsumer, StringList, Subspec, root_name};

/// File suffix of a spec inside a specs directory.
pub const SPEC_SUFFIX: &str = ".podspec.json";

#[derive(Debug, Error)]
pub enum SpecError {
  #[error("{}: is a directory", path.display())]
  IsDirectory { path: PathBuf },

  #[error("{}: is not a podspec", path.display())]
  NotASpec { path: PathBuf },

  #[error("{}: Ruby podspecs are not supported, convert it with `pod ipc spec` first", path.display())]
  RubySpec { path: PathBuf },

  #[error("failed to read spec {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },

  #[error("failed to parse spec {}: {source}", path.display())]
  Parse { path: PathBuf, source: serde_json::Error },

  #[error("failed to read specs directory {}: {source}", path.display())]
  ReadRepository { path: PathBuf, source: std::io::Error },

  #[error("spec {field} `{value}` cannot be used as a directory name")]
  UnsafeName { field: &'static str, value: String },
}

/// Where a resolved spec came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecOrigin {
  /// Loaded from a spec file on disk (absolute path).
  Path(PathBuf),
  /// Looked up by name in a spec repository.
  Name,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSpec {
  pub spec: Spec,
  pub origin: SpecOrigin,
}

impl ResolvedSpec {
  pub fn path(&self) -> Option<&Path> {
    match &self.origin {
      SpecOrigin::Path(path) => Some(path),
      SpecOrigin::Name => None,
    }
  }

  pub fn is_from_path(&self) -> bool {
    self.path().is_some()
  }
}

/// Looks up specs by name.
pub trait SpecRepository {
  /// Returns the newest spec with the given root name, if any.
  fn find(&self, name: &str) -> Result<Option<Spec>, SpecError>;
}

/// A spec repository laid out as `<root>/<Name>/<version>/<Name>.podspec.json`.
#[derive(Debug, Clone)]
pub struct SpecsDir {
  root: PathBuf,
}

impl SpecsDir {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  fn newest_version(&self, spec_dir: &Path) -> Result<Option<String>, SpecError> {
    let entries = fs::read_dir(spec_dir).map_err(|source| SpecError::ReadRepository {
      path: spec_dir.to_path_buf(),
      source,
    })?;

    let mut newest: Option<semver::Version> = None;
    for entry in entries.flatten() {
      let name = entry.file_name().to_string_lossy().to_string();
      // Non-semver directories are not versions
      if let Ok(version) = semver::Version::parse(&name)
        && newest.as_ref().is_none_or(|current| version > *current)
      {
        newest = Some(version);
      }
    }
    Ok(newest.map(|v| v.to_string()))
  }
}

impl SpecRepository for SpecsDir {
  fn find(&self, name: &str) -> Result<Option<Spec>, SpecError> {
    let spec_dir = self.root.join(name);
    if !spec_dir.is_dir() {
      debug!(name = %name, root = %self.root.display(), "spec not found in repository");
      return Ok(None);
    }

    let Some(version) = self.newest_version(&spec_dir)? else {
      return Ok(None);
    };

    let path = spec_dir.join(&version).join(format!("{}{}", name, SPEC_SUFFIX));
    if !path.is_file() {
      return Ok(None);
    }
    load_spec_file(&path).map(Some)
  }
}

/// Parse a JSON spec file.
pub fn load_spec_file(path: &Path) -> Result<Spec, SpecError> {
  let content = fs::read_to_string(path).map_err(|source| SpecError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  serde_json::from_str(&content).map_err(|source| SpecError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

/// Resolve a packaging target given as a path (relative to `cwd`) or a spec name.
///
/// Returns `Ok(None)` when neither a spec file nor a repository entry exists.
pub fn resolve_target(
  target: &str,
  cwd: &Path,
  repository: &dyn SpecRepository,
) -> Result<Option<ResolvedSpec>, SpecError> {
  let candidate = cwd.join(target);

  if candidate.exists() {
    let path = dunce::canonicalize(&candidate).unwrap_or(candidate);
    check_spec_path(&path)?;
    let spec = load_spec_file(&path)?;
    check_spec_identity(&spec)?;
    debug!(path = %path.display(), name = %spec.name, "resolved spec from path");
    return Ok(Some(ResolvedSpec {
      spec,
      origin: SpecOrigin::Path(path),
    }));
  }

  let Some(spec) = repository.find(target)? else {
    return Ok(None);
  };
  check_spec_identity(&spec)?;
  debug!(name = %spec.name, version = %spec.version, "resolved spec by name");
  Ok(Some(ResolvedSpec {
    spec,
    origin: SpecOrigin::Name,
  }))
}

/// The output directory is named after the spec, so name and version must be
/// plain path components.
fn check_spec_identity(spec: &Spec) -> Result<(), SpecError> {
  for (field, value) in [("name", &spec.name), ("version", &spec.version)] {
    if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\']) {
      return Err(SpecError::UnsafeName {
        field,
        value: value.clone(),
      });
    }
  }
  Ok(())
}

fn check_spec_path(path: &Path) -> Result<(), SpecError> {
  if path.is_dir() {
    return Err(SpecError::IsDirectory {
      path: path.to_path_buf(),
    });
  }
  match path.extension().and_then(|ext| ext.to_str()) {
    Some("json") => Ok(()),
    Some("podspec") => Err(SpecError::RubySpec {
      path: path.to_path_buf(),
    }),
    _ => Err(SpecError::NotASpec {
      path: path.to_path_buf(),
    }),
  }
}
