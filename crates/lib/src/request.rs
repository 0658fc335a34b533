//! Package requests and the checks that gate them.
//!
//! A [`PackageRequest`] is built once from user input and validated against
//! the resolved spec before anything touches the filesystem.

use std::fmt;

use thiserror::Error;

use crate::consts::{DEFAULT_CONFIGURATION, DEFAULT_SPEC_SOURCE};
use crate::spec::{PlatformName, ResolvedSpec, SpecError, SpecRepository};

/// The kind of artifact to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PackageKind {
  /// A static `lib<Name>.a` archive.
  StaticLibrary,
  /// A static framework wrapped in an `.embeddedframework` bundle.
  #[default]
  StaticFramework,
  /// A dynamically linked framework.
  DynamicFramework,
}

impl PackageKind {
  pub fn is_dynamic(&self) -> bool {
    matches!(self, Self::DynamicFramework)
  }

  /// Whether resources are embedded next to the framework after building.
  pub fn is_embedded(&self) -> bool {
    matches!(self, Self::StaticFramework)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::StaticLibrary => "static-library",
      Self::StaticFramework => "static-framework",
      Self::DynamicFramework => "dynamic-framework",
    }
  }

  /// Path of the packaged artifact for one platform, relative to the output directory.
  pub fn vendored_path(&self, platform: PlatformName, name: &str) -> String {
    match self {
      Self::StaticLibrary => format!("{}/lib{}.a", platform, name),
      Self::StaticFramework => format!("{}/{}.embeddedframework/{}.framework", platform, name, name),
      Self::DynamicFramework => format!("{}/{}.framework", platform, name),
    }
  }
}

impl fmt::Display for PackageKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// What the user asked to package, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
  pub kind: PackageKind,
  /// Replace an existing output directory.
  pub force: bool,
  /// Rewrite dependency symbols to avoid collisions in the host app.
  pub mangle: bool,
  /// Reference the spec's directory directly instead of its spec file.
  pub local: bool,
  pub bundle_identifier: Option<String>,
  /// Leave dependency objects out of a static library.
  pub exclude_deps: bool,
  pub configuration: String,
  pub subspecs: Option<Vec<String>>,
  pub spec_sources: Vec<String>,
  /// Literal written as the `source` attribute of the output descriptor.
  pub source: Option<String>,
}

impl Default for PackageRequest {
  fn default() -> Self {
    Self {
      kind: PackageKind::default(),
      force: false,
      mangle: true,
      local: false,
      bundle_identifier: None,
      exclude_deps: false,
      configuration: DEFAULT_CONFIGURATION.to_string(),
      subspecs: None,
      spec_sources: vec![DEFAULT_SPEC_SOURCE.to_string()],
      source: None,
    }
  }
}

#[derive(Debug, Error)]
pub enum ValidationError {
  #[error("unable to find a podspec with path or name `{0}`")]
  Unresolved(String),

  #[error("`{spec}` has binary-only dependencies, mangling not possible (use --no-mangle)")]
  BinaryOnly { spec: String },

  #[error("--bundle-identifier option can only be used for dynamic frameworks")]
  BundleIdentifierRequiresDynamic,

  #[error("--exclude-deps option can only be used for static libraries")]
  ExcludeDepsRequiresStatic,

  #[error("--local option can only be used when a local podspec path is given")]
  LocalRequiresPath,

  #[error("failed to look up dependency: {0}")]
  Lookup(#[from] SpecError),
}

/// Reject requests that cannot be packaged, before any side effect.
///
/// Returns the resolved spec on success so callers don't have to unwrap it again.
pub fn validate<'a>(
  target: &str,
  resolved: Option<&'a ResolvedSpec>,
  request: &PackageRequest,
  repository: &dyn SpecRepository,
) -> Result<&'a ResolvedSpec, ValidationError> {
  let resolved = resolved.ok_or_else(|| ValidationError::Unresolved(target.to_string()))?;

  if request.mangle && is_binary_only(resolved, repository)? {
    return Err(ValidationError::BinaryOnly {
      spec: resolved.spec.name.clone(),
    });
  }
  if request.bundle_identifier.is_some() && !request.kind.is_dynamic() {
    return Err(ValidationError::BundleIdentifierRequiresDynamic);
  }
  if request.exclude_deps && request.kind.is_dynamic() {
    return Err(ValidationError::ExcludeDepsRequiresStatic);
  }
  if request.local && !resolved.is_from_path() {
    return Err(ValidationError::LocalRequiresPath);
  }

  Ok(resolved)
}

/// Whether the spec or any of its direct dependencies ships precompiled binaries.
fn is_binary_only(resolved: &ResolvedSpec, repository: &dyn SpecRepository) -> Result<bool, SpecError> {
  if resolved.spec.has_vendored_binaries() {
    return Ok(true);
  }
  for name in resolved.spec.dependency_roots() {
    if let Some(dependency) = repository.find(&name)?
      && dependency.has_vendored_binaries()
    {
      return Ok(true);
    }
  }
  Ok(false)
}
