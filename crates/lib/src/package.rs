//! The packaging pipeline.
//!
//! [`package`] resolves and validates the target, then builds every platform
//! the spec supports inside a fresh working directory:
//!
//! ```text
//! validate -> allocate work dir -> for each platform:
//!   sandbox -> install -> [dynamic pipeline] -> native build -> cleanup
//! -> descriptor -> publish
//! ```
//!
//! Platforms build one after another and the first failure aborts the rest.
//! Each platform's sandbox is removed when its build ends, and the caller's
//! working directory is restored on every path out of [`package`].

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info};

use crate::build::{BuildError, BuildRequest, NativeBuilder};
use crate::descriptor::{DescriptorBuilder, DescriptorError};
use crate::dynamic::{DynamicError, ProjectGenerator, install_dynamic_pod};
use crate::install::{DependencyInstaller, InstallError, install_pod};
use crate::request::{PackageRequest, ValidationError, validate};
use crate::sandbox::{BuildConfig, SandboxGuard, build_dynamic_sandbox, build_static_sandbox};
use crate::spec::{Platform, PlatformName, ResolvedSpec, SpecError, SpecRepository, resolve_target};
use crate::workdir::{WorkDir, WorkDirError, prepare_output_location, publish, target_dir_for};

#[derive(Debug, Error)]
pub enum PackageError {
  #[error("failed to read current directory: {0}")]
  CurrentDir(#[source] std::io::Error),

  #[error(transparent)]
  Spec(#[from] SpecError),

  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("target directory {} already exists (use --force to replace it)", .0.display())]
  TargetExists(PathBuf),

  #[error(transparent)]
  WorkDir(#[from] WorkDirError),

  #[error(transparent)]
  Install(#[from] InstallError),

  #[error(transparent)]
  Dynamic(#[from] DynamicError),

  #[error(transparent)]
  Build(#[from] BuildError),

  #[error(transparent)]
  Descriptor(#[from] DescriptorError),
}

/// The external systems the pipeline drives.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
  pub repository: &'a dyn SpecRepository,
  pub installer: &'a dyn DependencyInstaller,
  pub generator: &'a dyn ProjectGenerator,
  pub builder: &'a dyn NativeBuilder,
}

/// A published package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageResult {
  pub target_dir: PathBuf,
  pub descriptor: PathBuf,
  pub platforms: Vec<PlatformName>,
}

/// Package `target` (a spec path relative to the current directory, or a spec
/// name) into `<cwd>/<name>-<version>`.
pub fn package(
  target: &str,
  request: &PackageRequest,
  collab: Collaborators<'_>,
) -> Result<PackageResult, PackageError> {
  let source_dir = std::env::current_dir().map_err(PackageError::CurrentDir)?;

  let resolved = resolve_target(target, &source_dir, collab.repository)?;
  let resolved = validate(target, resolved.as_ref(), request, collab.repository)?;
  let spec = &resolved.spec;

  let Some(target_dir) = prepare_output_location(&source_dir, spec, request.force)? else {
    return Err(PackageError::TargetExists(target_dir_for(&source_dir, spec)));
  };

  info!(
    name = %spec.name,
    version = %spec.version,
    kind = %request.kind,
    "packaging"
  );

  let work_dir = WorkDir::allocate()?;
  let cwd = work_dir.enter()?;

  let mut descriptor = DescriptorBuilder::new(spec, request.kind, request.source.as_deref());
  let mut platforms = Vec::new();
  for platform in spec.available_platforms() {
    build_platform(&platform, resolved, request, collab, &source_dir, work_dir.path()).inspect_err(|e| {
      error!(platform = %platform.name, error = %e, "platform build failed");
    })?;
    descriptor.add_platform(&platform);
    platforms.push(platform.name);
  }

  let descriptor_path = descriptor.write(work_dir.path())?;
  let descriptor_name = descriptor_path.file_name().map(PathBuf::from).unwrap_or_default();

  drop(cwd);
  publish(work_dir, &target_dir)?;

  Ok(PackageResult {
    descriptor: target_dir.join(descriptor_name),
    target_dir,
    platforms,
  })
}

/// Build one platform inside its own sandbox, removed before returning.
fn build_platform(
  platform: &Platform,
  resolved: &ResolvedSpec,
  request: &PackageRequest,
  collab: Collaborators<'_>,
  source_dir: &Path,
  work_dir: &Path,
) -> Result<(), PackageError> {
  let spec = &resolved.spec;
  let config = BuildConfig::new(work_dir);
  let _guard = SandboxGuard::new(&config);

  info!(platform = %platform, "building platform");

  let mut static_sandbox = build_static_sandbox(&config, request.kind.is_dynamic());
  let installation = install_pod(
    collab.installer,
    &config,
    platform,
    &mut static_sandbox,
    resolved,
    request,
  )?;

  let dynamic_sandbox = if request.kind.is_dynamic() {
    let sandbox = build_dynamic_sandbox(&config);
    install_dynamic_pod(&spec.name, &installation, &static_sandbox, &sandbox, collab.generator)?;
    Some(sandbox)
  } else {
    None
  };

  let build_request = BuildRequest {
    platform,
    installation: &installation,
    source_dir,
    static_sandbox_root: config.relative(static_sandbox.root()),
    dynamic_sandbox_root: dynamic_sandbox.as_ref().map(|s| config.relative(s.root())),
    public_headers_root: static_sandbox.public_headers_root(),
    spec,
    kind: request.kind,
    mangle: request.mangle,
    configuration: &request.configuration,
    bundle_identifier: request.bundle_identifier.as_deref(),
    exclude_deps: request.exclude_deps,
    work_dir,
  };

  let output = collab.builder.build(&build_request)?;
  if request.kind.is_embedded() {
    collab.builder.link_embedded_resources(&build_request, &output)?;
  }

  info!(platform = %platform.name, artifact = %output.artifact.display(), "built");
  Ok(())
}
