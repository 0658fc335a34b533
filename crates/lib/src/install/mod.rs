//! Dependency installation step.
//!
//! Synthesizes a [`BuildManifest`] for one platform, hands it to a
//! [`DependencyInstaller`] together with the sandbox, and normalizes the
//! generated project so packaged builds neither auto-link modules nor carry
//! debug symbols.

pub mod command;
pub mod manifest;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::project::{ConfigurationKind, NativeProject, ProjectError};
use crate::request::PackageRequest;
use crate::sandbox::{BuildConfig, Sandbox};
use crate::spec::{Platform, PlatformName, ResolvedSpec, SpecConsumer};

pub use command::CommandInstaller;
pub use manifest::{BuildManifest, PodDeclaration, PodSource};

#[derive(Debug, Error)]
pub enum InstallError {
  #[error("failed to write build manifest {}: {source}", path.display())]
  WriteManifest { path: PathBuf, source: std::io::Error },

  #[error("failed to run dependency installer `{command}`: {source}")]
  Spawn { command: String, source: std::io::Error },

  #[error("dependency installer `{command}` failed with exit code {code:?}")]
  InstallerFailed { command: String, code: Option<i32> },

  #[error("failed to read installation result {}: {source}", path.display())]
  ReadResult { path: PathBuf, source: std::io::Error },

  #[error("failed to parse installation result {}: {source}", path.display())]
  ParseResult { path: PathBuf, source: serde_json::Error },

  /// The installer could not resolve the dependency graph.
  #[error("dependency resolution failed: {0}")]
  Resolution(String),

  #[error(transparent)]
  Project(#[from] ProjectError),
}

/// A Podfile target and the pods it declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDefinition {
  pub name: String,
  #[serde(default)]
  pub dependencies: Vec<String>,
}

/// Gives access to one resolved spec's files, rooted at a pod directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAccessor {
  pub root: PathBuf,
  pub consumer: SpecConsumer,
}

impl FileAccessor {
  pub fn new(root: impl Into<PathBuf>, consumer: SpecConsumer) -> Self {
    Self {
      root: root.into(),
      consumer,
    }
  }

  pub fn frameworks(&self) -> &[String] {
    &self.consumer.frameworks
  }

  pub fn libraries(&self) -> &[String] {
    &self.consumer.libraries
  }
}

/// One pod's build target as produced by the installer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodTarget {
  pub name: String,
  pub platform: PlatformName,
  /// The root spec and any selected subspecs, resolved for `platform`.
  pub specs: Vec<SpecConsumer>,
  #[serde(default)]
  pub target_definitions: Vec<TargetDefinition>,
  #[serde(default)]
  pub file_accessors: Vec<FileAccessor>,
}

impl PodTarget {
  /// Number of dependencies declared across all target definitions.
  pub fn dependency_count(&self) -> usize {
    self.target_definitions.iter().map(|d| d.dependencies.len()).sum()
  }
}

/// A user-facing build configuration (`Debug`, `Release`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBuildConfiguration {
  pub name: String,
  pub kind: ConfigurationKind,
}

/// Everything a dependency installer run produced in one sandbox.
#[derive(Debug, Clone, PartialEq)]
pub struct Installation {
  pub pod_targets: Vec<PodTarget>,
  pub user_build_configurations: Vec<UserBuildConfiguration>,
  pub project: NativeProject,
}

impl Installation {
  pub fn pod_target(&self, name: &str) -> Option<&PodTarget> {
    self.pod_targets.iter().find(|t| t.name == name)
  }
}

/// Resolves, downloads and generates a project for a manifest inside a sandbox.
pub trait DependencyInstaller {
  fn install(
    &self,
    manifest: &BuildManifest,
    sandbox: &Sandbox,
    config: &BuildConfig,
  ) -> Result<Installation, InstallError>;
}

/// Build settings forced on every generated target.
pub const NORMALIZED_SETTINGS: [(&str, &str); 2] =
  [("CLANG_MODULES_AUTOLINK", "NO"), ("GCC_GENERATE_DEBUGGING_SYMBOLS", "NO")];

/// Install the packaged pod and its dependencies for one platform.
pub fn install_pod(
  installer: &dyn DependencyInstaller,
  config: &BuildConfig,
  platform: &Platform,
  sandbox: &mut Sandbox,
  resolved: &ResolvedSpec,
  request: &PackageRequest,
) -> Result<Installation, InstallError> {
  let manifest = BuildManifest::for_spec(resolved, platform, request);

  if let PodSource::Path(path) = &manifest.pod.source {
    sandbox.store_local_path(&resolved.spec.name, path, path.is_absolute());
  }

  info!(
    platform = %platform.name,
    sandbox = %sandbox.root().display(),
    "installing dependencies"
  );
  let mut installation = installer.install(&manifest, sandbox, config)?;

  normalize_project(&mut installation.project);
  installation.project.save()?;
  debug!(targets = installation.pod_targets.len(), "installation complete");

  Ok(installation)
}

/// Apply [`NORMALIZED_SETTINGS`] to every configuration of every target.
pub fn normalize_project(project: &mut NativeProject) {
  for target in &mut project.targets {
    for configuration in &mut target.build_configurations {
      for (key, value) in NORMALIZED_SETTINGS {
        configuration.set(key, value);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sandbox::build_static_sandbox;
  use crate::spec::SpecOrigin;
  use crate::util::testutil::{FakeInstaller, spec_from_json};
  use tempfile::TempDir;

  const FOO: &str = r#"{
    "name": "Foo", "version": "1.0.0",
    "platforms": { "ios": "9.0" },
    "dependencies": { "Bar": [] }
  }"#;

  #[test]
  fn generated_targets_are_normalized_and_saved() {
    let temp = TempDir::new().unwrap();
    let config = BuildConfig::new(temp.path());
    let resolved = ResolvedSpec {
      spec: spec_from_json(FOO),
      origin: SpecOrigin::Name,
    };
    let installer = FakeInstaller::for_spec(&resolved.spec);
    let mut sandbox = build_static_sandbox(&config, false);

    let installation = install_pod(
      &installer,
      &config,
      &resolved.spec.platforms[0],
      &mut sandbox,
      &resolved,
      &PackageRequest::default(),
    )
    .unwrap();

    assert!(!installation.project.targets.is_empty());
    for target in &installation.project.targets {
      for configuration in &target.build_configurations {
        assert_eq!(configuration.settings["CLANG_MODULES_AUTOLINK"], "NO");
        assert_eq!(configuration.settings["GCC_GENERATE_DEBUGGING_SYMBOLS"], "NO");
      }
    }

    let saved = NativeProject::load(&sandbox.project_path()).unwrap();
    assert_eq!(saved, installation.project);

    let manifests = installer.manifests.borrow();
    assert_eq!(manifests.len(), 1);
    assert_eq!(manifests[0].platform, PlatformName::Ios);
    assert_eq!(manifests[0].deployment_target, "9.0");
  }

  #[test]
  fn local_install_records_local_pod() {
    let temp = TempDir::new().unwrap();
    let config = BuildConfig::new(temp.path().join("work"));
    let resolved = ResolvedSpec {
      spec: spec_from_json(FOO),
      origin: SpecOrigin::Path(temp.path().join("src/Foo.podspec.json")),
    };
    let request = PackageRequest {
      local: true,
      ..Default::default()
    };
    let mut sandbox = build_static_sandbox(&config, false);

    install_pod(
      &FakeInstaller::for_spec(&resolved.spec),
      &config,
      &resolved.spec.platforms[0],
      &mut sandbox,
      &resolved,
      &request,
    )
    .unwrap();

    assert!(sandbox.is_local("Foo"));
    assert!(sandbox.local_path_was_absolute("Foo"));
    assert_eq!(sandbox.pod_dir("Foo"), temp.path().join("src"));
  }

  #[test]
  fn installer_errors_propagate_unchanged() {
    let temp = TempDir::new().unwrap();
    let config = BuildConfig::new(temp.path());
    let resolved = ResolvedSpec {
      spec: spec_from_json(FOO),
      origin: SpecOrigin::Name,
    };
    let installer = FakeInstaller::failing("Bar (= 9.9) not found");
    let mut sandbox = build_static_sandbox(&config, false);

    let result = install_pod(
      &installer,
      &config,
      &resolved.spec.platforms[0],
      &mut sandbox,
      &resolved,
      &PackageRequest::default(),
    );

    assert!(matches!(result, Err(InstallError::Resolution(msg)) if msg == "Bar (= 9.9) not found"));
  }
}
