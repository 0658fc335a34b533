//! Test utilities for podpack-lib.
//!
//! In-memory and filesystem fakes for the pipeline's collaborators, so the
//! packaging flow can be exercised without an installer or a compiler.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::build::{BuildError, BuildOutput, BuildRequest, NativeBuilder};
use crate::install::manifest::AGGREGATE_TARGET;
use crate::install::{
  BuildManifest, DependencyInstaller, FileAccessor, InstallError, Installation, PodTarget, TargetDefinition,
  UserBuildConfiguration,
};
use crate::project::{BuildConfiguration, ConfigurationKind, NativeProject, NativeTarget};
use crate::request::PackageKind;
use crate::sandbox::{BuildConfig, PROJECT_DIR, Sandbox};
use crate::spec::{PlatformName, Spec, SpecError, SpecRepository};

pub fn spec_from_json(json: &str) -> Spec {
  serde_json::from_str(json).unwrap()
}

/// A spec repository held in memory.
#[derive(Debug, Default)]
pub struct MemoryRepository {
  specs: BTreeMap<String, Spec>,
}

impl MemoryRepository {
  pub fn with_specs<'a>(specs: impl IntoIterator<Item = &'a str>) -> Self {
    Self {
      specs: specs
        .into_iter()
        .map(spec_from_json)
        .map(|spec| (spec.name.clone(), spec))
        .collect(),
    }
  }
}

impl SpecRepository for MemoryRepository {
  fn find(&self, name: &str) -> Result<Option<Spec>, SpecError> {
    Ok(self.specs.get(name).cloned())
  }
}

fn configurations() -> Vec<UserBuildConfiguration> {
  vec![
    UserBuildConfiguration {
      name: "Debug".into(),
      kind: ConfigurationKind::Debug,
    },
    UserBuildConfiguration {
      name: "Release".into(),
      kind: ConfigurationKind::Release,
    },
  ]
}

/// Installs a spec and its direct dependencies as placeholder sources.
pub struct FakeInstaller {
  spec: Option<Spec>,
  error: Option<String>,
  pub manifests: RefCell<Vec<BuildManifest>>,
}

impl FakeInstaller {
  pub fn for_spec(spec: &Spec) -> Self {
    Self {
      spec: Some(spec.clone()),
      error: None,
      manifests: RefCell::new(Vec::new()),
    }
  }

  /// Fails resolution with `message` after touching the sandbox.
  pub fn failing(message: &str) -> Self {
    Self {
      spec: None,
      error: Some(message.to_string()),
      manifests: RefCell::new(Vec::new()),
    }
  }
}

impl DependencyInstaller for FakeInstaller {
  fn install(
    &self,
    manifest: &BuildManifest,
    sandbox: &Sandbox,
    config: &BuildConfig,
  ) -> Result<Installation, InstallError> {
    self.manifests.borrow_mut().push(manifest.clone());
    fs::create_dir_all(sandbox.root()).unwrap();
    fs::write(config.lockfile_path(), "PODS:\n").unwrap();

    let spec = match (&self.spec, &self.error) {
      (Some(spec), None) => spec,
      (_, error) => return Err(InstallError::Resolution(error.clone().unwrap_or_default())),
    };

    let dependencies = spec.dependency_roots();
    let mut project = NativeProject::new(sandbox.project_path());
    for configuration in configurations() {
      project.add_build_configuration(&configuration.name, configuration.kind);
    }

    let mut pod_targets = Vec::new();
    for name in std::iter::once(&spec.name).chain(&dependencies) {
      let pod_dir = sandbox.pod_dir(name);
      if !sandbox.is_local(name) {
        fs::create_dir_all(pod_dir.join("Classes")).unwrap();
        fs::write(pod_dir.join(format!("Classes/{name}.m")), format!("@implementation {name} @end\n")).unwrap();
      }
      let headers = sandbox.public_headers_root().join(name);
      fs::create_dir_all(&headers).unwrap();
      fs::write(headers.join(format!("{name}.h")), format!("@interface {name} @end\n")).unwrap();

      let mut target = NativeTarget::new(name);
      target.build_configurations = configurations()
        .iter()
        .map(|c| BuildConfiguration::new(&c.name, c.kind))
        .collect();
      project.add_target(target);
      project.add_pod_group(
        name,
        &pod_dir,
        sandbox.is_local(name),
        sandbox.local_path_was_absolute(name),
      );

      let is_root = *name == spec.name;
      let specs = if is_root {
        vec![spec.consumer(manifest.platform)]
      } else {
        vec![]
      };
      pod_targets.push(PodTarget {
        name: name.clone(),
        platform: manifest.platform,
        file_accessors: specs.iter().map(|c| FileAccessor::new(&pod_dir, c.clone())).collect(),
        specs,
        target_definitions: vec![TargetDefinition {
          name: AGGREGATE_TARGET.to_string(),
          dependencies: if is_root { dependencies.clone() } else { vec![] },
        }],
      });
    }

    Ok(Installation {
      pod_targets,
      user_build_configurations: configurations(),
      project,
    })
  }
}

/// What [`FakeBuilder`] saw when it was invoked.
#[derive(Debug, Clone)]
pub struct BuildCall {
  pub platform: PlatformName,
  pub kind: PackageKind,
  pub mangle: bool,
  pub configuration: String,
  pub bundle_identifier: Option<String>,
  pub exclude_deps: bool,
  pub static_sandbox_root: PathBuf,
  pub dynamic_sandbox_root: Option<PathBuf>,
  pub public_headers_root: PathBuf,
  /// Whether the static sandbox was still on disk during the build.
  pub sandbox_existed: bool,
  /// The dynamic project as persisted, loaded during the build.
  pub dynamic_project: Option<NativeProject>,
  pub embedded: bool,
}

/// Writes placeholder artifacts, optionally failing on one platform.
#[derive(Default)]
pub struct FakeBuilder {
  pub fail_on: Option<PlatformName>,
  pub calls: RefCell<Vec<BuildCall>>,
}

impl FakeBuilder {
  pub fn failing_on(platform: PlatformName) -> Self {
    Self {
      fail_on: Some(platform),
      ..Default::default()
    }
  }
}

impl NativeBuilder for FakeBuilder {
  fn build(&self, request: &BuildRequest) -> Result<BuildOutput, BuildError> {
    let dynamic_project = request
      .dynamic_sandbox_root
      .as_ref()
      .map(|root| NativeProject::load(&request.work_dir.join(root).join(PROJECT_DIR)).unwrap());

    self.calls.borrow_mut().push(BuildCall {
      platform: request.platform.name,
      kind: request.kind,
      mangle: request.mangle,
      configuration: request.configuration.to_string(),
      bundle_identifier: request.bundle_identifier.map(str::to_string),
      exclude_deps: request.exclude_deps,
      static_sandbox_root: request.static_sandbox_root.clone(),
      dynamic_sandbox_root: request.dynamic_sandbox_root.clone(),
      public_headers_root: request.public_headers_root.clone(),
      sandbox_existed: request.work_dir.join(&request.static_sandbox_root).is_dir(),
      dynamic_project,
      embedded: false,
    });

    if self.fail_on == Some(request.platform.name) {
      return Err(BuildError::Failed(format!("cannot build for {}", request.platform.name)));
    }

    let artifact = request.artifact_path();
    match request.kind {
      PackageKind::StaticLibrary => {
        fs::create_dir_all(artifact.parent().unwrap()).unwrap();
        fs::write(&artifact, "!<arch>\n").unwrap();
      }
      PackageKind::StaticFramework | PackageKind::DynamicFramework => {
        fs::create_dir_all(&artifact).unwrap();
        fs::write(artifact.join(&request.spec.name), "binary").unwrap();
      }
    }
    Ok(BuildOutput { artifact })
  }

  fn link_embedded_resources(&self, _request: &BuildRequest, _output: &BuildOutput) -> Result<(), BuildError> {
    if let Some(call) = self.calls.borrow_mut().last_mut() {
      call.embedded = true;
    }
    Ok(())
  }
}

/// Write an executable `/bin/sh` script and return its path.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let path = dir.join(name);
  fs::write(&path, format!("#!/bin/sh\nset -e\n{body}")).unwrap();
  fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
  path
}
