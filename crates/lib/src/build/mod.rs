//! Native build invocation.
//!
//! Once a platform's sandboxes are installed, a [`NativeBuilder`] compiles the
//! packaged pod into the requested artifact. Everything the builder needs is
//! bundled in a [`BuildRequest`]; the artifact must end up at
//! [`BuildRequest::artifact_path`].

pub mod command;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::install::Installation;
use crate::request::PackageKind;
use crate::spec::{Platform, Spec};

pub use command::CommandBuilder;

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("failed to run native builder `{command}`: {source}")]
  Spawn { command: String, source: std::io::Error },

  #[error("native builder `{command} {step}` failed with exit code {code:?}")]
  BuilderFailed {
    command: String,
    step: &'static str,
    code: Option<i32>,
  },

  #[error("native builder did not produce {}", path.display())]
  MissingArtifact { path: PathBuf },

  /// The builder rejected the request outright.
  #[error("native build failed: {0}")]
  Failed(String),
}

/// Everything a native build of one platform needs.
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
  pub platform: &'a Platform,
  pub installation: &'a Installation,
  /// Directory the user invoked the packager from.
  pub source_dir: &'a Path,
  /// Static sandbox root, relative to `work_dir`.
  pub static_sandbox_root: PathBuf,
  /// Dynamic sandbox root, relative to `work_dir`. Only for dynamic frameworks.
  pub dynamic_sandbox_root: Option<PathBuf>,
  pub public_headers_root: PathBuf,
  pub spec: &'a Spec,
  pub kind: PackageKind,
  pub mangle: bool,
  pub configuration: &'a str,
  pub bundle_identifier: Option<&'a str>,
  pub exclude_deps: bool,
  pub work_dir: &'a Path,
}

impl BuildRequest<'_> {
  /// Where the finished artifact must be written.
  pub fn artifact_path(&self) -> PathBuf {
    self
      .work_dir
      .join(self.kind.vendored_path(self.platform.name, &self.spec.name))
  }

  /// Names of the pods the packaged spec pulled in, excluding itself.
  pub fn dependencies(&self) -> Vec<&str> {
    self
      .installation
      .pod_targets
      .iter()
      .map(|target| target.name.as_str())
      .filter(|name| *name != self.spec.name)
      .collect()
  }

  /// The request as `PODPACK_*` environment variables.
  pub fn env(&self) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    let mut set = |key: &str, value: String| {
      env.insert(format!("PODPACK_{key}"), value);
    };

    set("PLATFORM", self.platform.name.to_string());
    set("DEPLOYMENT_TARGET", self.platform.deployment_target().to_string());
    set("SPEC_NAME", self.spec.name.clone());
    set("SPEC_VERSION", self.spec.version.clone());
    set("KIND", self.kind.to_string());
    set("MANGLE", self.mangle.to_string());
    set("CONFIGURATION", self.configuration.to_string());
    set("SOURCE_DIR", self.source_dir.display().to_string());
    set("WORK_DIR", self.work_dir.display().to_string());
    set("STATIC_SANDBOX_ROOT", self.static_sandbox_root.display().to_string());
    set("PUBLIC_HEADERS_ROOT", self.public_headers_root.display().to_string());
    set("EXCLUDE_DEPS", self.exclude_deps.to_string());
    set("DEPENDENCIES", self.dependencies().join(","));
    set("ARTIFACT", self.artifact_path().display().to_string());
    if let Some(root) = &self.dynamic_sandbox_root {
      set("DYNAMIC_SANDBOX_ROOT", root.display().to_string());
    }
    if let Some(id) = self.bundle_identifier {
      set("BUNDLE_IDENTIFIER", id.to_string());
    }

    env
  }
}

/// What a successful native build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
  pub artifact: PathBuf,
}

/// Compiles a platform's installation into an artifact.
pub trait NativeBuilder {
  fn build(&self, request: &BuildRequest) -> Result<BuildOutput, BuildError>;

  /// Expose the framework's resources next to it in the embedded framework bundle.
  fn link_embedded_resources(&self, request: &BuildRequest, output: &BuildOutput) -> Result<(), BuildError>;
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::install::PodTarget;
  use crate::project::NativeProject;
  use crate::spec::PlatformName;
  use crate::util::testutil::spec_from_json;

  fn installation() -> Installation {
    let target = |name: &str| PodTarget {
      name: name.into(),
      platform: PlatformName::Ios,
      specs: vec![],
      target_definitions: vec![],
      file_accessors: vec![],
    };
    Installation {
      pod_targets: vec![target("Bar"), target("Foo"), target("Baz")],
      user_build_configurations: vec![],
      project: NativeProject::new("/work/Pods/Pods.xcodeproj"),
    }
  }

  #[test]
  fn request_exports_environment() {
    let spec = spec_from_json(r#"{ "name": "Foo", "version": "1.2.0", "platforms": { "ios": "9.0" } }"#);
    let installation = installation();
    let request = BuildRequest {
      platform: &spec.platforms[0],
      installation: &installation,
      source_dir: Path::new("/src"),
      static_sandbox_root: PathBuf::from("Pods/Static"),
      dynamic_sandbox_root: Some(PathBuf::from("Pods/Dynamic")),
      public_headers_root: PathBuf::from("/work/Pods/Static/Headers/Public"),
      spec: &spec,
      kind: PackageKind::DynamicFramework,
      mangle: false,
      configuration: "Debug",
      bundle_identifier: Some("com.example.foo"),
      exclude_deps: false,
      work_dir: Path::new("/work"),
    };

    assert_eq!(request.artifact_path(), PathBuf::from("/work/ios/Foo.framework"));
    assert_eq!(request.dependencies(), vec!["Bar", "Baz"]);

    let env = request.env();
    assert_eq!(env["PODPACK_PLATFORM"], "ios");
    assert_eq!(env["PODPACK_DEPLOYMENT_TARGET"], "9.0");
    assert_eq!(env["PODPACK_KIND"], PackageKind::DynamicFramework.as_str());
    assert_eq!(env["PODPACK_MANGLE"], "false");
    assert_eq!(env["PODPACK_CONFIGURATION"], "Debug");
    assert_eq!(env["PODPACK_DYNAMIC_SANDBOX_ROOT"], "Pods/Dynamic");
    assert_eq!(env["PODPACK_BUNDLE_IDENTIFIER"], "com.example.foo");
    assert_eq!(env["PODPACK_DEPENDENCIES"], "Bar,Baz");
    assert_eq!(env["PODPACK_ARTIFACT"], "/work/ios/Foo.framework");
  }

  #[test]
  fn optional_values_are_omitted() {
    let spec = spec_from_json(r#"{ "name": "Foo", "version": "1.2.0", "platforms": { "osx": "10.9" } }"#);
    let installation = installation();
    let request = BuildRequest {
      platform: &spec.platforms[0],
      installation: &installation,
      source_dir: Path::new("/src"),
      static_sandbox_root: PathBuf::from("Pods"),
      dynamic_sandbox_root: None,
      public_headers_root: PathBuf::from("/work/Pods/Headers/Public"),
      spec: &spec,
      kind: PackageKind::StaticLibrary,
      mangle: true,
      configuration: "Release",
      bundle_identifier: None,
      exclude_deps: true,
      work_dir: Path::new("/work"),
    };

    let env = request.env();
    assert_eq!(request.artifact_path(), PathBuf::from("/work/osx/libFoo.a"));
    assert!(!env.contains_key("PODPACK_DYNAMIC_SANDBOX_ROOT"));
    assert!(!env.contains_key("PODPACK_BUNDLE_IDENTIFIER"));
    assert_eq!(env["PODPACK_EXCLUDE_DEPS"], "true");
  }
}
