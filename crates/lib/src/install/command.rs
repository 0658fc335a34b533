//! Dependency installer backed by an external command.
//!
//! The manifest is written as a `Podfile` into the sandbox root and the
//! installer is run as `<program> install` from the installation root, with:
//! - `PODPACK_MANIFEST`: path of the written manifest
//! - `PODPACK_SANDBOX_ROOT`: sandbox root to install into
//! - `PODPACK_PLATFORM`: platform being installed
//!
//! On success the installer must leave `installation.json` in the sandbox root
//! and the generated project in `<sandbox>/Pods.xcodeproj/project.json`.

use std::fs;
use std::process::Command;

use serde::Deserialize;
use tracing::{debug, info};

use super::{BuildManifest, DependencyInstaller, InstallError, Installation, PodTarget, UserBuildConfiguration};
use crate::project::NativeProject;
use crate::sandbox::{BuildConfig, Sandbox};

pub const MANIFEST_FILENAME: &str = "Podfile";
pub const INSTALLATION_FILENAME: &str = "installation.json";

/// What the installer reports in `installation.json`.
#[derive(Debug, Deserialize)]
struct InstallationRecord {
  pod_targets: Vec<PodTarget>,
  #[serde(default)]
  user_build_configurations: Vec<UserBuildConfiguration>,
}

#[derive(Debug, Clone)]
pub struct CommandInstaller {
  program: String,
}

impl CommandInstaller {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
    }
  }
}

impl DependencyInstaller for CommandInstaller {
  fn install(
    &self,
    manifest: &BuildManifest,
    sandbox: &Sandbox,
    config: &BuildConfig,
  ) -> Result<Installation, InstallError> {
    let sandbox_root = config.sandbox_root_path();
    let manifest_path = sandbox_root.join(MANIFEST_FILENAME);
    let write_err = |source| InstallError::WriteManifest {
      path: manifest_path.clone(),
      source,
    };
    fs::create_dir_all(&sandbox_root).map_err(write_err)?;
    fs::write(&manifest_path, manifest.render()).map_err(write_err)?;

    info!(command = %self.program, "running dependency installer");

    let output = Command::new(&self.program)
      .arg("install")
      .current_dir(&config.installation_root)
      .env("PODPACK_MANIFEST", &manifest_path)
      .env("PODPACK_SANDBOX_ROOT", sandbox.root())
      .env("PODPACK_PLATFORM", manifest.platform.as_str())
      .output()
      .map_err(|source| InstallError::Spawn {
        command: self.program.clone(),
        source,
      })?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "installer stderr");
      }
      return Err(InstallError::InstallerFailed {
        command: self.program.clone(),
        code: output.status.code(),
      });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
      debug!(stdout = %stdout.trim(), "installer output");
    }

    let record_path = sandbox.root().join(INSTALLATION_FILENAME);
    let content = fs::read_to_string(&record_path).map_err(|source| InstallError::ReadResult {
      path: record_path.clone(),
      source,
    })?;
    let record: InstallationRecord =
      serde_json::from_str(&content).map_err(|source| InstallError::ParseResult {
        path: record_path,
        source,
      })?;

    let project = NativeProject::load(&sandbox.project_path())?;

    Ok(Installation {
      pod_targets: record.pod_targets,
      user_build_configurations: record.user_build_configurations,
      project,
    })
  }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
  use super::*;
  use crate::request::PackageRequest;
  use crate::sandbox::build_static_sandbox;
  use crate::spec::{ResolvedSpec, SpecOrigin};
  use crate::util::testutil::{spec_from_json, write_script};
  use tempfile::TempDir;

  fn manifest() -> BuildManifest {
    let resolved = ResolvedSpec {
      spec: spec_from_json(r#"{ "name": "Foo", "version": "1.0.0", "platforms": { "ios": "9.0" } }"#),
      origin: SpecOrigin::Name,
    };
    BuildManifest::for_spec(&resolved, &resolved.spec.platforms[0], &PackageRequest::default())
  }

  #[test]
  fn reads_installation_written_by_command() {
    let temp = TempDir::new().unwrap();
    let config = BuildConfig::new(temp.path());
    let sandbox = build_static_sandbox(&config, false);
    let script = write_script(
      temp.path(),
      "installer",
      r#"
test "$1" = install || exit 2
grep -q "pod 'Foo', '1.0.0'" "$PODPACK_MANIFEST" || exit 3
mkdir -p "$PODPACK_SANDBOX_ROOT/Pods.xcodeproj"
echo '{"targets":[{"name":"Foo"}]}' > "$PODPACK_SANDBOX_ROOT/Pods.xcodeproj/project.json"
cat > "$PODPACK_SANDBOX_ROOT/installation.json" <<EOF
{"pod_targets":[{"name":"Foo","platform":"$PODPACK_PLATFORM","specs":[{"spec_name":"Foo"}]}],
 "user_build_configurations":[{"name":"Release","kind":"release"}]}
EOF
"#,
    );

    let installation = CommandInstaller::new(script.to_string_lossy())
      .install(&manifest(), &sandbox, &config)
      .unwrap();

    assert_eq!(installation.pod_targets.len(), 1);
    assert_eq!(installation.pod_targets[0].name, "Foo");
    assert_eq!(installation.user_build_configurations[0].name, "Release");
    assert_eq!(installation.project.targets[0].name, "Foo");
    assert!(config.sandbox_root_path().join(MANIFEST_FILENAME).exists());
  }

  #[test]
  fn non_zero_exit_is_an_error() {
    let temp = TempDir::new().unwrap();
    let config = BuildConfig::new(temp.path());
    let sandbox = build_static_sandbox(&config, false);
    let script = write_script(temp.path(), "installer", "echo 'conflict' >&2\nexit 4\n");

    let result = CommandInstaller::new(script.to_string_lossy()).install(&manifest(), &sandbox, &config);

    assert!(matches!(result, Err(InstallError::InstallerFailed { code: Some(4), .. })));
  }

  #[test]
  fn missing_program_is_a_spawn_error() {
    let temp = TempDir::new().unwrap();
    let config = BuildConfig::new(temp.path());
    let sandbox = build_static_sandbox(&config, false);

    let result = CommandInstaller::new("/nonexistent/podpack-installer").install(&manifest(), &sandbox, &config);

    assert!(matches!(result, Err(InstallError::Spawn { .. })));
  }
}
