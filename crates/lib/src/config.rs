//! Tool configuration.
//!
//! Settings come from, in order of precedence: `PODPACK_*` environment
//! variables, the JSON config file, and built-in defaults. The config file is
//! `<config_dir>/config.json` unless `PODPACK_CONFIG` points elsewhere; a
//! missing file is not an error.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::platform::paths::{cache_dir, config_dir};

pub const CONFIG_ENV: &str = "PODPACK_CONFIG";
pub const SPECS_DIR_ENV: &str = "PODPACK_SPECS_DIR";
pub const INSTALLER_ENV: &str = "PODPACK_INSTALLER";
pub const BUILDER_ENV: &str = "PODPACK_BUILDER";

pub const DEFAULT_INSTALLER: &str = "pod";
pub const DEFAULT_BUILDER: &str = "podpack-build";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },

  #[error("failed to parse config file {}: {source}", path.display())]
  Parse { path: PathBuf, source: serde_json::Error },
}

/// Contents of the config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
  pub specs_dir: Option<PathBuf>,
  pub installer: Option<String>,
  pub builder: Option<String>,
}

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
  /// Local spec repository searched when packaging by name.
  pub specs_dir: PathBuf,
  /// Dependency installer command.
  pub installer: String,
  /// Native builder command.
  pub builder: String,
  /// Config file that was read, if any.
  pub config_file: Option<PathBuf>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      specs_dir: cache_dir().join("specs"),
      installer: DEFAULT_INSTALLER.to_string(),
      builder: DEFAULT_BUILDER.to_string(),
      config_file: None,
    }
  }
}

/// Path of the config file, honoring `PODPACK_CONFIG`.
pub fn config_path() -> PathBuf {
  std::env::var_os(CONFIG_ENV)
    .map(PathBuf::from)
    .unwrap_or_else(|| config_dir().join("config.json"))
}

impl ConfigFile {
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }
}

impl Settings {
  /// Resolve settings from the environment, the config file and defaults.
  pub fn load() -> Result<Self, ConfigError> {
    let mut settings = Self::default();

    let path = config_path();
    if path.is_file() {
      debug!(path = %path.display(), "reading config file");
      settings.apply_file(ConfigFile::from_file(&path)?);
      settings.config_file = Some(path);
    }

    settings.apply_env();
    Ok(settings)
  }

  pub fn apply_file(&mut self, file: ConfigFile) {
    if let Some(dir) = file.specs_dir {
      self.specs_dir = dir;
    }
    if let Some(installer) = file.installer {
      self.installer = installer;
    }
    if let Some(builder) = file.builder {
      self.builder = builder;
    }
  }

  /// Override settings from `PODPACK_*` variables. Empty values are ignored.
  pub fn apply_env(&mut self) {
    let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

    if let Some(dir) = var(SPECS_DIR_ENV) {
      self.specs_dir = PathBuf::from(dir);
    }
    if let Some(installer) = var(INSTALLER_ENV) {
      self.installer = installer;
    }
    if let Some(builder) = var(BUILDER_ENV) {
      self.builder = builder;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use tempfile::TempDir;

  const VARS: [&str; 4] = [CONFIG_ENV, SPECS_DIR_ENV, INSTALLER_ENV, BUILDER_ENV];

  fn cleared<'a>(extra: Vec<(&'a str, Option<&'a str>)>) -> Vec<(&'a str, Option<&'a str>)> {
    let mut vars: Vec<_> = VARS
      .into_iter()
      .filter(|key| !extra.iter().any(|(k, _)| k == key))
      .map(|key| (key, None))
      .collect();
    vars.extend(extra);
    vars
  }

  #[test]
  #[serial]
  fn defaults_without_file_or_env() {
    let temp = TempDir::new().unwrap();
    let home = temp.path().to_str().unwrap();
    temp_env::with_vars(
      cleared(vec![
        ("HOME", Some(home)),
        ("XDG_CONFIG_HOME", None),
        ("XDG_CACHE_HOME", None),
      ]),
      || {
        let settings = Settings::load().unwrap();
        assert_eq!(settings.installer, DEFAULT_INSTALLER);
        assert_eq!(settings.builder, DEFAULT_BUILDER);
        assert_eq!(settings.specs_dir, temp.path().join(".cache/podpack/specs"));
        assert!(settings.config_file.is_none());
      },
    );
  }

  #[test]
  #[serial]
  fn env_overrides_file() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("config.json");
    fs::write(
      &file,
      r#"{ "specs_dir": "/from/file", "installer": "file-pod", "builder": "file-build" }"#,
    )
    .unwrap();

    temp_env::with_vars(
      cleared(vec![
        (CONFIG_ENV, Some(file.to_str().unwrap())),
        (INSTALLER_ENV, Some("env-pod")),
        (BUILDER_ENV, Some("")),
      ]),
      || {
        let settings = Settings::load().unwrap();
        assert_eq!(settings.installer, "env-pod");
        assert_eq!(settings.builder, "file-build");
        assert_eq!(settings.specs_dir, PathBuf::from("/from/file"));
        assert_eq!(settings.config_file.as_deref(), Some(file.as_path()));
      },
    );
  }

  #[test]
  #[serial]
  fn malformed_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("config.json");
    fs::write(&file, r#"{ "installer": 3 }"#).unwrap();

    temp_env::with_vars(cleared(vec![(CONFIG_ENV, Some(file.to_str().unwrap()))]), || {
      assert!(matches!(Settings::load(), Err(ConfigError::Parse { .. })));
    });
  }

  #[test]
  #[serial]
  fn unknown_keys_are_rejected() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("config.json");
    fs::write(&file, r#"{ "compiler": "cc" }"#).unwrap();

    assert!(matches!(ConfigFile::from_file(&file), Err(ConfigError::Parse { .. })));
  }
}
