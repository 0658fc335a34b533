//! Native project description.
//!
//! The installer and the native builder exchange projects in this form:
//! build configurations, a group tree of file references, native targets with
//! per-configuration build settings, and shared schemes. A project lives in a
//! `Pods.xcodeproj` directory and is persisted there as `project.json`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File the project description is persisted to inside the project directory.
pub const PROJECT_FILE: &str = "project.json";
pub const PODS_GROUP: &str = "Pods";
pub const DEVELOPMENT_PODS_GROUP: &str = "Development Pods";
pub const FRAMEWORKS_GROUP: &str = "Frameworks";
pub const PRODUCTS_GROUP: &str = "Products";

#[derive(Debug, Error)]
pub enum ProjectError {
  #[error("failed to write project {}: {source}", path.display())]
  Write { path: PathBuf, source: std::io::Error },

  #[error("failed to read project {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },

  #[error("failed to parse project {}: {source}", path.display())]
  Parse { path: PathBuf, source: serde_json::Error },

  #[error("failed to serialize project: {0}")]
  Serialize(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigurationKind {
  Debug,
  #[default]
  Release,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfiguration {
  pub name: String,
  pub kind: ConfigurationKind,
  #[serde(default)]
  pub settings: BTreeMap<String, String>,
}

impl BuildConfiguration {
  pub fn new(name: &str, kind: ConfigurationKind) -> Self {
    Self {
      name: name.to_string(),
      kind,
      settings: BTreeMap::new(),
    }
  }

  pub fn set(&mut self, key: &str, value: impl Into<String>) {
    self.settings.insert(key.to_string(), value.into());
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Group {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub path: Option<PathBuf>,
  /// Whether `path` was given as an absolute path.
  #[serde(default)]
  pub absolute: bool,
  #[serde(default)]
  pub files: Vec<PathBuf>,
  #[serde(default)]
  pub children: Vec<Group>,
}

impl Group {
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      ..Default::default()
    }
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty() && self.children.is_empty()
  }

  fn find_mut(&mut self, name: &str) -> Option<&mut Group> {
    if self.name == name {
      return Some(self);
    }
    self.children.iter_mut().find_map(|child| child.find_mut(name))
  }

  fn sort(&mut self) {
    self.files.sort();
    self.children.sort_by(|a, b| a.name.cmp(&b.name));
    self.children.iter_mut().for_each(Group::sort);
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NativeTarget {
  pub name: String,
  #[serde(default)]
  pub build_configurations: Vec<BuildConfiguration>,
  #[serde(default)]
  pub source_files: Vec<PathBuf>,
  #[serde(default)]
  pub system_frameworks: Vec<String>,
  #[serde(default)]
  pub system_libraries: Vec<String>,
}

impl NativeTarget {
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      ..Default::default()
    }
  }

  /// Link a system framework (e.g. `UIKit`).
  pub fn add_system_framework(&mut self, name: &str) {
    if !self.system_frameworks.iter().any(|f| f == name) {
      self.system_frameworks.push(name.to_string());
    }
  }

  /// Link a system library (e.g. `z` for `libz`).
  pub fn add_system_library(&mut self, name: &str) {
    if !self.system_libraries.iter().any(|l| l == name) {
      self.system_libraries.push(name.to_string());
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeProject {
  #[serde(skip)]
  path: PathBuf,
  #[serde(default)]
  pub build_configurations: Vec<BuildConfiguration>,
  #[serde(default)]
  pub groups: Vec<Group>,
  #[serde(default)]
  pub targets: Vec<NativeTarget>,
  #[serde(default)]
  pub schemes: Vec<String>,
}

impl NativeProject {
  /// A fresh project with the standard top-level groups.
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      build_configurations: Vec::new(),
      groups: [PODS_GROUP, DEVELOPMENT_PODS_GROUP, FRAMEWORKS_GROUP, PRODUCTS_GROUP]
        .into_iter()
        .map(Group::new)
        .collect(),
      targets: Vec::new(),
      schemes: Vec::new(),
    }
  }

  /// Load `<path>/project.json`.
  pub fn load(path: &Path) -> Result<Self, ProjectError> {
    let file = path.join(PROJECT_FILE);
    let content = fs::read_to_string(&file).map_err(|source| ProjectError::Read {
      path: file.clone(),
      source,
    })?;
    let mut project: NativeProject =
      serde_json::from_str(&content).map_err(|source| ProjectError::Parse { path: file, source })?;
    project.path = path.to_path_buf();
    Ok(project)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Write the project to `<path>/project.json`.
  pub fn save(&self) -> Result<(), ProjectError> {
    fs::create_dir_all(&self.path).map_err(|source| ProjectError::Write {
      path: self.path.clone(),
      source,
    })?;
    let file = self.path.join(PROJECT_FILE);
    let json = serde_json::to_string_pretty(self).map_err(ProjectError::Serialize)?;
    fs::write(&file, json).map_err(|source| ProjectError::Write { path: file, source })
  }

  pub fn add_build_configuration(&mut self, name: &str, kind: ConfigurationKind) {
    if !self.build_configurations.iter().any(|c| c.name == name) {
      self.build_configurations.push(BuildConfiguration::new(name, kind));
    }
  }

  /// Add a group for one pod, under `Development Pods` when local, `Pods` otherwise.
  pub fn add_pod_group(&mut self, name: &str, path: &Path, local: bool, was_absolute: bool) {
    let parent = if local { DEVELOPMENT_PODS_GROUP } else { PODS_GROUP };
    let group = Group {
      name: name.to_string(),
      path: Some(path.to_path_buf()),
      absolute: was_absolute,
      ..Default::default()
    };
    match self.group_mut(parent) {
      Some(parent) => parent.children.push(group),
      None => {
        let mut parent = Group::new(parent);
        parent.children.push(group);
        self.groups.push(parent);
      }
    }
  }

  /// Find a group anywhere in the tree.
  pub fn group_mut(&mut self, name: &str) -> Option<&mut Group> {
    self.groups.iter_mut().find_map(|group| group.find_mut(name))
  }

  pub fn group(&self, name: &str) -> Option<&Group> {
    fn find<'a>(group: &'a Group, name: &str) -> Option<&'a Group> {
      if group.name == name {
        return Some(group);
      }
      group.children.iter().find_map(|child| find(child, name))
    }
    self.groups.iter().find_map(|group| find(group, name))
  }

  /// Drop a top-level group if it has no content.
  pub fn remove_group_if_empty(&mut self, name: &str) {
    self.groups.retain(|group| group.name != name || !group.is_empty());
  }

  /// Sort group contents by name at every level.
  pub fn sort_groups(&mut self) {
    self.groups.iter_mut().for_each(Group::sort);
  }

  /// Regenerate one shared scheme per target.
  pub fn recreate_user_schemes(&mut self) {
    self.schemes = self.targets.iter().map(|t| t.name.clone()).collect();
  }

  pub fn target(&self, name: &str) -> Option<&NativeTarget> {
    self.targets.iter().find(|t| t.name == name)
  }

  /// Add a target, returning its index.
  pub fn add_target(&mut self, target: NativeTarget) -> usize {
    self.targets.push(target);
    self.targets.len() - 1
  }
}
