//! Spec data model.
//!
//! Specs are read from the JSON form of a podspec (`Foo.podspec.json`). Only
//! the attributes the packager reads or copies into the output descriptor are
//! modelled; everything else in the file is ignored.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::platform::{Platform, PlatformName};

/// A string-or-list attribute, e.g. `"frameworks": "UIKit"` or `["UIKit", "CoreData"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringList {
  One(String),
  Many(Vec<String>),
}

impl StringList {
  pub fn to_vec(&self) -> Vec<String> {
    match self {
      StringList::One(value) => vec![value.clone()],
      StringList::Many(values) => values.clone(),
    }
  }
}

/// Attributes that may appear at the top level of a spec or inside a platform block.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlatformAttributes {
  #[serde(default)]
  pub frameworks: Option<StringList>,
  #[serde(default)]
  pub weak_frameworks: Option<StringList>,
  #[serde(default)]
  pub libraries: Option<StringList>,
  #[serde(default)]
  pub requires_arc: Option<Value>,
  #[serde(default)]
  pub xcconfig: Option<Value>,
  #[serde(default)]
  pub vendored_frameworks: Option<StringList>,
  #[serde(default)]
  pub vendored_libraries: Option<StringList>,
}

impl PlatformAttributes {
  /// Whether precompiled binaries are shipped, which rules out symbol mangling.
  pub fn has_vendored_binaries(&self) -> bool {
    self.vendored_frameworks.is_some() || self.vendored_libraries.is_some()
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Subspec {
  pub name: String,
  #[serde(default)]
  pub dependencies: BTreeMap<String, Vec<String>>,
  #[serde(flatten)]
  pub attributes: PlatformAttributes,
}

/// A library description to be packaged.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Spec {
  pub name: String,
  pub version: String,
  #[serde(default)]
  pub summary: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub homepage: Option<String>,
  #[serde(default)]
  pub license: Option<Value>,
  #[serde(default)]
  pub authors: Option<Value>,
  #[serde(default)]
  pub social_media_url: Option<String>,
  #[serde(default)]
  pub docset_url: Option<String>,
  #[serde(default)]
  pub documentation_url: Option<String>,
  #[serde(default)]
  pub screenshots: Option<Value>,
  #[serde(default)]
  pub deployment_target: Option<String>,
  /// Declared platforms, in declaration order.
  #[serde(default, deserialize_with = "deserialize_platforms")]
  pub platforms: Vec<Platform>,
  #[serde(default)]
  pub dependencies: BTreeMap<String, Vec<String>>,
  #[serde(default)]
  pub subspecs: Vec<Subspec>,
  #[serde(flatten)]
  pub attributes: PlatformAttributes,
  #[serde(default)]
  pub ios: Option<PlatformAttributes>,
  #[serde(default)]
  pub osx: Option<PlatformAttributes>,
  #[serde(default)]
  pub tvos: Option<PlatformAttributes>,
  #[serde(default)]
  pub watchos: Option<PlatformAttributes>,
}

impl Spec {
  /// Platforms to build for. A spec without a `platforms` entry supports all of them.
  pub fn available_platforms(&self) -> Vec<Platform> {
    if self.platforms.is_empty() {
      return PlatformName::ALL.iter().map(|name| Platform::new(*name, None)).collect();
    }
    self.platforms.clone()
  }

  pub fn platform_attributes(&self, platform: PlatformName) -> Option<&PlatformAttributes> {
    match platform {
      PlatformName::Ios => self.ios.as_ref(),
      PlatformName::Osx => self.osx.as_ref(),
      PlatformName::Tvos => self.tvos.as_ref(),
      PlatformName::Watchos => self.watchos.as_ref(),
    }
  }

  /// Whether this spec ships vendored frameworks or libraries on any platform.
  pub fn has_vendored_binaries(&self) -> bool {
    self.attributes.has_vendored_binaries()
      || PlatformName::ALL
        .iter()
        .filter_map(|p| self.platform_attributes(*p))
        .any(PlatformAttributes::has_vendored_binaries)
  }

  /// Names of direct dependencies, reduced to their root spec (`Foo/Core` -> `Foo`).
  pub fn dependency_roots(&self) -> Vec<String> {
    let mut roots: Vec<String> = self
      .dependencies
      .keys()
      .map(|name| root_name(name).to_string())
      .collect();
    roots.dedup();
    roots
  }

  /// Resolve the spec's attributes for one platform.
  pub fn consumer(&self, platform: PlatformName) -> SpecConsumer {
    let mut frameworks = list(&self.attributes.frameworks);
    let mut libraries = list(&self.attributes.libraries);
    if let Some(attrs) = self.platform_attributes(platform) {
      frameworks.extend(list(&attrs.frameworks));
      libraries.extend(list(&attrs.libraries));
    }
    SpecConsumer {
      spec_name: self.name.clone(),
      frameworks,
      libraries,
    }
  }
}

/// A spec's attributes as seen on a single platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecConsumer {
  pub spec_name: String,
  #[serde(default)]
  pub frameworks: Vec<String>,
  #[serde(default)]
  pub libraries: Vec<String>,
}

/// Root spec name of a possibly nested subspec name.
pub fn root_name(name: &str) -> &str {
  name.split('/').next().unwrap_or(name)
}

fn list(value: &Option<StringList>) -> Vec<String> {
  value.as_ref().map(StringList::to_vec).unwrap_or_default()
}

fn deserialize_platforms<'de, D>(deserializer: D) -> Result<Vec<Platform>, D::Error>
where
  D: Deserializer<'de>,
{
  struct PlatformsVisitor;

  impl<'de> Visitor<'de> for PlatformsVisitor {
    type Value = Vec<Platform>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str("a map of platform names to deployment targets")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
      A: MapAccess<'de>,
    {
      let mut platforms = Vec::new();
      while let Some((key, target)) = map.next_entry::<String, Option<String>>()? {
        let name = PlatformName::parse(&key)
          .ok_or_else(|| de::Error::custom(format!("unknown platform `{}`", key)))?;
        platforms.push(Platform {
          name,
          deployment_target: target,
        });
      }
      Ok(platforms)
    }
  }

  deserializer.deserialize_map(PlatformsVisitor)
}

#[cfg(test)]
mod tests {
  use super::*;

  const SPEC: &str = r#"{
    "name": "Foo",
    "version": "1.0.0",
    "platforms": { "osx": "10.12", "ios": "9.0" },
    "dependencies": { "Bar/Core": [], "Bar/Net": ["~> 2.0"], "Baz": [] },
    "frameworks": "Foundation",
    "ios": { "frameworks": ["UIKit"], "libraries": "z" }
  }"#;

  #[test]
  fn platforms_keep_declaration_order() {
    let spec: Spec = serde_json::from_str(SPEC).unwrap();
    let names: Vec<_> = spec.available_platforms().iter().map(|p| p.name).collect();
    assert_eq!(names, vec![PlatformName::Osx, PlatformName::Ios]);
    assert_eq!(spec.platforms[0].deployment_target(), "10.12");
  }

  #[test]
  fn no_platforms_means_all_platforms() {
    let spec: Spec = serde_json::from_str(r#"{ "name": "Foo", "version": "1.0" }"#).unwrap();
    assert_eq!(spec.available_platforms().len(), PlatformName::ALL.len());
  }

  #[test]
  fn unknown_platform_is_rejected() {
    let result: Result<Spec, _> =
      serde_json::from_str(r#"{ "name": "Foo", "version": "1.0", "platforms": { "beos": "5" } }"#);
    assert!(result.is_err());
  }

  #[test]
  fn consumer_merges_platform_attributes() {
    let spec: Spec = serde_json::from_str(SPEC).unwrap();

    let ios = spec.consumer(PlatformName::Ios);
    assert_eq!(ios.frameworks, vec!["Foundation", "UIKit"]);
    assert_eq!(ios.libraries, vec!["z"]);

    let osx = spec.consumer(PlatformName::Osx);
    assert_eq!(osx.frameworks, vec!["Foundation"]);
    assert!(osx.libraries.is_empty());
  }

  #[test]
  fn dependency_roots_collapse_subspecs() {
    let spec: Spec = serde_json::from_str(SPEC).unwrap();
    assert_eq!(spec.dependency_roots(), vec!["Bar", "Baz"]);
  }

  #[test]
  fn vendored_binaries_detected_in_platform_blocks() {
    let spec: Spec = serde_json::from_str(
      r#"{ "name": "Foo", "version": "1.0", "osx": { "vendored_libraries": "libfoo.a" } }"#,
    )
    .unwrap();
    assert!(spec.has_vendored_binaries());
    assert!(!serde_json::from_str::<Spec>(SPEC).unwrap().has_vendored_binaries());
  }
}
