//! Output descriptor assembly.
//!
//! The packaged artifact ships with a podspec describing it. The text is built
//! in three phases: a header copied from the original spec, one fragment per
//! built platform, and the closing `end`.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::request::PackageKind;
use crate::spec::{Platform, Spec, StringList};
use crate::util::ruby::{dump, literal, quote};

/// Source used when none was given: the descriptor's own directory.
pub const LOCAL_SOURCE: &str = "{ :path => '.' }";

#[derive(Debug, Error)]
#[error("failed to write descriptor {}: {source}", path.display())]
pub struct DescriptorError {
  path: PathBuf,
  source: std::io::Error,
}

fn list_value(list: &StringList) -> Value {
  match list {
    StringList::One(value) => Value::String(value.clone()),
    StringList::Many(values) => Value::from(values.clone()),
  }
}

/// Header attributes as `(name, ruby literal)` in output order.
fn header_attributes(spec: &Spec) -> Vec<(&'static str, String)> {
  let string = |value: &Option<String>| value.as_deref().map(dump);
  let value = |value: &Option<Value>| value.as_ref().map(literal);
  let list = |value: &Option<StringList>| value.as_ref().map(|l| literal(&list_value(l)));
  let attrs = &spec.attributes;

  [
    ("name", Some(dump(&spec.name))),
    ("version", Some(dump(&spec.version))),
    ("summary", string(&spec.summary)),
    ("license", value(&spec.license)),
    ("authors", value(&spec.authors)),
    ("homepage", string(&spec.homepage)),
    ("description", string(&spec.description)),
    ("social_media_url", string(&spec.social_media_url)),
    ("docset_url", string(&spec.docset_url)),
    ("documentation_url", string(&spec.documentation_url)),
    ("screenshots", value(&spec.screenshots)),
    ("frameworks", list(&attrs.frameworks)),
    ("weak_frameworks", list(&attrs.weak_frameworks)),
    ("libraries", list(&attrs.libraries)),
    ("requires_arc", value(&attrs.requires_arc)),
    ("deployment_target", string(&spec.deployment_target)),
    ("xcconfig", value(&attrs.xcconfig)),
  ]
  .into_iter()
  .filter_map(|(name, value)| value.map(|v| (name, v)))
  .collect()
}

/// Per-platform values are single-quoted when scalar strings.
fn platform_literal(value: &Value) -> String {
  match value {
    Value::String(s) => quote(s),
    other => literal(other),
  }
}

/// Accumulates the output podspec.
#[derive(Debug, Clone)]
pub struct DescriptorBuilder<'a> {
  spec: &'a Spec,
  kind: PackageKind,
  text: String,
  platforms: usize,
}

impl<'a> DescriptorBuilder<'a> {
  /// Start a descriptor with the spec's header and the given `source` literal.
  pub fn new(spec: &'a Spec, kind: PackageKind, source: Option<&str>) -> Self {
    let mut text = String::from("Pod::Spec.new do |s|\n");
    for (name, value) in header_attributes(spec) {
      text.push_str(&format!("  s.{name} = {value}\n"));
    }
    text.push_str(&format!("  s.source = {}\n\n", source.unwrap_or(LOCAL_SOURCE)));

    Self {
      spec,
      kind,
      text,
      platforms: 0,
    }
  }

  /// Append the fragment for a successfully built platform.
  pub fn add_platform(&mut self, platform: &Platform) {
    let name = platform.name;
    let vendored = if self.kind == PackageKind::StaticLibrary {
      "vendored_library"
    } else {
      "vendored_framework"
    };

    self.text.push_str(&format!(
      "  s.{name}.{:<21}= {}\n",
      "deployment_target",
      quote(platform.deployment_target())
    ));
    self.text.push_str(&format!(
      "  s.{name}.{:<21}= {}\n",
      vendored,
      quote(&self.kind.vendored_path(name, &self.spec.name))
    ));

    if let Some(attrs) = self.spec.platform_attributes(name) {
      let lists = [
        ("frameworks", &attrs.frameworks),
        ("weak_frameworks", &attrs.weak_frameworks),
        ("libraries", &attrs.libraries),
      ];
      let mut values: Vec<(&str, Value)> = lists
        .into_iter()
        .filter_map(|(key, list)| list.as_ref().map(|l| (key, list_value(l))))
        .collect();
      values.extend(attrs.requires_arc.clone().map(|v| ("requires_arc", v)));
      values.extend(attrs.xcconfig.clone().map(|v| ("xcconfig", v)));

      for (key, value) in values {
        self
          .text
          .push_str(&format!("  s.{name}.{key} = {}\n", platform_literal(&value)));
      }
    }

    self.platforms += 1;
    debug!(platform = %name, "added descriptor fragment");
  }

  /// Number of platform fragments appended so far.
  pub fn platform_count(&self) -> usize {
    self.platforms
  }

  /// The complete descriptor text.
  pub fn finish(&self) -> String {
    format!("{}end\n", self.text)
  }

  /// Write `<dir>/<Name>.podspec`.
  pub fn write(&self, dir: &Path) -> Result<PathBuf, DescriptorError> {
    let path = dir.join(format!("{}.podspec", self.spec.name));
    fs::write(&path, self.finish()).map_err(|source| DescriptorError {
      path: path.clone(),
      source,
    })?;
    Ok(path)
  }
}
