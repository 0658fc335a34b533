//! Build manifest synthesis.
//!
//! The manifest tells the dependency installer what to resolve: the spec
//! sources, one platform, the packaged pod and an aggregate target that pulls
//! in every transitive dependency. It is handed to the installer as Podfile
//! text.

use std::path::PathBuf;

use crate::request::PackageRequest;
use crate::spec::{Platform, PlatformName, ResolvedSpec};
use crate::util::ruby::quote;

/// Name of the aggregate target that depends on everything.
pub const AGGREGATE_TARGET: &str = "packager";

/// How the installer should locate the packaged pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodSource {
  /// Use the sources in this directory as-is.
  Path(PathBuf),
  /// Read the spec from this file and fetch its sources.
  Podspec(PathBuf),
  /// Look the pod up in the spec sources at exactly this version.
  Version(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodDeclaration {
  pub name: String,
  pub source: PodSource,
  pub subspecs: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildManifest {
  pub sources: Vec<String>,
  pub platform: PlatformName,
  pub deployment_target: String,
  pub pod: PodDeclaration,
  pub aggregate_target: String,
  /// Every transitive dependency is materialized even if no header references it.
  pub inherit_complete: bool,
  pub integrate_targets: bool,
  pub deterministic_uuids: bool,
}

impl BuildManifest {
  pub fn for_spec(resolved: &ResolvedSpec, platform: &Platform, request: &PackageRequest) -> Self {
    let spec = &resolved.spec;
    let source = match resolved.path() {
      Some(path) if request.local => PodSource::Path(path.parent().map(PathBuf::from).unwrap_or_default()),
      Some(path) => PodSource::Podspec(path.to_path_buf()),
      None => PodSource::Version(spec.version.clone()),
    };

    Self {
      sources: request.spec_sources.clone(),
      platform: platform.name,
      deployment_target: platform.deployment_target().to_string(),
      pod: PodDeclaration {
        name: spec.name.clone(),
        source,
        subspecs: request.subspecs.clone(),
      },
      aggregate_target: AGGREGATE_TARGET.to_string(),
      inherit_complete: true,
      integrate_targets: false,
      deterministic_uuids: false,
    }
  }

  /// Render the manifest as Podfile text.
  pub fn render(&self) -> String {
    let mut out = String::new();

    for source in &self.sources {
      out.push_str(&format!("source {}\n", quote(source)));
    }
    out.push('\n');
    out.push_str(&format!(
      "platform :{}, {}\n\n",
      self.platform,
      quote(&self.deployment_target)
    ));
    out.push_str(&format!(
      "install! 'cocoapods', :integrate_targets => {}, :deterministic_uuids => {}\n\n",
      self.integrate_targets, self.deterministic_uuids
    ));

    let mut pod = format!("pod {}", quote(&self.pod.name));
    match &self.pod.source {
      PodSource::Path(path) => pod.push_str(&format!(", :path => {}", quote(&path.to_string_lossy()))),
      PodSource::Podspec(path) => pod.push_str(&format!(", :podspec => {}", quote(&path.to_string_lossy()))),
      PodSource::Version(version) => pod.push_str(&format!(", {}", quote(version))),
    }
    if let Some(subspecs) = &self.pod.subspecs {
      let list: Vec<String> = subspecs.iter().map(|s| quote(s)).collect();
      pod.push_str(&format!(", :subspecs => [{}]", list.join(", ")));
    }
    out.push_str(&pod);
    out.push_str("\n\n");

    out.push_str(&format!("target {} do\n", quote(&self.aggregate_target)));
    if self.inherit_complete {
      out.push_str("  inherit! :complete\n");
    }
    out.push_str("end\n");
    out
  }
}
