//! Implementation of the `podpack package` command.
//!
//! Wires the configured spec repository, installer and builder into the
//! packaging pipeline.

use anyhow::{Context, Result};
use clap::{ArgGroup, Args};
use tracing::debug;

use podpack_lib::build::CommandBuilder;
use podpack_lib::config::Settings;
use podpack_lib::consts::{DEFAULT_CONFIGURATION, DEFAULT_SPEC_SOURCE};
use podpack_lib::dynamic::StandardGenerator;
use podpack_lib::install::CommandInstaller;
use podpack_lib::package::{Collaborators, package};
use podpack_lib::request::{PackageKind, PackageRequest};
use podpack_lib::spec::SpecsDir;

use crate::output::{print_info, print_stat, print_success};

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("kind").args(["embedded", "library", "dynamic"])))]
pub struct PackageArgs {
  /// Spec name, or path to a `.podspec.json` file
  pub target: String,

  /// Literal for the `source` attribute of the generated podspec
  pub source: Option<String>,

  /// Generate an embedded static framework (default)
  #[arg(long)]
  pub embedded: bool,

  /// Generate a static library
  #[arg(long)]
  pub library: bool,

  /// Generate a dynamic framework
  #[arg(long)]
  pub dynamic: bool,

  /// Overwrite an existing output directory
  #[arg(long)]
  pub force: bool,

  /// Don't mangle dependency symbols
  #[arg(long)]
  pub no_mangle: bool,

  /// Bundle identifier for dynamic frameworks
  #[arg(long, value_name = "ID")]
  pub bundle_identifier: Option<String>,

  /// Leave dependency symbols out of the static library
  #[arg(long)]
  pub exclude_deps: bool,

  /// Build configuration to use
  #[arg(long, default_value = DEFAULT_CONFIGURATION)]
  pub configuration: String,

  /// Only include the given subspecs (comma-separated)
  #[arg(long, value_delimiter = ',')]
  pub subspecs: Option<Vec<String>>,

  /// Spec sources to resolve dependencies from (comma-separated)
  #[arg(long, value_delimiter = ',', default_value = DEFAULT_SPEC_SOURCE)]
  pub spec_sources: Vec<String>,

  /// Use the spec's directory as-is instead of fetching its sources
  #[arg(long)]
  pub local: bool,
}

impl PackageArgs {
  pub fn kind(&self) -> PackageKind {
    if self.library {
      PackageKind::StaticLibrary
    } else if self.dynamic {
      PackageKind::DynamicFramework
    } else {
      PackageKind::StaticFramework
    }
  }

  pub fn into_request(self) -> PackageRequest {
    PackageRequest {
      kind: self.kind(),
      force: self.force,
      mangle: !self.no_mangle,
      local: self.local,
      bundle_identifier: self.bundle_identifier,
      exclude_deps: self.exclude_deps,
      configuration: self.configuration,
      subspecs: self.subspecs,
      spec_sources: self.spec_sources,
      source: self.source,
    }
  }
}

pub fn cmd_package(args: PackageArgs) -> Result<()> {
  let settings = Settings::load().context("failed to load configuration")?;
  debug!(
    specs = %settings.specs_dir.display(),
    installer = %settings.installer,
    builder = %settings.builder,
    "loaded settings"
  );

  let repository = SpecsDir::new(&settings.specs_dir);
  let installer = CommandInstaller::new(&settings.installer);
  let builder = CommandBuilder::new(&settings.builder);
  let collab = Collaborators {
    repository: &repository,
    installer: &installer,
    generator: &StandardGenerator,
    builder: &builder,
  };

  let target = args.target.clone();
  let request = args.into_request();
  print_info(&format!("Packaging {} as {}", target, request.kind));

  let result = package(&target, &request, collab).with_context(|| format!("failed to package `{}`", target))?;

  print_success(&format!("Packaged {}", result.target_dir.display()));
  print_stat("Podspec", &result.descriptor.display().to_string());
  let platforms: Vec<String> = result.platforms.iter().map(|p| p.to_string()).collect();
  print_stat("Platforms", &platforms.join(", "));

  Ok(())
}
