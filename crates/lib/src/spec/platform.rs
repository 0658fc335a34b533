use std::fmt;

use serde::{Deserialize, Serialize};

/// Apple platforms a spec can declare support for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformName {
  Ios,
  Osx,
  Tvos,
  Watchos,
}

impl PlatformName {
  /// Every known platform, in the order used when a spec declares none.
  pub const ALL: [PlatformName; 4] = [Self::Ios, Self::Osx, Self::Tvos, Self::Watchos];

  /// Parse a platform identifier as written in a spec (`macos` is accepted for `osx`)
  pub fn parse(name: &str) -> Option<Self> {
    match name {
      "ios" => Some(Self::Ios),
      "osx" | "macos" => Some(Self::Osx),
      "tvos" => Some(Self::Tvos),
      "watchos" => Some(Self::Watchos),
      _ => None,
    }
  }

  /// Returns the lowercase identifier used in specs and output paths
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Ios => "ios",
      Self::Osx => "osx",
      Self::Tvos => "tvos",
      Self::Watchos => "watchos",
    }
  }

  /// Deployment target assumed when the spec does not name one
  pub fn default_deployment_target(&self) -> &'static str {
    match self {
      Self::Ios => "4.3",
      Self::Osx => "10.6",
      Self::Tvos => "9.0",
      Self::Watchos => "2.0",
    }
  }
}

impl fmt::Display for PlatformName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// A platform a spec supports, with its optional deployment target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
  pub name: PlatformName,
  pub deployment_target: Option<String>,
}

impl Platform {
  pub fn new(name: PlatformName, deployment_target: Option<&str>) -> Self {
    Self {
      name,
      deployment_target: deployment_target.map(str::to_string),
    }
  }

  /// The declared deployment target, or the platform default
  pub fn deployment_target(&self) -> &str {
    self
      .deployment_target
      .as_deref()
      .unwrap_or_else(|| self.name.default_deployment_target())
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.name, self.deployment_target())
  }
}
