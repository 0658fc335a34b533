//! Implementation of the `podpack info` command.

use anyhow::{Context, Result};
use serde::Serialize;

use podpack_lib::config::{Settings, config_path};

use crate::output::{OutputFormat, print_info, print_json, print_stat};

#[derive(Serialize)]
struct InfoOutput<'a> {
  version: &'a str,
  config_path: String,
  #[serde(flatten)]
  settings: &'a Settings,
}

pub fn cmd_info(output: OutputFormat) -> Result<()> {
  let settings = Settings::load().context("failed to load configuration")?;
  let path = config_path();

  if output.is_json() {
    return print_json(&InfoOutput {
      version: env!("CARGO_PKG_VERSION"),
      config_path: path.display().to_string(),
      settings: &settings,
    });
  }

  print_info(&format!("podpack v{}", env!("CARGO_PKG_VERSION")));
  let loaded = if settings.config_file.is_some() { "" } else { " (not found)" };
  print_stat("Config file", &format!("{}{}", path.display(), loaded));
  print_stat("Specs", &settings.specs_dir.display().to_string());
  print_stat("Installer", &settings.installer);
  print_stat("Builder", &settings.builder);

  Ok(())
}
