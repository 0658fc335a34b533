//! Native builder backed by an external command.
//!
//! The builder is run from the work directory as `<program> build` and, for
//! embedded frameworks, `<program> embed`, with the [`BuildRequest`] exported
//! through [`BuildRequest::env`].

use std::process::Command;

use tracing::{debug, info};

use super::{BuildError, BuildOutput, BuildRequest, NativeBuilder};

#[derive(Debug, Clone)]
pub struct CommandBuilder {
  program: String,
}

impl CommandBuilder {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
    }
  }

  fn run(&self, step: &'static str, request: &BuildRequest) -> Result<(), BuildError> {
    debug!(command = %self.program, step, "spawning native builder");

    let output = Command::new(&self.program)
      .arg(step)
      .current_dir(request.work_dir)
      .envs(request.env())
      .output()
      .map_err(|source| BuildError::Spawn {
        command: self.program.clone(),
        source,
      })?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "builder stderr");
      }
      return Err(BuildError::BuilderFailed {
        command: self.program.clone(),
        step,
        code: output.status.code(),
      });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
      debug!(stdout = %stdout.trim(), "builder output");
    }
    Ok(())
  }
}

impl NativeBuilder for CommandBuilder {
  fn build(&self, request: &BuildRequest) -> Result<BuildOutput, BuildError> {
    info!(
      platform = %request.platform.name,
      kind = %request.kind,
      configuration = request.configuration,
      "building"
    );
    self.run("build", request)?;

    let artifact = request.artifact_path();
    if !artifact.exists() {
      return Err(BuildError::MissingArtifact { path: artifact });
    }
    Ok(BuildOutput { artifact })
  }

  fn link_embedded_resources(&self, request: &BuildRequest, output: &BuildOutput) -> Result<(), BuildError> {
    debug!(artifact = %output.artifact.display(), "linking embedded resources");
    self.run("embed", request)
  }
}
