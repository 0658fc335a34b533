//! Dynamic framework target pipeline.
//!
//! The static sandbox holds the packaged pod plus every dependency. A dynamic
//! framework must link its dependencies instead of embedding them, so this
//! pipeline carves a project containing only the packaged pod out of the
//! static installation:
//!
//! 1. derive the pod's target, with file accessors rooted in the dynamic sandbox
//! 2. create a minimal project with the user's build configurations
//! 3. copy the pod's resolved sources from the static sandbox
//! 4. install file references
//! 5. install the native target and link system frameworks and libraries
//! 6. tidy and persist the project, pointing header search paths at the static sandbox
//!
//! [`DynamicPipeline`] only exposes the next legal stage, so stages cannot run
//! out of order.

use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::install::{FileAccessor, Installation, PodTarget};
use crate::project::{
  BuildConfiguration, DEVELOPMENT_PODS_GROUP, NativeProject, NativeTarget, PODS_GROUP, ProjectError,
};
use crate::sandbox::Sandbox;
use crate::util::fs::{CopyError, copy_dir_recursive};

/// Source file extensions compiled into a native target.
const SOURCE_EXTENSIONS: [&str; 6] = ["c", "cc", "cpp", "m", "mm", "swift"];

#[derive(Debug, Error)]
pub enum GenerateError {
  #[error("failed to list files under {}: {source}", path.display())]
  ListFiles { path: PathBuf, source: walkdir::Error },

  #[error("no group for pod `{0}` in project")]
  MissingGroup(String),

  #[error("generator returned target index {index} but the project has {count} targets")]
  UnknownTarget { index: usize, count: usize },
}

#[derive(Debug, Error)]
pub enum DynamicError {
  #[error("no pod target named `{0}` in the static installation")]
  MissingTarget(String),

  #[error("failed to copy `{name}` sources into the dynamic sandbox: {source}")]
  CopySources {
    name: String,
    #[source]
    source: CopyError,
  },

  #[error(transparent)]
  Generate(#[from] GenerateError),

  #[error(transparent)]
  Project(#[from] ProjectError),
}

/// Adds pods' files and targets to a native project.
pub trait ProjectGenerator {
  /// Register every file of the targets' accessors under their pod groups.
  fn install_file_references(
    &self,
    sandbox: &Sandbox,
    targets: &[&PodTarget],
    project: &mut NativeProject,
  ) -> Result<(), GenerateError>;

  /// Create the native target for a pod, returning its index in `project.targets`.
  fn install_target(
    &self,
    sandbox: &Sandbox,
    target: &PodTarget,
    project: &mut NativeProject,
  ) -> Result<usize, GenerateError>;
}

/// [`ProjectGenerator`] that works directly on the project description.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardGenerator;

impl StandardGenerator {
  fn list_files(accessor: &FileAccessor) -> Result<Vec<PathBuf>, GenerateError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(&accessor.root).sort_by_file_name() {
      let entry = entry.map_err(|source| GenerateError::ListFiles {
        path: accessor.root.clone(),
        source,
      })?;
      if entry.file_type().is_file() {
        files.push(entry.into_path());
      }
    }
    Ok(files)
  }
}

impl ProjectGenerator for StandardGenerator {
  fn install_file_references(
    &self,
    _sandbox: &Sandbox,
    targets: &[&PodTarget],
    project: &mut NativeProject,
  ) -> Result<(), GenerateError> {
    for target in targets {
      // Subspec accessors share the pod root, so walk each root once
      let mut roots = BTreeSet::new();
      let mut files = BTreeSet::new();
      for accessor in &target.file_accessors {
        if roots.insert(&accessor.root) {
          files.extend(Self::list_files(accessor)?);
        }
      }

      let group = project
        .group_mut(&target.name)
        .ok_or_else(|| GenerateError::MissingGroup(target.name.clone()))?;
      let fresh: Vec<_> = files.into_iter().filter(|f| !group.files.contains(f)).collect();
      group.files.extend(fresh);
    }
    Ok(())
  }

  fn install_target(
    &self,
    _sandbox: &Sandbox,
    target: &PodTarget,
    project: &mut NativeProject,
  ) -> Result<usize, GenerateError> {
    let mut native = NativeTarget::new(&target.name);

    native.build_configurations = project
      .build_configurations
      .iter()
      .map(|c| {
        let mut configuration = BuildConfiguration::new(&c.name, c.kind);
        configuration.set("PRODUCT_NAME", &target.name);
        configuration.set("MACH_O_TYPE", "mh_dylib");
        configuration
      })
      .collect();

    if let Some(group) = project.group(&target.name) {
      native.source_files = group
        .files
        .iter()
        .filter(|path| {
          path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
        })
        .cloned()
        .collect();
    }

    Ok(project.add_target(native))
  }
}

/// Target derived, nothing built yet.
pub struct Derived;

/// Minimal project created.
pub struct ProjectCreated {
  project: NativeProject,
}

/// Pod sources copied into the dynamic sandbox.
pub struct SourcesCopied {
  project: NativeProject,
}

/// File references registered.
pub struct ReferencesInstalled {
  project: NativeProject,
}

/// Native target installed and linked (or skipped).
pub struct Linked {
  project: NativeProject,
}

/// Project written to disk.
pub struct Persisted {
  project: NativeProject,
}

/// What every stage works against.
struct Context<'a> {
  spec_name: String,
  installation: &'a Installation,
  static_sandbox: &'a Sandbox,
  dynamic_sandbox: &'a Sandbox,
  generator: &'a dyn ProjectGenerator,
  target: PodTarget,
}

/// The six-stage dynamic target procedure, one state per completed stage.
pub struct DynamicPipeline<'a, S> {
  ctx: Context<'a>,
  state: S,
}

impl<S> DynamicPipeline<'_, S> {
  /// The derived single-pod target.
  pub fn target(&self) -> &PodTarget {
    &self.ctx.target
  }
}

impl<'a> DynamicPipeline<'a, Derived> {
  /// Stage 1: project the packaged pod's target out of the static installation.
  ///
  /// File accessors point at the dynamic sandbox's pod directory, which is only
  /// populated in stage 3.
  pub fn derive(
    spec_name: &str,
    installation: &'a Installation,
    static_sandbox: &'a Sandbox,
    dynamic_sandbox: &'a Sandbox,
    generator: &'a dyn ProjectGenerator,
  ) -> Result<Self, DynamicError> {
    let static_target = installation
      .pod_target(spec_name)
      .ok_or_else(|| DynamicError::MissingTarget(spec_name.to_string()))?;

    let pod_root = dynamic_sandbox.pod_dir(spec_name);
    let file_accessors = static_target
      .specs
      .iter()
      .map(|consumer| FileAccessor::new(&pod_root, consumer.clone()))
      .collect();

    let target = PodTarget {
      file_accessors,
      ..static_target.clone()
    };
    debug!(target = %target.name, root = %pod_root.display(), "derived dynamic target");

    Ok(Self {
      ctx: Context {
        spec_name: spec_name.to_string(),
        installation,
        static_sandbox,
        dynamic_sandbox,
        generator,
        target,
      },
      state: Derived,
    })
  }

  /// Stage 2: a new project carrying the user's configurations and one pod group.
  pub fn create_project(self) -> DynamicPipeline<'a, ProjectCreated> {
    let ctx = self.ctx;
    let sandbox = ctx.dynamic_sandbox;

    let mut project = NativeProject::new(sandbox.project_path());
    for configuration in &ctx.installation.user_build_configurations {
      project.add_build_configuration(&configuration.name, configuration.kind);
    }
    project.add_pod_group(
      &ctx.spec_name,
      &sandbox.pod_dir(&ctx.spec_name),
      sandbox.is_local(&ctx.spec_name),
      sandbox.local_path_was_absolute(&ctx.spec_name),
    );

    DynamicPipeline {
      ctx,
      state: ProjectCreated { project },
    }
  }
}

impl<'a> DynamicPipeline<'a, ProjectCreated> {
  /// Stage 3: reuse the sources already fetched for the static build.
  pub fn copy_sources(self) -> Result<DynamicPipeline<'a, SourcesCopied>, DynamicError> {
    let DynamicPipeline {
      ctx,
      state: ProjectCreated { project },
    } = self;

    let from = ctx.static_sandbox.pod_dir(&ctx.spec_name);
    let to = ctx.dynamic_sandbox.pod_dir(&ctx.spec_name);
    debug!(from = %from.display(), to = %to.display(), "copying pod sources");

    copy_dir_recursive(&from, &to).map_err(|source| DynamicError::CopySources {
      name: ctx.spec_name.clone(),
      source,
    })?;

    Ok(DynamicPipeline {
      ctx,
      state: SourcesCopied { project },
    })
  }
}

impl<'a> DynamicPipeline<'a, SourcesCopied> {
  /// Stage 4: register the copied sources in the project.
  pub fn install_file_references(self) -> Result<DynamicPipeline<'a, ReferencesInstalled>, DynamicError> {
    let DynamicPipeline {
      ctx,
      state: SourcesCopied { mut project },
    } = self;

    ctx
      .generator
      .install_file_references(ctx.dynamic_sandbox, &[&ctx.target], &mut project)?;

    Ok(DynamicPipeline {
      ctx,
      state: ReferencesInstalled { project },
    })
  }
}

impl<'a> DynamicPipeline<'a, ReferencesInstalled> {
  /// Stage 5: install the native target and link system frameworks and libraries.
  ///
  /// Skipped when the target declares no dependencies.
  pub fn install_target(self) -> Result<DynamicPipeline<'a, Linked>, DynamicError> {
    let DynamicPipeline {
      ctx,
      state: ReferencesInstalled { mut project },
    } = self;

    if ctx.target.dependency_count() == 0 {
      debug!(target = %ctx.target.name, "no dependencies, skipping target installation");
    } else {
      let index = ctx
        .generator
        .install_target(ctx.dynamic_sandbox, &ctx.target, &mut project)?;
      let count = project.targets.len();
      let native = project
        .targets
        .get_mut(index)
        .ok_or(GenerateError::UnknownTarget { index, count })?;
      for accessor in &ctx.target.file_accessors {
        for framework in accessor.frameworks() {
          native.add_system_framework(framework);
        }
        for library in accessor.libraries() {
          native.add_system_library(library);
        }
      }
    }

    Ok(DynamicPipeline {
      ctx,
      state: Linked { project },
    })
  }
}

impl<'a> DynamicPipeline<'a, Linked> {
  /// Stage 6: tidy the project, point it at the static headers, and save it.
  pub fn persist(self) -> Result<DynamicPipeline<'a, Persisted>, DynamicError> {
    let DynamicPipeline {
      ctx,
      state: Linked { mut project },
    } = self;

    project.remove_group_if_empty(PODS_GROUP);
    project.remove_group_if_empty(DEVELOPMENT_PODS_GROUP);
    project.sort_groups();
    project.recreate_user_schemes();

    // Dependency headers only exist in the static sandbox
    let search_paths = format!(
      "$(inherited) {}/**",
      ctx.static_sandbox.public_headers_root().display()
    );
    if let Some(target) = project.targets.first_mut() {
      for configuration in &mut target.build_configurations {
        configuration.set("HEADER_SEARCH_PATHS", &search_paths);
        configuration.set("USER_HEADER_SEARCH_PATHS", &search_paths);
        configuration.set("OTHER_LDFLAGS", "$(inherited) -ObjC");
      }
    }

    info!(path = %project.path().display(), "writing dynamic project");
    project.save()?;

    Ok(DynamicPipeline {
      ctx,
      state: Persisted { project },
    })
  }
}

impl DynamicPipeline<'_, Persisted> {
  pub fn into_project(self) -> NativeProject {
    self.state.project
  }
}

/// Run all six stages, producing the saved dynamic project.
pub fn install_dynamic_pod(
  spec_name: &str,
  installation: &Installation,
  static_sandbox: &Sandbox,
  dynamic_sandbox: &Sandbox,
  generator: &dyn ProjectGenerator,
) -> Result<NativeProject, DynamicError> {
  let pipeline = DynamicPipeline::derive(spec_name, installation, static_sandbox, dynamic_sandbox, generator)?
    .create_project()
    .copy_sources()?
    .install_file_references()?
    .install_target()?
    .persist()?;
  Ok(pipeline.into_project())
}
