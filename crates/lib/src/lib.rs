//! podpack-lib: packaging pipeline for pods
//!
//! Packages a pod into a static library, static framework or dynamic
//! framework for every platform it supports:
//! - `request`: the package request and its validation
//! - `workdir`: working directory allocation, cwd guarding and publishing
//! - `sandbox`: per-platform installation sandboxes
//! - `install`: dependency installation through a [`install::DependencyInstaller`]
//! - `dynamic`: the dynamic framework target pipeline
//! - `build`: native compilation through a [`build::NativeBuilder`]
//! - `descriptor`: the podspec shipped with the package
//! - `package`: the pipeline tying it all together

pub mod build;
pub mod config;
pub mod consts;
pub mod descriptor;
pub mod dynamic;
pub mod install;
pub mod package;
pub mod platform;
pub mod project;
pub mod request;
pub mod sandbox;
pub mod spec;
pub mod util;
pub mod workdir;
