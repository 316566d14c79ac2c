//! Manifest parsing, project detection, and host-facing schema types for movepack.
//!
//! This crate defines the schema layer: `Move.toml` parsing (`ProjectManifest`),
//! the manifest scanner that decides whether a tree is an Aptos Move project
//! (`scan_project`), the `buildpack.toml` descriptor with dependency version
//! resolution, and the build plan types exchanged with the lifecycle host.

pub mod descriptor;
pub mod manifest;
pub mod plan;
pub mod project;
pub mod types;

pub use descriptor::{
    parse_descriptor_file, parse_descriptor_str, BuildpackDescriptor, BuildpackInfo,
    ConfigurationDef, DependencyDescriptor, DescriptorError, DescriptorMetadata, DESCRIPTOR_FILE,
};
pub use manifest::{
    parse_manifest_file, parse_manifest_str, DependencyRef, ManifestError, PackageSection,
    ProjectManifest, APTOS_FRAMEWORK, MANIFEST_FILE, MOVE_SOURCE_EXTENSION,
};
pub use plan::{
    parse_buildpack_plan_file, parse_buildpack_plan_str, BuildPlan, BuildpackPlan,
    DetectionResult, PlanEntry, PlanError, Provide, Require, PLAN_ENTRY_APTOS,
};
pub use project::{contains_file_with_extension, scan_project};
pub use types::{DependencyId, Sha256Digest};
