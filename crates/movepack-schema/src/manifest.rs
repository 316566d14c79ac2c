use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name of the Move package manifest at the project root.
pub const MANIFEST_FILE: &str = "Move.toml";

/// Dependency key that marks a Move package as an Aptos project.
pub const APTOS_FRAMEWORK: &str = "AptosFramework";

/// Extension of Move source files.
pub const MOVE_SOURCE_EXTENSION: &str = "move";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("{path} does not declare the AptosFramework dependency, not an Aptos project")]
    NotAptosProject { path: String },
    #[error("no files with extension '.{extension}' found under {root}")]
    NoSourceFiles { root: String, extension: String },
}

/// Parsed `Move.toml`.
///
/// Only the parts detection cares about are modelled; everything else in the
/// manifest (build options, dev-addresses, ...) is tolerated and dropped.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProjectManifest {
    #[serde(default)]
    pub package: Option<PackageSection>,
    #[serde(default)]
    pub addresses: BTreeMap<String, String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, DependencyRef>,
    #[serde(default, rename = "dev-dependencies")]
    pub dev_dependencies: BTreeMap<String, DependencyRef>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PackageSection {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// A Move package dependency, either fetched from git or referenced locally.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DependencyRef {
    pub git: Option<String>,
    pub rev: Option<String>,
    pub subdir: Option<String>,
    pub local: Option<String>,
}

impl ProjectManifest {
    pub fn dependency(&self, name: &str) -> Option<&DependencyRef> {
        self.dependencies.get(name)
    }

    pub fn is_aptos_project(&self) -> bool {
        self.dependencies.contains_key(APTOS_FRAMEWORK)
    }

    pub fn package_name(&self) -> Option<&str> {
        self.package.as_ref().map(|p| p.name.as_str())
    }
}

pub fn parse_manifest_str(input: &str) -> Result<ProjectManifest, ManifestError> {
    Ok(toml::from_str(input)?)
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<ProjectManifest, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content)
}
