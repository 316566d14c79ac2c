//! `buildpack.toml`: buildpack identity, configuration defaults, and the
//! versioned dependencies the build can install.

use crate::types::{DependencyId, Sha256Digest};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DESCRIPTOR_FILE: &str = "buildpack.toml";

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("failed to read buildpack.toml: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse descriptor: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("no valid dependency for {id} matching version '{constraint}', available: [{available}]")]
    DependencyNotFound {
        id: String,
        constraint: String,
        available: String,
    },
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct BuildpackDescriptor {
    #[serde(default)]
    pub api: String,
    pub buildpack: BuildpackInfo,
    #[serde(default)]
    pub metadata: DescriptorMetadata,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct BuildpackInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub homepage: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DescriptorMetadata {
    #[serde(default)]
    pub configurations: Vec<ConfigurationDef>,
    #[serde(default)]
    pub dependencies: Vec<DependencyDescriptor>,
}

/// A user-facing configuration key with its default.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ConfigurationDef {
    pub name: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub build: bool,
    #[serde(default)]
    pub launch: bool,
}

/// A downloadable, checksummed artifact.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DependencyDescriptor {
    pub id: DependencyId,
    #[serde(default)]
    pub name: String,
    pub version: String,
    pub uri: String,
    pub sha256: Sha256Digest,
    #[serde(default)]
    pub stacks: Vec<String>,
}

impl DependencyDescriptor {
    /// Last path segment of the URI, used as the cached artifact's file name.
    pub fn artifact_name(&self) -> &str {
        let path = self.uri.split(['?', '#']).next().unwrap_or(&self.uri);
        path.rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or(self.id.as_str())
    }
}

impl BuildpackDescriptor {
    pub fn display_name(&self) -> &str {
        if self.buildpack.name.is_empty() {
            &self.buildpack.id
        } else {
            &self.buildpack.name
        }
    }

    /// Pick the newest dependency with the given id whose version satisfies
    /// `constraint`.
    ///
    /// Supported constraints: empty or `*` (any), a `.*` suffix wildcard
    /// (`2.*`, `2.0.*`), or an exact version.
    pub fn resolve_dependency(
        &self,
        id: &str,
        constraint: &str,
    ) -> Result<DependencyDescriptor, DescriptorError> {
        let constraint = constraint.trim();
        let candidates: Vec<&DependencyDescriptor> = self
            .metadata
            .dependencies
            .iter()
            .filter(|d| d.id == *id)
            .collect();

        candidates
            .iter()
            .filter(|d| version_matches(constraint, &d.version))
            .max_by(|a, b| compare_versions(&a.version, &b.version))
            .map(|d| (*d).clone())
            .ok_or_else(|| DescriptorError::DependencyNotFound {
                id: id.to_owned(),
                constraint: constraint.to_owned(),
                available: candidates
                    .iter()
                    .map(|d| d.version.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

fn version_matches(constraint: &str, version: &str) -> bool {
    if constraint.is_empty() || constraint == "*" {
        return true;
    }
    if let Some(prefix) = constraint.strip_suffix(".*") {
        return version == prefix
            || version
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('.'));
    }
    version == constraint
}

/// Compare dot-separated versions component by component, numerically where
/// both sides parse as integers.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

pub fn parse_descriptor_str(input: &str) -> Result<BuildpackDescriptor, DescriptorError> {
    Ok(toml::from_str(input)?)
}

pub fn parse_descriptor_file(path: impl AsRef<Path>) -> Result<BuildpackDescriptor, DescriptorError> {
    let content = fs::read_to_string(path)?;
    parse_descriptor_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR: &str = r#"
api = "0.8"

[buildpack]
id = "amp-buildpacks/aptos"
name = "Aptos Buildpack"
version = "0.1.0"

[[metadata.configurations]]
name = "BP_APTOS_VERSION"
default = "2.*"
description = "the Aptos CLI version"
build = true

[[metadata.configurations]]
name = "BP_ENABLE_APTOS_PROCESS"
default = "false"
launch = true

[[metadata.dependencies]]
id = "aptos"
name = "Aptos CLI"
version = "1.0.13"
uri = "https://example.com/aptos-cli-1.0.13.tar.gz"
sha256 = "aa"

[[metadata.dependencies]]
id = "aptos"
version = "2.0.2"
uri = "https://example.com/aptos-cli-2.0.2.tar.gz"
sha256 = "bb"

[[metadata.dependencies]]
id = "aptos"
version = "2.10.0"
uri = "https://example.com/aptos-cli-2.10.0.tar.gz?download=1"
sha256 = "cc"

[[metadata.dependencies]]
id = "move-prover"
version = "9.0.0"
uri = "https://example.com/prover.tgz"
sha256 = "dd"
"#;

    fn descriptor() -> BuildpackDescriptor {
        parse_descriptor_str(DESCRIPTOR).expect("should parse")
    }

    #[test]
    fn parses_configurations_and_dependencies() {
        let d = descriptor();
        assert_eq!(d.api, "0.8");
        assert_eq!(d.display_name(), "Aptos Buildpack");
        assert_eq!(d.metadata.configurations.len(), 2);
        let version = &d.metadata.configurations[0];
        assert_eq!(version.name, "BP_APTOS_VERSION");
        assert_eq!(version.default.as_deref(), Some("2.*"));
        assert_eq!(d.metadata.dependencies.len(), 4);
    }

    #[test]
    fn wildcard_picks_newest_in_series() {
        let dep = descriptor().resolve_dependency("aptos", "2.*").unwrap();
        assert_eq!(dep.version, "2.10.0");
        assert_eq!(dep.sha256, *"cc");
    }

    #[test]
    fn empty_constraint_picks_newest_overall() {
        let dep = descriptor().resolve_dependency("aptos", "").unwrap();
        assert_eq!(dep.version, "2.10.0");
        let dep = descriptor().resolve_dependency("aptos", "*").unwrap();
        assert_eq!(dep.version, "2.10.0");
    }

    #[test]
    fn exact_constraint_matches_only_that_version() {
        let dep = descriptor().resolve_dependency("aptos", "1.0.13").unwrap();
        assert_eq!(dep.sha256, *"aa");
    }

    #[test]
    fn wildcard_does_not_match_partial_components() {
        // "2.1.*" must not pick 2.10.0
        let err = descriptor().resolve_dependency("aptos", "2.1.*").unwrap_err();
        assert!(matches!(err, DescriptorError::DependencyNotFound { .. }));
    }

    #[test]
    fn unknown_id_lists_nothing_available() {
        let err = descriptor().resolve_dependency("sui", "*").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("sui"));
        assert!(msg.contains("available: []"));
    }

    #[test]
    fn unmatched_version_lists_available() {
        let err = descriptor().resolve_dependency("aptos", "3.0.0").unwrap_err();
        assert!(err.to_string().contains("1.0.13, 2.0.2, 2.10.0"));
    }

    #[test]
    fn artifact_name_strips_query() {
        let dep = descriptor().resolve_dependency("aptos", "2.10.0").unwrap();
        assert_eq!(dep.artifact_name(), "aptos-cli-2.10.0.tar.gz");
    }

    #[test]
    fn version_ordering_is_numeric() {
        assert_eq!(compare_versions("2.10.0", "2.9.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.0", "1.0.0"), Ordering::Less);
        assert_eq!(compare_versions("1.2.3", "1.2.3"), Ordering::Equal);
    }

    #[test]
    fn minimal_descriptor_parses() {
        let d = parse_descriptor_str(
            r#"
[buildpack]
id = "x"
version = "0.0.1"
"#,
        )
        .unwrap();
        assert_eq!(d.display_name(), "x");
        assert!(d.metadata.dependencies.is_empty());
    }
}
