//! Build plan types exchanged with the lifecycle host: what detection
//! provides/requires, and the plan entries handed to the build phase.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Capability name this buildpack provides and requires.
pub const PLAN_ENTRY_APTOS: &str = "aptos";

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("plan I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse plan: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize plan: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Outcome of a detect invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectionResult {
    pub pass: bool,
    pub provides: BTreeSet<String>,
    pub requires: BTreeSet<String>,
}

impl DetectionResult {
    pub fn fail() -> Self {
        Self::default()
    }

    pub fn pass_with(capability: &str) -> Self {
        Self {
            pass: true,
            provides: BTreeSet::from([capability.to_owned()]),
            requires: BTreeSet::from([capability.to_owned()]),
        }
    }

    /// The build plan the host expects on a passing detection.
    pub fn build_plan(&self) -> BuildPlan {
        BuildPlan {
            provides: self
                .provides
                .iter()
                .map(|name| Provide { name: name.clone() })
                .collect(),
            requires: self
                .requires
                .iter()
                .map(|name| Require {
                    name: name.clone(),
                    metadata: toml::Table::new(),
                })
                .collect(),
        }
    }

    /// Write the build plan to `path`. Failing detections write nothing.
    pub fn write_plan(&self, path: &Path) -> Result<(), PlanError> {
        if !self.pass {
            return Ok(());
        }
        fs::write(path, toml::to_string(&self.build_plan())?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildPlan {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<Provide>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<Require>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provide {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Require {
    pub name: String,
    #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
    pub metadata: toml::Table,
}

/// Plan entries the host resolved for this buildpack at build time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildpackPlan {
    #[serde(default)]
    pub entries: Vec<PlanEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub name: String,
    #[serde(default)]
    pub metadata: toml::Table,
}

impl BuildpackPlan {
    /// Merge every entry named `name` into one; later metadata keys win.
    /// Returns `None` when no entry requests `name`.
    pub fn resolve(&self, name: &str) -> Option<PlanEntry> {
        let mut matching = self.entries.iter().filter(|e| e.name == name).peekable();
        matching.peek()?;

        let mut merged = PlanEntry {
            name: name.to_owned(),
            metadata: toml::Table::new(),
        };
        for entry in matching {
            for (k, v) in &entry.metadata {
                merged.metadata.insert(k.clone(), v.clone());
            }
        }
        Some(merged)
    }
}

pub fn parse_buildpack_plan_str(input: &str) -> Result<BuildpackPlan, PlanError> {
    Ok(toml::from_str(input)?)
}

/// Read the buildpack plan. A missing file is an empty plan.
pub fn parse_buildpack_plan_file(path: impl AsRef<Path>) -> Result<BuildpackPlan, PlanError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(BuildpackPlan::default());
    }
    let content = fs::read_to_string(path)?;
    parse_buildpack_plan_str(&content)
}
