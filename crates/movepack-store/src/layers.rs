use crate::layout::LayersLayout;
use crate::{write_atomic, StoreError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// When the host makes a layer available.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayerTypes {
    #[serde(default)]
    pub build: bool,
    #[serde(default)]
    pub cache: bool,
    #[serde(default)]
    pub launch: bool,
}

impl LayerTypes {
    pub fn all() -> Self {
        Self {
            build: true,
            cache: true,
            launch: true,
        }
    }
}

/// Contents of `<layers>/<name>.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LayerMetadata {
    #[serde(default)]
    pub types: LayerTypes,
    #[serde(default)]
    pub metadata: toml::Table,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvOp {
    Append { delim: String },
    Prepend { delim: String },
    Override,
    Default,
}

/// One ordered change to an environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvMutation {
    pub name: String,
    pub op: EnvOp,
    pub value: String,
}

impl EnvMutation {
    pub fn append(name: &str, delim: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_owned(),
            op: EnvOp::Append {
                delim: delim.to_owned(),
            },
            value: value.into(),
        }
    }

    pub fn default_value(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_owned(),
            op: EnvOp::Default,
            value: value.into(),
        }
    }

    fn suffix(&self) -> &'static str {
        match self.op {
            EnvOp::Append { .. } => "append",
            EnvOp::Prepend { .. } => "prepend",
            EnvOp::Override => "override",
            EnvOp::Default => "default",
        }
    }

    fn delim(&self) -> Option<&str> {
        match &self.op {
            EnvOp::Append { delim } | EnvOp::Prepend { delim } => Some(delim),
            EnvOp::Override | EnvOp::Default => None,
        }
    }
}

/// Reads and writes layer metadata and launch environment files.
pub struct LayerStore {
    layout: LayersLayout,
}

impl LayerStore {
    pub fn new(layout: LayersLayout) -> Self {
        Self { layout }
    }

    /// Persisted metadata for `name`, or `None` if the host did not restore
    /// the layer.
    pub fn read_metadata(&self, name: &str) -> Result<Option<LayerMetadata>, StoreError> {
        let path = self.layout.metadata_file(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let meta = toml::from_str(&content).map_err(|source| StoreError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Some(meta))
    }

    pub fn write_metadata(&self, name: &str, meta: &LayerMetadata) -> Result<(), StoreError> {
        let content = toml::to_string(meta)?;
        write_atomic(&self.layout.metadata_file(name), content.as_bytes())
    }

    /// Remove any previous content of the layer and return a fresh, empty
    /// layer directory.
    pub fn reset(&self, name: &str) -> Result<PathBuf, StoreError> {
        let dir = self.layout.layer_dir(name);
        if dir.exists() {
            debug!("removing stale layer {}", dir.display());
            fs::remove_dir_all(&dir)?;
        }
        let meta = self.layout.metadata_file(name);
        if meta.exists() {
            fs::remove_file(&meta)?;
        }
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Write `env.launch/<NAME>.<op>` files (plus `<NAME>.delim`) in order.
    pub fn write_launch_env(&self, name: &str, mutations: &[EnvMutation]) -> Result<(), StoreError> {
        let dir = self.layout.launch_env_dir(name);
        fs::create_dir_all(&dir)?;
        for m in mutations {
            fs::write(dir.join(format!("{}.{}", m.name, m.suffix())), &m.value)?;
            if let Some(delim) = m.delim() {
                fs::write(dir.join(format!("{}.delim", m.name)), delim)?;
            }
        }
        Ok(())
    }

    /// Read back launch environment files, sorted by file name.
    pub fn read_launch_env(&self, name: &str) -> Result<Vec<EnvMutation>, StoreError> {
        let dir = self.layout.launch_env_dir(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut files: Vec<String> = fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str().map(str::to_owned))
            .collect();
        files.sort();

        let mut mutations = Vec::new();
        for file in &files {
            let Some((var, op)) = file.rsplit_once('.') else {
                warn!("ignoring launch env file without operation: {file}");
                continue;
            };
            let value = fs::read_to_string(dir.join(file))?;
            let delim = || -> Result<String, StoreError> {
                let path = dir.join(format!("{var}.delim"));
                Ok(if path.exists() {
                    fs::read_to_string(path)?
                } else {
                    String::new()
                })
            };
            let op = match op {
                "append" => EnvOp::Append { delim: delim()? },
                "prepend" => EnvOp::Prepend { delim: delim()? },
                "override" => EnvOp::Override,
                "default" => EnvOp::Default,
                "delim" => continue,
                other => {
                    warn!("ignoring launch env file with unknown operation '{other}': {file}");
                    continue;
                }
            };
            mutations.push(EnvMutation {
                name: var.to_owned(),
                op,
                value,
            });
        }
        Ok(mutations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_layer_store() -> (tempfile::TempDir, LayerStore) {
        let dir = tempfile::tempdir().unwrap();
        let layout = LayersLayout::new(dir.path());
        layout.initialize().unwrap();
        (dir, LayerStore::new(layout))
    }

    fn sample_metadata() -> LayerMetadata {
        let mut dependency = toml::Table::new();
        dependency.insert("id".to_owned(), "aptos".into());
        dependency.insert("version".to_owned(), "2.0.2".into());
        let mut metadata = toml::Table::new();
        metadata.insert("dependency".to_owned(), dependency.into());
        LayerMetadata {
            types: LayerTypes::all(),
            metadata,
        }
    }

    #[test]
    fn metadata_write_and_read() {
        let (_dir, store) = test_layer_store();
        store.write_metadata("aptos", &sample_metadata()).unwrap();
        let back = store.read_metadata("aptos").unwrap().unwrap();
        assert_eq!(back, sample_metadata());
    }

    #[test]
    fn metadata_file_uses_host_sections() {
        let (dir, store) = test_layer_store();
        store.write_metadata("aptos", &sample_metadata()).unwrap();
        let path = LayersLayout::new(dir.path()).metadata_file("aptos");
        let raw = fs::read_to_string(path).unwrap();
        assert!(raw.contains("[types]"));
        assert!(raw.contains("launch = true"));
        assert!(raw.contains("[metadata.dependency]"));
    }

    #[test]
    fn missing_metadata_is_none() {
        let (_dir, store) = test_layer_store();
        assert!(store.read_metadata("aptos").unwrap().is_none());
    }

    #[test]
    fn corrupt_metadata_is_a_parse_error() {
        let (dir, store) = test_layer_store();
        let path = LayersLayout::new(dir.path()).metadata_file("aptos");
        fs::write(path, "[types\n").unwrap();
        assert!(matches!(
            store.read_metadata("aptos"),
            Err(StoreError::Parse { .. })
        ));
    }

    #[test]
    fn reset_clears_previous_content() {
        let (_dir, store) = test_layer_store();
        let dir = store.reset("aptos").unwrap();
        fs::write(dir.join("stale"), "x").unwrap();
        store.write_metadata("aptos", &sample_metadata()).unwrap();

        let dir = store.reset("aptos").unwrap();
        assert!(dir.is_dir());
        assert!(!dir.join("stale").exists());
        assert!(store.read_metadata("aptos").unwrap().is_none());
    }

    #[test]
    fn launch_env_files_follow_host_naming() {
        let (dir, store) = test_layer_store();
        store.reset("aptos").unwrap();
        store
            .write_launch_env(
                "aptos",
                &[
                    EnvMutation::append("PATH", ":", "/layers/aptos/bin"),
                    EnvMutation::default_value("MOVE_HOME", "/workspace"),
                ],
            )
            .unwrap();

        let env_dir = LayersLayout::new(dir.path()).launch_env_dir("aptos");
        assert_eq!(
            fs::read_to_string(env_dir.join("PATH.append")).unwrap(),
            "/layers/aptos/bin"
        );
        assert_eq!(fs::read_to_string(env_dir.join("PATH.delim")).unwrap(), ":");
        assert_eq!(
            fs::read_to_string(env_dir.join("MOVE_HOME.default")).unwrap(),
            "/workspace"
        );
    }

    #[test]
    fn launch_env_reads_back() {
        let (dir, store) = test_layer_store();
        store.reset("aptos").unwrap();
        let written = vec![
            EnvMutation::default_value("MOVE_HOME", "/workspace"),
            EnvMutation::append("PATH", ":", "/layers/aptos/bin"),
        ];
        store.write_launch_env("aptos", &written).unwrap();
        assert_eq!(store.read_launch_env("aptos").unwrap(), written);

        let env_dir = LayersLayout::new(dir.path()).launch_env_dir("aptos");
        fs::write(env_dir.join("RUST_LOG.override"), "info").unwrap();
        let read = store.read_launch_env("aptos").unwrap();
        assert!(read.contains(&EnvMutation {
            name: "RUST_LOG".to_owned(),
            op: EnvOp::Override,
            value: "info".to_owned(),
        }));
    }

    #[test]
    fn launch_env_of_missing_layer_is_empty() {
        let (_dir, store) = test_layer_store();
        assert!(store.read_launch_env("aptos").unwrap().is_empty());
    }
}
