use crate::StoreError;
use std::fs;
use std::path::{Path, PathBuf};

const LAUNCH_FILE: &str = "launch.toml";
const LAUNCH_ENV_DIR: &str = "env.launch";

/// Directory layout of the host-supplied layers root.
///
/// Each layer `<name>` owns `<root>/<name>/` plus a sibling metadata file
/// `<root>/<name>.toml`. Process types live in `<root>/launch.toml`.
#[derive(Debug, Clone)]
pub struct LayersLayout {
    root: PathBuf,
}

impl LayersLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn layer_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    #[inline]
    pub fn metadata_file(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.toml"))
    }

    /// Environment files applied by the host to launch processes.
    #[inline]
    pub fn launch_env_dir(&self, name: &str) -> PathBuf {
        self.layer_dir(name).join(LAUNCH_ENV_DIR)
    }

    #[inline]
    pub fn launch_file(&self) -> PathBuf {
        self.root.join(LAUNCH_FILE)
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths_are_correct() {
        let layout = LayersLayout::new("/layers/amp_aptos");
        assert_eq!(layout.root(), Path::new("/layers/amp_aptos"));
        assert_eq!(
            layout.layer_dir("aptos"),
            PathBuf::from("/layers/amp_aptos/aptos")
        );
        assert_eq!(
            layout.metadata_file("aptos"),
            PathBuf::from("/layers/amp_aptos/aptos.toml")
        );
        assert_eq!(
            layout.launch_env_dir("aptos"),
            PathBuf::from("/layers/amp_aptos/aptos/env.launch")
        );
        assert_eq!(
            layout.launch_file(),
            PathBuf::from("/layers/amp_aptos/launch.toml")
        );
    }

    #[test]
    fn initialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = LayersLayout::new(dir.path().join("layers"));
        layout.initialize().unwrap();
        layout.initialize().unwrap();
        assert!(layout.root().is_dir());
    }
}
