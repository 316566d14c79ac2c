use crate::layout::LayersLayout;
use crate::{write_atomic, StoreError};
use serde::{Deserialize, Serialize};

/// A launchable process type contributed to the application image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessDescriptor {
    #[serde(rename = "type")]
    pub process_type: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub default: bool,
}

/// Contents of `<layers>/launch.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LaunchConfig {
    #[serde(default)]
    pub processes: Vec<ProcessDescriptor>,
}

impl LaunchConfig {
    pub fn new(processes: Vec<ProcessDescriptor>) -> Self {
        Self { processes }
    }

    pub fn write(&self, layout: &LayersLayout) -> Result<(), StoreError> {
        let content = toml::to_string(self)?;
        write_atomic(&layout.launch_file(), content.as_bytes())
    }
}
