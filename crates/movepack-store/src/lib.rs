//! Layer persistence, launch configuration, and dependency artifacts for movepack.
//!
//! This crate provides the storage layer: `LayersLayout` for the host's layers
//! directory structure, `LayerStore` for layer metadata (`<name>.toml`) and
//! launch environment files, `LaunchConfig` for process types, a verifying
//! `DependencyCache` for downloaded artifacts, and archive extraction.

pub mod archive;
pub mod cache;
pub mod launch;
pub mod layers;
pub mod layout;

pub use archive::{extract, ArchiveKind};
pub use cache::{sha256_file, DependencyCache};
pub use launch::{LaunchConfig, ProcessDescriptor};
pub use layers::{EnvMutation, EnvOp, LayerMetadata, LayerStore, LayerTypes};
pub use layout::LayersLayout;

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),
    #[error("checksum mismatch for {uri}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        uri: String,
        expected: String,
        actual: String,
    },
    #[error("unable to download {uri}: {reason}")]
    Download { uri: String, reason: String },
    #[error("unsupported dependency URI: {0}")]
    UnsupportedUri(String),
    #[error("offline mode: dependency {0} is not cached")]
    Offline(String),
    #[error("unsupported archive format: {0}")]
    UnsupportedArchive(String),
    #[error("archive extraction failed: {0}")]
    Archive(String),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Write `content` to `dest` through a temp file in the same directory, so
/// readers never observe a half-written file.
pub(crate) fn write_atomic(dest: &Path, content: &[u8]) -> Result<(), StoreError> {
    let dir = dest.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}
