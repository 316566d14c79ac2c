//! Manifest scanner: decides whether a source tree is an Aptos Move project.

use crate::manifest::{
    parse_manifest_file, ManifestError, MANIFEST_FILE, MOVE_SOURCE_EXTENSION,
};
use std::fs;
use std::path::Path;

/// Scan `root` for an Aptos Move project.
///
/// Returns `Ok(false)` when there is no `Move.toml` at all: the tree is simply
/// not ours. A manifest that exists but is malformed, lacks the
/// `AptosFramework` dependency, or comes without any `.move` source is an
/// error so the user gets a diagnostic instead of a silent skip.
pub fn scan_project(root: &Path) -> Result<bool, ManifestError> {
    let manifest_path = root.join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Ok(false);
    }

    let manifest = parse_manifest_file(&manifest_path)?;
    if !manifest.is_aptos_project() {
        return Err(ManifestError::NotAptosProject {
            path: manifest_path.display().to_string(),
        });
    }

    if !contains_file_with_extension(root, MOVE_SOURCE_EXTENSION)? {
        return Err(ManifestError::NoSourceFiles {
            root: root.display().to_string(),
            extension: MOVE_SOURCE_EXTENSION.to_owned(),
        });
    }

    Ok(true)
}

/// Depth-first search for a regular file with the given extension.
/// Symlinks are not followed; the walk stops at the first match.
pub fn contains_file_with_extension(dir: &Path, extension: &str) -> Result<bool, ManifestError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let ft = entry.file_type()?;
        if ft.is_file() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(extension) {
                return Ok(true);
            }
        } else if ft.is_dir() && contains_file_with_extension(&entry.path(), extension)? {
            return Ok(true);
        }
    }
    Ok(false)
}
