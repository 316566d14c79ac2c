use crate::CoreError;
use movepack_schema::{scan_project, DetectionResult, MANIFEST_FILE, PLAN_ENTRY_APTOS};
use std::path::Path;
use tracing::{debug, info};

/// Decide whether `app_dir` holds an Aptos Move project.
///
/// No manifest is a plain failure; a manifest that does not describe a
/// buildable Aptos project is an error.
pub fn detect(app_dir: &Path) -> Result<DetectionResult, CoreError> {
    debug!("scanning {} for {MANIFEST_FILE}", app_dir.display());
    if scan_project(app_dir)? {
        info!("detected Aptos Move project in {}", app_dir.display());
        Ok(DetectionResult::pass_with(PLAN_ENTRY_APTOS))
    } else {
        debug!("no {MANIFEST_FILE} in {}", app_dir.display());
        Ok(DetectionResult::fail())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use movepack_schema::ManifestError;
    use std::fs;

    const MANIFEST: &str = r#"
[package]
name = "hello"
version = "0.0.1"

[dependencies]
AptosFramework = { git = "https://github.com/aptos-labs/aptos-core.git", subdir = "aptos-move/framework/aptos-framework", rev = "mainnet" }
"#;

    #[test]
    fn passes_for_aptos_project() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Move.toml"), MANIFEST).unwrap();
        fs::create_dir_all(dir.path().join("sources")).unwrap();
        fs::write(dir.path().join("sources/hello.move"), "module 0x1::hello {}").unwrap();

        let result = detect(dir.path()).unwrap();
        assert!(result.pass);
        assert!(result.provides.contains("aptos"));
        assert!(result.requires.contains("aptos"));
    }

    #[test]
    fn fails_quietly_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let result = detect(dir.path()).unwrap();
        assert!(!result.pass);
        assert!(result.provides.is_empty());
        assert!(result.requires.is_empty());
    }

    #[test]
    fn non_aptos_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Move.toml"),
            "[package]\nname = \"x\"\n[dependencies]\nSui = { local = \"../sui\" }\n",
        )
        .unwrap();
        assert!(matches!(
            detect(dir.path()),
            Err(CoreError::Manifest(ManifestError::NotAptosProject { .. }))
        ));
    }

    #[test]
    fn manifest_without_sources_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Move.toml"), MANIFEST).unwrap();
        assert!(matches!(
            detect(dir.path()),
            Err(CoreError::Manifest(ManifestError::NoSourceFiles { .. }))
        ));
    }
}
